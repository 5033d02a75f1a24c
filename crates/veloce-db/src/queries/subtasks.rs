use rusqlite::{params, Connection, Row};
use tracing::debug;

use veloce_core::subtask::{SubTask, SubTaskStatus};

use crate::{Db, DbError};

fn row_to_subtask(row: &Row) -> rusqlite::Result<SubTask> {
    let status_str: String = row.get("status")?;
    Ok(SubTask {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        title: row.get("title")?,
        estimated_minutes: row.get("estimated_minutes")?,
        status: SubTaskStatus::parse_str(&status_str).unwrap_or_default(),
        order_index: row.get("order_index")?,
        ai_reasoning: row.get("ai_reasoning")?,
        completed_at: row.get("completed_at")?,
    })
}

const UPSERT_SQL: &str = "INSERT INTO subtasks
        (id, task_id, title, estimated_minutes, status, order_index, ai_reasoning, completed_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT(id) DO UPDATE SET
        task_id = excluded.task_id,
        title = excluded.title,
        estimated_minutes = excluded.estimated_minutes,
        status = excluded.status,
        order_index = excluded.order_index,
        ai_reasoning = excluded.ai_reasoning,
        completed_at = excluded.completed_at";

fn write_subtask(conn: &Connection, sql: &str, s: &SubTask) -> Result<(), DbError> {
    conn.execute(
        sql,
        params![
            s.id,
            s.task_id,
            s.title,
            s.estimated_minutes,
            s.status.as_str(),
            s.order_index,
            s.ai_reasoning,
            s.completed_at,
        ],
    )?;
    Ok(())
}

impl Db {
    pub fn list_subtasks(&self, task_id: &str) -> Result<Vec<SubTask>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM subtasks WHERE task_id = ?1 ORDER BY order_index ASC",
            )?;
            let rows = stmt
                .query_map(params![task_id], row_to_subtask)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_subtask(&self, id: &str) -> Result<SubTask, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM subtasks WHERE id = ?1",
                params![id],
                row_to_subtask,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(id.to_string()),
                other => DbError::Sqlite(other),
            })
        })
    }

    /// Remove every sub-task of a parent task. Returns the number of rows removed.
    pub fn delete_subtasks_for_task(&self, task_id: &str) -> Result<usize, DbError> {
        self.with_conn(|conn| {
            let removed =
                conn.execute("DELETE FROM subtasks WHERE task_id = ?1", params![task_id])?;
            debug!(task_id, removed, "deleted subtasks for task");
            Ok(removed)
        })
    }

    /// Insert a batch of new rows. The batch is atomic on its own; a preceding
    /// `delete_subtasks_for_task` is not part of the same transaction.
    pub fn insert_subtasks(&self, rows: &[SubTask]) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for s in rows {
                write_subtask(
                    &tx,
                    "INSERT INTO subtasks
                        (id, task_id, title, estimated_minutes, status, order_index, ai_reasoning, completed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    s,
                )?;
            }
            tx.commit()?;
            debug!(count = rows.len(), "inserted subtasks");
            Ok(())
        })
    }

    pub fn upsert_subtask(&self, subtask: &SubTask) -> Result<(), DbError> {
        self.with_conn(|conn| write_subtask(conn, UPSERT_SQL, subtask))
    }

    pub fn delete_subtask(&self, id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM subtasks WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(DbError::NotFound(id.to_string()));
            }
            Ok(())
        })
    }
}
