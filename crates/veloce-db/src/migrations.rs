use rusqlite::Connection;
use tracing::info;

use crate::DbError;

/// Schema steps in order. The database's `user_version` records how many
/// have been applied; append new steps, never edit old ones.
const STEPS: &[&str] = &[
    // 1: subtask rows, listed per task in order
    "
    CREATE TABLE IF NOT EXISTS subtasks (
        id                TEXT PRIMARY KEY,
        task_id           TEXT NOT NULL,
        title             TEXT NOT NULL CHECK(length(trim(title)) > 0),
        estimated_minutes INTEGER CHECK(estimated_minutes IS NULL OR estimated_minutes >= 0),
        status            TEXT NOT NULL DEFAULT 'pending'
                              CHECK(status IN ('pending', 'in_progress', 'completed')),
        order_index       INTEGER NOT NULL,
        ai_reasoning      TEXT,
        completed_at      TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks(task_id, order_index);
    ",
];

pub const SCHEMA_VERSION: u32 = STEPS.len() as u32;

pub fn version(conn: &Connection) -> Result<u32, DbError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the schema up to `SCHEMA_VERSION`. A database written by a newer
/// build is refused rather than touched.
pub fn run(conn: &mut Connection) -> Result<(), DbError> {
    let found = version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (i, step) in STEPS.iter().enumerate().skip(found as usize) {
        tx.execute_batch(step)?;
        tx.pragma_update(None, "user_version", i as u32 + 1)?;
    }
    tx.commit()?;
    info!(from = found, to = SCHEMA_VERSION, "migrated subtask schema");
    Ok(())
}
