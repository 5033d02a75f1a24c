use async_trait::async_trait;
use veloce_core::subtask::SubTask;
use veloce_db::{Db, DbError};

use crate::{ServiceError, SubTaskStore};

/// Local implementation backed by direct SQLite access.
#[derive(Clone)]
pub struct LocalStore {
    db: Db,
}

impl LocalStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Run a blocking query off the async executor.
    async fn blocking<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&Db) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?
            .map_err(ServiceError::from)
    }
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(msg) => ServiceError::NotFound(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

#[async_trait]
impl SubTaskStore for LocalStore {
    async fn list_for_task(&self, task_id: &str) -> Result<Vec<SubTask>, ServiceError> {
        let task_id = task_id.to_string();
        self.blocking(move |db| db.list_subtasks(&task_id)).await
    }

    async fn delete_for_task(&self, task_id: &str) -> Result<(), ServiceError> {
        let task_id = task_id.to_string();
        self.blocking(move |db| db.delete_subtasks_for_task(&task_id).map(|_| ()))
            .await
    }

    async fn insert_many(&self, rows: &[SubTask]) -> Result<(), ServiceError> {
        let rows = rows.to_vec();
        self.blocking(move |db| db.insert_subtasks(&rows)).await
    }

    async fn upsert(&self, row: &SubTask) -> Result<(), ServiceError> {
        let row = row.clone();
        self.blocking(move |db| db.upsert_subtask(&row)).await
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = id.to_string();
        self.blocking(move |db| db.delete_subtask(&id)).await
    }
}
