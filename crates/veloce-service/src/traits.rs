use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use veloce_core::breakdown::BreakdownStep;
use veloce_core::subtask::SubTask;
use veloce_core::VeloceError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<VeloceError> for ServiceError {
    fn from(e: VeloceError) -> Self {
        match e {
            VeloceError::NotFound(msg) => ServiceError::NotFound(msg),
            VeloceError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
            VeloceError::Parse(msg) => ServiceError::Internal(format!("parse: {msg}")),
        }
    }
}

/// Row-oriented persistence of the `subtasks` collection.
///
/// `LocalStore` wraps the SQLite database, `HttpStore` a remote REST row
/// service. Writes are last-writer-wins per row; there is no transaction
/// spanning `delete_for_task` and `insert_many`.
#[async_trait]
pub trait SubTaskStore: Send + Sync {
    async fn list_for_task(&self, task_id: &str) -> Result<Vec<SubTask>, ServiceError>;
    async fn delete_for_task(&self, task_id: &str) -> Result<(), ServiceError>;
    async fn insert_many(&self, rows: &[SubTask]) -> Result<(), ServiceError>;
    async fn upsert(&self, row: &SubTask) -> Result<(), ServiceError>;
    async fn delete(&self, id: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownRequest {
    pub task_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl BreakdownRequest {
    pub fn new(task_title: &str, context: Option<&str>) -> Self {
        Self {
            task_title: task_title.to_string(),
            context: context
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
        }
    }
}

/// Produces an ordered step list for a task title.
///
/// Callers treat any error as a signal to use the local fallback.
#[async_trait]
pub trait BreakdownGenerator: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    async fn generate(&self, request: &BreakdownRequest)
        -> Result<Vec<BreakdownStep>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_drops_blank_context() {
        assert_eq!(BreakdownRequest::new("t", Some("   ")).context, None);
        assert_eq!(BreakdownRequest::new("t", None).context, None);
        assert_eq!(
            BreakdownRequest::new("t", Some(" for Monday ")).context.as_deref(),
            Some("for Monday")
        );
    }

    #[test]
    fn request_serializes_without_empty_context() {
        let json = serde_json::to_value(BreakdownRequest::new("Plan", None)).unwrap();
        assert_eq!(json, serde_json::json!({ "task_title": "Plan" }));
    }

    #[test]
    fn parse_error_maps_to_internal() {
        let err: ServiceError = VeloceError::Parse("bad".into()).into();
        assert!(matches!(err, ServiceError::Internal(msg) if msg == "parse: bad"));
    }
}
