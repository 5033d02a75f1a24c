use thiserror::Error;

#[derive(Debug, Error)]
pub enum VeloceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("parse error: {0}")]
    Parse(String),
}
