pub mod breakdown;
pub mod checklist;
pub mod error;
pub mod subtask;

pub use breakdown::{
    clean_steps, fallback_breakdown, parse_breakdown, BreakdownStep, FallbackTemplate,
};
pub use checklist::{format_minutes, MoveDirection, SubTaskList};
pub use error::VeloceError;
pub use subtask::{SubTask, SubTaskStatus};
