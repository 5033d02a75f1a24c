use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use veloce_core::checklist::MoveDirection;
use veloce_service::SessionConfig;

#[derive(Debug, Parser)]
#[command(name = "veloce", about = "Sub-task checklists with generated breakdowns")]
pub struct CliConfig {
    /// SQLite database path (ignored when a remote store is configured)
    #[arg(long, env = "VELOCE_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Base URL of the remote row service
    #[arg(long, env = "VELOCE_REMOTE_URL", global = true)]
    pub remote_url: Option<String>,

    /// API key for the remote row service
    #[arg(long, env = "VELOCE_REMOTE_KEY", global = true, hide_env_values = true)]
    pub remote_key: Option<String>,

    /// Breakdown endpoint. Without it, breakdowns use the built-in templates.
    #[arg(long, env = "VELOCE_AI_URL", global = true)]
    pub ai_url: Option<String>,

    /// API key for the breakdown endpoint
    #[arg(long, env = "VELOCE_AI_KEY", global = true, hide_env_values = true)]
    pub ai_key: Option<String>,

    /// Quiet period before regenerating after context edits (milliseconds)
    #[arg(long, env = "VELOCE_DEBOUNCE_MS", default_value = "500", global = true)]
    pub debounce_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replace a task's checklist with a generated breakdown
    Breakdown {
        task_id: String,
        /// Task title the breakdown is generated from
        title: String,
        /// Extra free-text context for the generator
        #[arg(long)]
        context: Option<String>,
    },
    /// Show a task's checklist
    List { task_id: String },
    /// Append a sub-task
    Add {
        task_id: String,
        title: String,
        /// Estimated minutes
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Advance a sub-task: pending -> in progress -> completed -> pending
    Cycle {
        task_id: String,
        /// Position (1-based) or id prefix
        subtask: String,
    },
    /// Rename a sub-task
    Edit {
        task_id: String,
        subtask: String,
        title: String,
    },
    /// Move a sub-task one place up or down
    Move {
        task_id: String,
        subtask: String,
        #[arg(value_parser = parse_direction)]
        direction: MoveDirection,
    },
    /// Remove a sub-task
    Delete { task_id: String, subtask: String },
}

impl Command {
    pub fn task_id(&self) -> &str {
        match self {
            Command::Breakdown { task_id, .. }
            | Command::List { task_id }
            | Command::Add { task_id, .. }
            | Command::Cycle { task_id, .. }
            | Command::Edit { task_id, .. }
            | Command::Move { task_id, .. }
            | Command::Delete { task_id, .. } => task_id,
        }
    }
}

fn parse_direction(s: &str) -> Result<MoveDirection, String> {
    MoveDirection::parse_str(&s.to_lowercase())
        .ok_or_else(|| format!("expected `up` or `down`, got `{s}`"))
}

impl CliConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            debounce: Duration::from_millis(self.debounce_ms),
        }
    }
}
