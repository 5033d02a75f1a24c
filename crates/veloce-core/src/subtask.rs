use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl SubTaskStatus {
    pub const ALL: &[SubTaskStatus] = &[
        SubTaskStatus::Pending,
        SubTaskStatus::InProgress,
        SubTaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubTaskStatus::Pending => "pending",
            SubTaskStatus::InProgress => "in_progress",
            SubTaskStatus::Completed => "completed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubTaskStatus::Pending => "Pending",
            SubTaskStatus::InProgress => "In Progress",
            SubTaskStatus::Completed => "Completed",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubTaskStatus::Pending),
            "in_progress" => Some(SubTaskStatus::InProgress),
            "completed" => Some(SubTaskStatus::Completed),
            _ => None,
        }
    }

    /// Successor on the status ring: pending -> in progress -> completed -> pending.
    pub fn next(&self) -> Self {
        match self {
            SubTaskStatus::Pending => SubTaskStatus::InProgress,
            SubTaskStatus::InProgress => SubTaskStatus::Completed,
            SubTaskStatus::Completed => SubTaskStatus::Pending,
        }
    }

    /// Checkbox glyph used by plain-text renderers.
    pub fn symbol(&self) -> &'static str {
        match self {
            SubTaskStatus::Pending => "[ ]",
            SubTaskStatus::InProgress => "[~]",
            SubTaskStatus::Completed => "[x]",
        }
    }
}

impl fmt::Display for SubTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single checklist item belonging to a parent task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    /// Owning task. Used to correlate persisted rows only.
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
    pub status: SubTaskStatus,
    /// 1-based position within the parent's list.
    pub order_index: u32,
    #[serde(default)]
    pub ai_reasoning: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SubTask {
    /// A fresh pending sub-task with a generated id.
    pub fn new(task_id: &str, title: &str, order_index: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            title: title.to_string(),
            estimated_minutes: None,
            status: SubTaskStatus::Pending,
            order_index,
            ai_reasoning: None,
            completed_at: None,
        }
    }

    pub fn with_estimate(mut self, minutes: Option<u32>) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    pub fn with_reasoning(mut self, reasoning: Option<String>) -> Self {
        self.ai_reasoning = reasoning;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == SubTaskStatus::Completed
    }

    /// Advance one step around the status ring, stamping `completed_at`
    /// on entry to completed and clearing it everywhere else.
    pub fn cycle_status_at(&mut self, now: DateTime<Utc>) -> SubTaskStatus {
        self.status = self.status.next();
        self.completed_at = match self.status {
            SubTaskStatus::Completed => Some(now),
            _ => None,
        };
        self.status
    }

    pub fn cycle_status(&mut self) -> SubTaskStatus {
        self.cycle_status_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_parse_str() {
        assert_eq!(
            SubTaskStatus::parse_str("pending"),
            Some(SubTaskStatus::Pending)
        );
        assert_eq!(
            SubTaskStatus::parse_str("in_progress"),
            Some(SubTaskStatus::InProgress)
        );
        assert_eq!(
            SubTaskStatus::parse_str("completed"),
            Some(SubTaskStatus::Completed)
        );
        assert_eq!(SubTaskStatus::parse_str("done"), None);
        assert_eq!(SubTaskStatus::parse_str(""), None);
    }

    #[test]
    fn status_as_str_roundtrip() {
        for s in SubTaskStatus::ALL {
            assert_eq!(SubTaskStatus::parse_str(s.as_str()), Some(*s));
        }
    }

    #[test]
    fn status_display() {
        for s in SubTaskStatus::ALL {
            assert_eq!(format!("{s}"), s.display_name());
        }
        assert_eq!(SubTaskStatus::InProgress.to_string(), "In Progress");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&SubTaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn new_subtask_is_pending() {
        let s = SubTask::new("task-1", "Draft outline", 1);
        assert_eq!(s.status, SubTaskStatus::Pending);
        assert_eq!(s.order_index, 1);
        assert_eq!(s.task_id, "task-1");
        assert!(s.completed_at.is_none());
        assert!(s.ai_reasoning.is_none());
        assert!(!s.id.is_empty());
    }

    #[test]
    fn cycle_walks_the_ring() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let mut s = SubTask::new("t", "Step", 1);

        assert_eq!(s.cycle_status_at(now), SubTaskStatus::InProgress);
        assert!(s.completed_at.is_none());

        assert_eq!(s.cycle_status_at(now), SubTaskStatus::Completed);
        assert_eq!(s.completed_at, Some(now));

        assert_eq!(s.cycle_status_at(now), SubTaskStatus::Pending);
        assert!(s.completed_at.is_none());
    }

    #[test]
    fn three_cycles_return_to_start() {
        for start in SubTaskStatus::ALL {
            let mut s = SubTask::new("t", "Step", 1);
            s.status = *start;
            if *start == SubTaskStatus::Completed {
                s.completed_at = Some(Utc::now());
            }
            for _ in 0..3 {
                s.cycle_status();
                assert_eq!(s.completed_at.is_some(), s.is_completed());
            }
            assert_eq!(s.status, *start);
        }
    }
}
