use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::breakdown::BreakdownStep;
use crate::subtask::{SubTask, SubTaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
}

impl MoveDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveDirection::Up => "up",
            MoveDirection::Down => "down",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "up" => Some(MoveDirection::Up),
            "down" => Some(MoveDirection::Down),
            _ => None,
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered sub-task collection for one parent task.
///
/// Items are always held sorted by `order_index`, and after every mutation
/// the indices are exactly `1..=len`. Invalid input (blank titles, unknown
/// ids, moves past either end) is rejected as a no-op; mutators report
/// whether anything changed instead of returning errors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubTaskList {
    task_id: String,
    items: Vec<SubTask>,
}

impl SubTaskList {
    pub fn new(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            items: Vec::new(),
        }
    }

    /// Adopt existing rows, sorting by their stored order and re-stamping
    /// so gaps or duplicates from the store are repaired.
    pub fn from_subtasks(task_id: &str, mut items: Vec<SubTask>) -> Self {
        items.sort_by_key(|s| s.order_index);
        let mut list = Self {
            task_id: task_id.to_string(),
            items,
        };
        list.restamp();
        list
    }

    /// Build a fresh pending list from generated steps, numbered from 1.
    pub fn from_breakdown(task_id: &str, steps: &[BreakdownStep]) -> Self {
        let items = steps
            .iter()
            .filter(|step| !step.title.trim().is_empty())
            .enumerate()
            .map(|(i, step)| {
                SubTask::new(task_id, step.title.trim(), i as u32 + 1)
                    .with_estimate(step.estimated_minutes)
                    .with_reasoning(step.reasoning.clone())
            })
            .collect();
        Self {
            task_id: task_id.to_string(),
            items,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn items(&self) -> &[SubTask] {
        &self.items
    }

    pub fn into_items(self) -> Vec<SubTask> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SubTask> {
        self.items.iter().find(|s| s.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|s| s.id == id)
    }

    fn restamp(&mut self) {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.order_index = i as u32 + 1;
        }
    }

    // -- Aggregation --

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|s| s.is_completed()).count()
    }

    /// Fraction of completed sub-tasks; 0 for an empty list.
    pub fn progress(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.items.len() as f64
    }

    pub fn progress_percent(&self) -> u8 {
        (self.progress() * 100.0).round() as u8
    }

    pub fn progress_display(&self) -> String {
        format!("{}/{}", self.completed_count(), self.items.len())
    }

    /// Sum of estimates over sub-tasks not yet completed; missing estimates count as 0.
    pub fn remaining_minutes(&self) -> u32 {
        self.items
            .iter()
            .filter(|s| !s.is_completed())
            .filter_map(|s| s.estimated_minutes)
            .fold(0u32, |total, m| total.saturating_add(m))
    }

    pub fn remaining_display(&self) -> Option<String> {
        match self.remaining_minutes() {
            0 => None,
            m => Some(format_minutes(m)),
        }
    }

    /// First sub-task in order that is not completed.
    pub fn current_step(&self) -> Option<&SubTask> {
        self.items.iter().find(|s| !s.is_completed())
    }

    pub fn is_complete(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(SubTask::is_completed)
    }

    // -- Mutations --

    /// Append a manually entered sub-task. Blank titles are rejected.
    pub fn add(&mut self, title: &str) -> Option<&SubTask> {
        self.add_with_estimate(title, None)
    }

    pub fn add_with_estimate(&mut self, title: &str, minutes: Option<u32>) -> Option<&SubTask> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let order = self.items.len() as u32 + 1;
        self.items
            .push(SubTask::new(&self.task_id, title, order).with_estimate(minutes));
        self.items.last()
    }

    /// Replace a title. Blank or unchanged input leaves the prior title in place.
    pub fn edit(&mut self, id: &str, new_title: &str) -> bool {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return false;
        }
        match self.items.iter_mut().find(|s| s.id == id) {
            Some(item) if item.title != new_title => {
                item.title = new_title.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn cycle(&mut self, id: &str) -> Option<SubTaskStatus> {
        self.cycle_at(id, Utc::now())
    }

    pub fn cycle_at(&mut self, id: &str, now: DateTime<Utc>) -> Option<SubTaskStatus> {
        self.items
            .iter_mut()
            .find(|s| s.id == id)
            .map(|s| s.cycle_status_at(now))
    }

    /// Swap with the neighbour in `direction`, then re-stamp the whole list.
    /// Returns false (list untouched) at either end or for an unknown id.
    pub fn move_subtask(&mut self, id: &str, direction: MoveDirection) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        let target = match direction {
            MoveDirection::Up if pos > 0 => pos - 1,
            MoveDirection::Down if pos + 1 < self.items.len() => pos + 1,
            _ => return false,
        };
        self.items.swap(pos, target);
        self.restamp();
        true
    }

    /// Move to an arbitrary 0-based position, as a drag-and-drop does.
    pub fn move_to(&mut self, id: &str, to: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let to = to.min(self.items.len() - 1);
        if from == to {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.restamp();
        true
    }

    pub fn delete(&mut self, id: &str) -> Option<SubTask> {
        let pos = self.position(id)?;
        let removed = self.items.remove(pos);
        self.restamp();
        Some(removed)
    }
}

/// Render a minute count as `45m`, `1h` or `1h 30m`.
pub fn format_minutes(minutes: u32) -> String {
    let (h, m) = (minutes / 60, minutes % 60);
    match (h, m) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}
