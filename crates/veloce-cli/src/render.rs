use std::fmt::Write;

use veloce_core::checklist::{format_minutes, SubTaskList};
use veloce_core::subtask::SubTask;

const SHORT_ID_LEN: usize = 8;

/// Find a sub-task by 1-based position or by unique id prefix.
pub fn resolve<'a>(list: &'a SubTaskList, key: &str) -> Option<&'a SubTask> {
    let key = key.trim();
    if let Ok(position) = key.parse::<usize>() {
        if let Some(item) = position.checked_sub(1).and_then(|i| list.items().get(i)) {
            return Some(item);
        }
    }
    let mut matches = list.items().iter().filter(|s| s.id.starts_with(key));
    match (matches.next(), matches.next()) {
        (Some(only), None) if !key.is_empty() => Some(only),
        _ => None,
    }
}

fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Plain-text checklist: a summary line, then one line per sub-task.
pub fn render_checklist(list: &SubTaskList) -> String {
    let mut out = String::new();
    if list.is_empty() {
        let _ = writeln!(out, "No sub-tasks for {}", list.task_id());
        return out;
    }

    let _ = write!(
        out,
        "Progress {} ({}%)",
        list.progress_display(),
        list.progress_percent()
    );
    if let Some(remaining) = list.remaining_display() {
        let _ = write!(out, ", {remaining} remaining");
    }
    out.push('\n');

    let current = list.current_step().map(|s| s.id.as_str());
    for item in list.items() {
        let marker = if Some(item.id.as_str()) == current { ">" } else { " " };
        let _ = write!(
            out,
            "{marker}{:>3}. {} {}",
            item.order_index,
            item.status.symbol(),
            item.title
        );
        if let Some(minutes) = item.estimated_minutes {
            let _ = write!(out, " ({})", format_minutes(minutes));
        }
        let _ = writeln!(out, "  [{}]", short_id(&item.id));
        if let Some(reasoning) = &item.ai_reasoning {
            let _ = writeln!(out, "        {reasoning}");
        }
    }
    out
}
