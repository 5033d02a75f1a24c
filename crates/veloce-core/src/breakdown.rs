use serde::{Deserialize, Serialize};

use crate::error::VeloceError;

/// One generated step, before it becomes a `SubTask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownStep {
    #[serde(alias = "step", alias = "name")]
    pub title: String,
    #[serde(default, alias = "estimatedMinutes", alias = "minutes")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, alias = "aiReasoning")]
    pub reasoning: Option<String>,
}

impl BreakdownStep {
    pub fn new(title: &str, estimated_minutes: Option<u32>, reasoning: Option<String>) -> Self {
        Self {
            title: title.to_string(),
            estimated_minutes,
            reasoning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTemplate {
    Document,
    Meeting,
    Generic,
}

const DOCUMENT_KEYWORDS: &[&str] = &["report", "reports", "presentation", "presentations"];
const MEETING_KEYWORDS: &[&str] = &["meeting", "meetings", "call", "calls"];

const DOCUMENT_STEPS: &[(&str, u32)] = &[
    ("Gather research and source material", 20),
    ("Outline the key sections", 15),
    ("Write the first draft", 45),
    ("Review and revise", 20),
    ("Final formatting and proofread", 10),
];

const MEETING_STEPS: &[(&str, u32)] = &[
    ("Define the agenda and goals", 10),
    ("Prepare materials and talking points", 20),
    ("Send invites and confirm attendees", 5),
    ("Write up notes and action items", 15),
];

const GENERIC_STEPS: &[(&str, u32)] = &[
    ("Clarify the goal and scope", 10),
    ("Gather what you need", 15),
    ("Do the core work", 45),
    ("Review and wrap up", 15),
];

impl FallbackTemplate {
    /// Pick a template by whole-word keyword match on the task title.
    /// Document keywords win over meeting keywords.
    pub fn for_title(title: &str) -> Self {
        let lower = title.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has_any = |keys: &[&str]| words.iter().any(|w| keys.contains(w));

        if has_any(DOCUMENT_KEYWORDS) {
            FallbackTemplate::Document
        } else if has_any(MEETING_KEYWORDS) {
            FallbackTemplate::Meeting
        } else {
            FallbackTemplate::Generic
        }
    }

    pub fn steps(&self) -> Vec<BreakdownStep> {
        let table = match self {
            FallbackTemplate::Document => DOCUMENT_STEPS,
            FallbackTemplate::Meeting => MEETING_STEPS,
            FallbackTemplate::Generic => GENERIC_STEPS,
        };
        table
            .iter()
            .map(|(title, minutes)| BreakdownStep::new(title, Some(*minutes), None))
            .collect()
    }
}

/// Deterministic local breakdown used whenever generation fails.
pub fn fallback_breakdown(task_title: &str) -> Vec<BreakdownStep> {
    FallbackTemplate::for_title(task_title).steps()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BreakdownPayload {
    Wrapped {
        #[serde(alias = "steps")]
        subtasks: Vec<BreakdownStep>,
    },
    Bare(Vec<BreakdownStep>),
}

/// Trim titles and reasoning, dropping steps whose title is blank.
pub fn clean_steps(steps: Vec<BreakdownStep>) -> Vec<BreakdownStep> {
    steps
        .into_iter()
        .filter_map(|mut step| {
            let title = step.title.trim();
            if title.is_empty() {
                return None;
            }
            step.title = title.to_string();
            step.reasoning = step
                .reasoning
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty());
            Some(step)
        })
        .collect()
}

/// Parse a generator reply into steps.
///
/// Accepts `{"subtasks": [...]}` or a bare array, optionally inside a
/// Markdown code fence. Blank titles are dropped; a reply with no usable
/// steps is an error so the caller can fall back.
pub fn parse_breakdown(text: &str) -> Result<Vec<BreakdownStep>, VeloceError> {
    let body = strip_code_fence(text.trim());
    let payload: BreakdownPayload =
        serde_json::from_str(body).map_err(|e| VeloceError::Parse(e.to_string()))?;
    let raw = match payload {
        BreakdownPayload::Wrapped { subtasks } => subtasks,
        BreakdownPayload::Bare(steps) => steps,
    };

    let steps = clean_steps(raw);

    if steps.is_empty() {
        return Err(VeloceError::Parse("breakdown contained no steps".into()));
    }
    Ok(steps)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
