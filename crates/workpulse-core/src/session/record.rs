//! Durable record model: work sessions and their break events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label used when the user starts a session without naming the task.
pub const UNTITLED_TASK: &str = "Untitled work";

/// Category of a break. The set is closed; strings from older data that
/// don't match a known kind become `Other` and display as a generic break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Toilet,
    Meal,
    Rest,
    Other,
}

impl BreakKind {
    /// Parse from a stored string. Unrecognized values fall back to `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "toilet" => BreakKind::Toilet,
            "meal" => BreakKind::Meal,
            "rest" => BreakKind::Rest,
            _ => BreakKind::Other,
        }
    }

    /// Stable string form for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakKind::Toilet => "toilet",
            BreakKind::Meal => "meal",
            BreakKind::Rest => "rest",
            BreakKind::Other => "other",
        }
    }

    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            BreakKind::Toilet => "Toilet break",
            BreakKind::Meal => "Meal break",
            BreakKind::Rest => "Rest",
            BreakKind::Other => "Break",
        }
    }
}

impl std::fmt::Display for BreakKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One discrete break interval within a session.
///
/// `end_time` stays unset while the break is running; `duration` is the
/// tick-accumulated length in seconds, frozen when the break ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub kind: BreakKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: u64,
}

impl BreakRecord {
    /// Create an open break draft for the given session.
    pub fn begin(session_id: Uuid, kind: BreakKind, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            kind,
            start_time: at,
            end_time: None,
            duration: 0,
        }
    }
}

/// One continuous work engagement, possibly interrupted by breaks.
///
/// Created as an in-memory draft when the session starts; mutated by tick
/// accumulation and break completion; finalized and persisted on stop.
/// `focus_duration + break_duration` need not equal the wall-clock span
/// between `start_time` and `end_time` -- pauses count in neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub task_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds spent in the working state.
    pub focus_duration: u64,
    /// Sum of all associated break durations, in seconds.
    pub break_duration: u64,
    pub created_at: DateTime<Utc>,
    /// Completed breaks, ordered by start time.
    pub break_events: Vec<BreakRecord>,
}

impl SessionRecord {
    /// Create an open session draft. An empty or whitespace-only task name
    /// gets the placeholder label.
    pub fn begin(task_name: &str, at: DateTime<Utc>) -> Self {
        let name = task_name.trim();
        Self {
            id: Uuid::new_v4(),
            task_name: if name.is_empty() {
                UNTITLED_TASK.to_string()
            } else {
                name.to_string()
            },
            start_time: at,
            end_time: None,
            focus_duration: 0,
            break_duration: 0,
            created_at: at,
            break_events: Vec::new(),
        }
    }

    /// Whether the session is still open (not yet stopped).
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}
