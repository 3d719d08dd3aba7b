use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{BreakKind, SessionState};

/// Every state change in the session machine produces an Event.
/// The CLI prints them; tests assert on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        task_name: String,
        /// Countdown in seconds when target mode is enabled.
        target_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    SessionPaused {
        focus_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        focus_secs: u64,
        remaining_target_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    BreakStarted {
        kind: BreakKind,
        at: DateTime<Utc>,
    },
    BreakEnded {
        kind: BreakKind,
        duration_secs: u64,
        total_break_secs: u64,
        at: DateTime<Utc>,
    },
    /// Target countdown hit zero; the machine clamped the focus counter,
    /// fired the audible alert, and auto-paused.
    TargetReached {
        focus_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        focus_secs: u64,
        break_secs: u64,
        /// False when durable storage failed; the session still ended.
        persisted: bool,
        at: DateTime<Utc>,
    },
    DataReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        task_name: Option<String>,
        focus_secs: u64,
        break_secs: u64,
        total_break_secs: u64,
        remaining_target_secs: Option<u64>,
        today_total_secs: u64,
        at: DateTime<Utc>,
    },
}

/// Explicit registration point for the "data was reset" broadcast.
///
/// Any component holding derived state (the session machine, a history
/// view, the today aggregator) registers a callback and refreshes itself
/// when the store is wiped.
#[derive(Default)]
pub struct ResetHub {
    subscribers: Vec<Box<dyn Fn()>>,
}

impl ResetHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F: Fn() + 'static>(&mut self, f: F) {
        self.subscribers.push(Box::new(f));
    }

    pub fn broadcast(&self) {
        for f in &self.subscribers {
            f();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn reset_hub_notifies_every_subscriber() {
        let hits = Rc::new(Cell::new(0u32));
        let mut hub = ResetHub::new();
        for _ in 0..3 {
            let hits = Rc::clone(&hits);
            hub.subscribe(move || hits.set(hits.get() + 1));
        }
        hub.broadcast();
        assert_eq!(hits.get(), 3);
        hub.broadcast();
        assert_eq!(hits.get(), 6);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let ev = Event::DataReset { at: Utc::now() };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"type\":\"data_reset\""));
    }
}
