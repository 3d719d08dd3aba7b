//! Session state machine.
//!
//! The machine is caller-ticked: it has no internal threads, and the
//! caller delivers one `tick()` per elapsed second while the clock is
//! running. User intents and ticks are serialized onto one execution
//! context, so no two transitions ever run concurrently.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Working <-> Paused
//!           ^  |
//!           |  v
//!         OnBreak
//! ```
//!
//! Invalid intents in a given state are silent no-ops (`None`). A data
//! reset forces the machine back to `Idle` from any state, discarding any
//! open draft unsaved.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertPort, AudioPort};
use crate::events::Event;
use crate::stats::TodayAggregator;
use crate::storage::{RecordStore, TimerConfig};

use super::record::{BreakKind, BreakRecord, SessionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Working,
    Paused,
    OnBreak,
}

/// Timer settings consumed by the machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimerSettings {
    pub target_focus_minutes: u32,
    pub target_mode_enabled: bool,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            target_focus_minutes: 25,
            target_mode_enabled: false,
        }
    }
}

impl From<&TimerConfig> for TimerSettings {
    fn from(cfg: &TimerConfig) -> Self {
        Self {
            target_focus_minutes: cfg.target_focus_minutes.max(1),
            target_mode_enabled: cfg.target_mode_enabled,
        }
    }
}

/// Serializable state of a [`SessionMachine`], without its ports.
///
/// The CLI persists this between invocations and restores it with live
/// ports; `saved_at` lets the caller deliver wall-clock catch-up ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub state: SessionState,
    pub session: Option<SessionRecord>,
    pub open_break: Option<BreakRecord>,
    pub focus_secs: u64,
    pub break_secs: u64,
    pub total_break_secs: u64,
    pub target_focus_minutes: u32,
    pub target_mode: bool,
    pub clock_running: bool,
    pub saved_at: DateTime<Utc>,
}

/// The session state machine.
///
/// Owns the current session/break drafts and elapsed counters, converts
/// intents and clock ticks into transitions and record mutations, and
/// issues commands to the injected alert/audio ports. The store's open
/// draft is exclusively owned here for its entire lifetime.
pub struct SessionMachine {
    state: SessionState,
    /// Open session draft; `None` while idle.
    session: Option<SessionRecord>,
    /// Running break draft; held in memory until finalized.
    open_break: Option<BreakRecord>,
    /// Seconds accumulated in the working state this session.
    focus_secs: u64,
    /// Seconds accumulated in the current break.
    break_secs: u64,
    /// Sum of finished break durations this session.
    total_break_secs: u64,
    target_focus_minutes: u32,
    target_mode: bool,
    clock_running: bool,
    today: TodayAggregator,
    store: Rc<dyn RecordStore>,
    alert: Box<dyn AlertPort>,
    audio: Box<dyn AudioPort>,
}

impl SessionMachine {
    pub fn new(
        settings: TimerSettings,
        store: Rc<dyn RecordStore>,
        alert: Box<dyn AlertPort>,
        audio: Box<dyn AudioPort>,
    ) -> Self {
        let mut machine = Self {
            state: SessionState::Idle,
            session: None,
            open_break: None,
            focus_secs: 0,
            break_secs: 0,
            total_break_secs: 0,
            target_focus_minutes: settings.target_focus_minutes.max(1),
            target_mode: settings.target_mode_enabled,
            clock_running: false,
            today: TodayAggregator::new(),
            store,
            alert,
            audio,
        };
        machine.refresh_today();
        machine
    }

    /// Rebuild a machine from a persisted snapshot and live ports.
    pub fn restore(
        snapshot: MachineSnapshot,
        store: Rc<dyn RecordStore>,
        alert: Box<dyn AlertPort>,
        audio: Box<dyn AudioPort>,
    ) -> Self {
        let mut machine = Self {
            state: snapshot.state,
            session: snapshot.session,
            open_break: snapshot.open_break,
            focus_secs: snapshot.focus_secs,
            break_secs: snapshot.break_secs,
            total_break_secs: snapshot.total_break_secs,
            target_focus_minutes: snapshot.target_focus_minutes.max(1),
            target_mode: snapshot.target_mode,
            clock_running: snapshot.clock_running,
            today: TodayAggregator::new(),
            store,
            alert,
            audio,
        };
        machine.refresh_today();
        machine
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            state: self.state,
            session: self.session.clone(),
            open_break: self.open_break.clone(),
            focus_secs: self.focus_secs,
            break_secs: self.break_secs,
            total_break_secs: self.total_break_secs,
            target_focus_minutes: self.target_focus_minutes,
            target_mode: self.target_mode,
            clock_running: self.clock_running,
            saved_at: Utc::now(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn focus_secs(&self) -> u64 {
        self.focus_secs
    }

    pub fn current_break_secs(&self) -> u64 {
        self.break_secs
    }

    pub fn total_break_secs(&self) -> u64 {
        self.total_break_secs
    }

    pub fn task_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.task_name.as_str())
    }

    pub fn today_total_secs(&self) -> u64 {
        self.today.total_secs()
    }

    pub fn target_mode_enabled(&self) -> bool {
        self.target_mode
    }

    pub fn clock_running(&self) -> bool {
        self.clock_running
    }

    /// Remaining countdown in seconds, while target mode is armed.
    pub fn remaining_target_secs(&self) -> Option<u64> {
        self.target_mode
            .then(|| self.target_secs().saturating_sub(self.focus_secs))
    }

    /// Build a full state snapshot event.
    pub fn status(&self) -> Event {
        Event::StateSnapshot {
            state: self.state,
            task_name: self.session.as_ref().map(|s| s.task_name.clone()),
            focus_secs: self.focus_secs,
            break_secs: self.break_secs,
            total_break_secs: self.total_break_secs,
            remaining_target_secs: self.remaining_target_secs(),
            today_total_secs: self.today.total_secs(),
            at: Utc::now(),
        }
    }

    /// Update the target settings. Takes effect immediately; enabling
    /// target mode mid-session arms the clamp against the current counter.
    /// A target at or below the accumulated focus pauses on the next tick
    /// without lowering the counter.
    pub fn configure_target(&mut self, minutes: u32, enabled: bool) {
        self.target_focus_minutes = minutes.max(1);
        self.target_mode = enabled;
    }

    // ── Intents ──────────────────────────────────────────────────────

    /// Start a new session. No-op unless idle.
    pub fn start(&mut self, task_name: &str) -> Option<Event> {
        if self.state != SessionState::Idle {
            return None;
        }

        let now = Utc::now();
        let session = SessionRecord::begin(task_name, now);
        let session_id = session.id;
        let task = session.task_name.clone();
        self.session = Some(session);
        self.focus_secs = 0;
        self.break_secs = 0;
        self.total_break_secs = 0;

        let target_secs = self.remaining_target_secs();
        self.schedule_target_alert();
        self.audio.play();

        self.state = SessionState::Working;
        self.clock_running = true;
        Some(Event::SessionStarted {
            session_id,
            task_name: task,
            target_secs,
            at: now,
        })
    }

    /// Pause the working session. No-op unless working.
    pub fn pause(&mut self) -> Option<Event> {
        if self.state != SessionState::Working {
            return None;
        }
        self.apply_pause_effects();
        Some(Event::SessionPaused {
            focus_secs: self.focus_secs,
            at: Utc::now(),
        })
    }

    /// Resume from pause. No-op unless paused.
    pub fn resume(&mut self) -> Option<Event> {
        if self.state != SessionState::Paused {
            return None;
        }
        self.state = SessionState::Working;
        self.clock_running = true;
        self.audio.play();
        self.schedule_target_alert();
        Some(Event::SessionResumed {
            focus_secs: self.focus_secs,
            remaining_target_secs: self.remaining_target_secs(),
            at: Utc::now(),
        })
    }

    /// Begin a categorized break. No-op unless working.
    pub fn start_break(&mut self, kind: BreakKind) -> Option<Event> {
        if self.state != SessionState::Working {
            return None;
        }
        let session_id = self.session.as_ref()?.id;

        self.clock_running = false;
        self.audio.pause();
        self.alert.cancel_all_pending();

        let now = Utc::now();
        self.break_secs = 0;
        self.open_break = Some(BreakRecord::begin(session_id, kind, now));

        self.state = SessionState::OnBreak;
        self.clock_running = true;
        Some(Event::BreakStarted { kind, at: now })
    }

    /// Finish the running break and return to working. No-op unless on break.
    pub fn end_break(&mut self) -> Option<Event> {
        if self.state != SessionState::OnBreak {
            return None;
        }
        self.clock_running = false;

        let now = Utc::now();
        let mut kind = BreakKind::Rest;
        let duration = self.break_secs;
        if let Some(mut brk) = self.open_break.take() {
            brk.end_time = Some(now);
            brk.duration = duration;
            kind = brk.kind;
            self.total_break_secs += duration;
            if let Some(session) = self.session.as_mut() {
                session.break_events.push(brk);
            }
        }
        self.break_secs = 0;

        self.state = SessionState::Working;
        self.audio.play();
        self.clock_running = true;
        self.schedule_target_alert();
        Some(Event::BreakEnded {
            kind,
            duration_secs: duration,
            total_break_secs: self.total_break_secs,
            at: now,
        })
    }

    /// Stop and finalize the session. No-op while idle.
    ///
    /// Persistence failure is logged and does not roll the machine back:
    /// the session is ended from the user's perspective regardless.
    pub fn stop(&mut self) -> Option<Event> {
        if self.state == SessionState::Idle {
            return None;
        }
        if self.state == SessionState::OnBreak {
            self.end_break();
        }

        self.clock_running = false;
        self.audio.pause();
        self.alert.cancel_all_pending();

        let mut session = self.session.take()?;
        let now = Utc::now();
        session.end_time = Some(now);
        session.focus_duration = self.focus_secs;
        session.break_duration = self.total_break_secs;

        let persisted = match self.store.save_session(&session) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(session_id = %session.id, error = %e,
                    "failed to persist session; the session is ended regardless");
                false
            }
        };

        let focus_secs = self.focus_secs;
        let break_secs = self.total_break_secs;
        self.state = SessionState::Idle;
        self.focus_secs = 0;
        self.break_secs = 0;
        self.total_break_secs = 0;

        self.refresh_today();
        Some(Event::SessionCompleted {
            session_id: session.id,
            focus_secs,
            break_secs,
            persisted,
            at: now,
        })
    }

    /// React to the external "data was reset" event, from any state.
    ///
    /// Destructive: an in-flight session is discarded unsaved.
    pub fn handle_data_reset(&mut self) -> Event {
        self.state = SessionState::Idle;
        self.session = None;
        self.open_break = None;
        self.focus_secs = 0;
        self.break_secs = 0;
        self.total_break_secs = 0;
        self.clock_running = false;
        self.alert.cancel_all_pending();
        self.audio.pause();
        self.refresh_today();
        Event::DataReset { at: Utc::now() }
    }

    // ── Tick processing ──────────────────────────────────────────────

    /// Advance one second of elapsed time. Only meaningful while the
    /// clock is running in `Working` or `OnBreak`.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.clock_running {
            return None;
        }
        match self.state {
            SessionState::Working => {
                let before = self.focus_secs;
                self.focus_secs += 1;
                if self.target_mode {
                    let target = self.target_secs();
                    if self.focus_secs >= target {
                        // Clamp only when this tick crossed the boundary. A
                        // target re-armed below the counter still pauses, but
                        // accumulated focus is never rewound.
                        if before < target {
                            self.focus_secs = target;
                        }
                        self.alert.play_tone();
                        self.alert
                            .speak("Focus time is over. Stand up and move around!");
                        self.apply_pause_effects();
                        // One-shot: does not re-arm automatically.
                        self.target_mode = false;
                        return Some(Event::TargetReached {
                            focus_secs: self.focus_secs,
                            at: Utc::now(),
                        });
                    }
                }
                None
            }
            SessionState::OnBreak => {
                self.break_secs += 1;
                None
            }
            _ => None,
        }
    }

    /// Deliver `n` ticks, returning the last event produced (the target
    /// clamp fires at most once per arming).
    pub fn tick_n(&mut self, n: u64) -> Option<Event> {
        let mut last = None;
        for _ in 0..n {
            if let Some(ev) = self.tick() {
                last = Some(ev);
            }
        }
        last
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn target_secs(&self) -> u64 {
        u64::from(self.target_focus_minutes) * 60
    }

    /// Shared by the `pause` intent and the tick-driven target clamp.
    /// Cancelling pending alerts here is what keeps the redundant
    /// scheduled alert from double-firing after a tick-driven pause.
    fn apply_pause_effects(&mut self) {
        self.state = SessionState::Paused;
        self.clock_running = false;
        self.audio.pause();
        self.alert.cancel_all_pending();
    }

    fn schedule_target_alert(&mut self) {
        if let Some(remaining) = self.remaining_target_secs() {
            if remaining > 0 {
                self.alert.schedule_alert(
                    remaining,
                    "Focus time over",
                    &format!(
                        "Your {}-minute focus target is up. Time for a break!",
                        self.target_focus_minutes
                    ),
                );
            }
        }
    }

    fn refresh_today(&mut self) {
        if let Err(e) = self.today.refresh(self.store.as_ref()) {
            tracing::warn!(error = %e, "could not recompute today's focus total");
        }
    }
}
