//! # WorkPulse Core Library
//!
//! Core business logic for the WorkPulse focus timer: a user names a
//! task, runs a work interval, interleaves categorized breaks, and the
//! system records elapsed durations for later review.
//!
//! ## Architecture
//!
//! - **Session machine**: a caller-ticked state machine (idle / working /
//!   paused / on-break) that accumulates durations, enforces the
//!   target-duration countdown, and persists completed sessions
//! - **Storage**: SQLite-based session records and TOML-based configuration
//! - **Ports**: alerting and ambient-audio traits injected into the
//!   machine so it is testable without real timers or OS notifications
//! - **Stats**: today's-total aggregation over the record store
//!
//! ## Key components
//!
//! - [`SessionMachine`]: the session/timer state machine
//! - [`Database`]: session persistence behind the [`RecordStore`] port
//! - [`TodayAggregator`]: local-calendar-day focus total
//! - [`Config`]: application configuration management

pub mod alert;
pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod storage;

pub use alert::{AlertPort, AudioPort, NullAlert, NullAudio};
pub use error::{ConfigError, DatabaseError};
pub use events::{Event, ResetHub};
pub use session::{
    BreakKind, BreakRecord, MachineSnapshot, SecondClock, SessionMachine, SessionRecord,
    SessionState, TimerSettings,
};
pub use stats::{Stats, TodayAggregator};
pub use storage::{Config, Database, RecordStore};
