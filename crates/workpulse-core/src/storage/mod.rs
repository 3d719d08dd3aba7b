mod config;
pub mod database;
pub mod migrations;

pub use config::{AudioConfig, Config, NotificationsConfig, TimerConfig};
pub use database::Database;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::session::SessionRecord;

/// Durable storage contract the session core depends on.
///
/// The machine only ever writes a finished session (save may fail; the
/// failure is reported, never retried automatically) and reads ranges for
/// aggregation. Deleting a session cascades to its break events.
pub trait RecordStore {
    /// Durably store a finalized session together with its break events.
    fn save_session(&self, session: &SessionRecord) -> Result<(), DatabaseError>;

    /// All sessions, sorted by `start_time` descending.
    fn sessions_desc(&self) -> Result<Vec<SessionRecord>, DatabaseError>;

    /// Sessions whose `start_time` falls in the half-open range `[start, end)`.
    fn sessions_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>, DatabaseError>;

    /// Delete one session and, by cascade, its break events.
    fn delete_session(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Delete a single break event without touching the owning session.
    fn delete_break_event(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Wipe every record of every kind. Callers broadcast the data-reset
    /// event afterward so subscribers can refresh.
    fn delete_all(&self) -> Result<(), DatabaseError>;
}

/// Returns `~/.config/workpulse[-dev]/` based on WORKPULSE_ENV, or the
/// directory named by WORKPULSE_DATA_DIR when set (used by tests).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = if let Ok(explicit) = std::env::var("WORKPULSE_DATA_DIR") {
        PathBuf::from(explicit)
    } else {
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config");
        let env = std::env::var("WORKPULSE_ENV").unwrap_or_else(|_| "production".to_string());
        if env == "dev" {
            base_dir.join("workpulse-dev")
        } else {
            base_dir.join("workpulse")
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
