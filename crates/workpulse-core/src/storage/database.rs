//! SQLite-based record storage.
//!
//! Provides persistent storage for:
//! - Completed work sessions and their break events
//! - Key-value store for application state (machine snapshot)
//!
//! Timestamps are stored as RFC 3339 TEXT so range predicates compare
//! correctly as strings.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::migrations;
use crate::error::DatabaseError;
use crate::session::{BreakKind, BreakRecord, SessionRecord};
use crate::storage::RecordStore;

/// Parse datetime from an RFC 3339 string with fallback to current time.
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_uuid_fallback(id_str: &str) -> Uuid {
    Uuid::parse_str(id_str).unwrap_or_default()
}

fn row_to_session(row: &rusqlite::Row) -> Result<SessionRecord, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let start_str: String = row.get(2)?;
    let end_str: Option<String> = row.get(3)?;
    let created_str: String = row.get(6)?;

    Ok(SessionRecord {
        id: parse_uuid_fallback(&id_str),
        task_name: row.get(1)?,
        start_time: parse_datetime_fallback(&start_str),
        end_time: end_str.as_deref().map(parse_datetime_fallback),
        focus_duration: row.get(4)?,
        break_duration: row.get(5)?,
        created_at: parse_datetime_fallback(&created_str),
        break_events: Vec::new(),
    })
}

fn row_to_break(row: &rusqlite::Row) -> Result<BreakRecord, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let session_str: String = row.get(1)?;
    let kind_str: String = row.get(2)?;
    let start_str: String = row.get(3)?;
    let end_str: Option<String> = row.get(4)?;

    Ok(BreakRecord {
        id: parse_uuid_fallback(&id_str),
        session_id: parse_uuid_fallback(&session_str),
        kind: BreakKind::parse(&kind_str),
        start_time: parse_datetime_fallback(&start_str),
        end_time: end_str.as_deref().map(parse_datetime_fallback),
        duration: row.get(5)?,
    })
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/workpulse.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = super::data_dir()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?
            .join("workpulse.db");
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database (tests, dry runs).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        // Cascade deletes rely on foreign keys being enforced.
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn breaks_for(&self, session_id: Uuid) -> Result<Vec<BreakRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, kind, start_time, end_time, duration
             FROM break_events
             WHERE session_id = ?1
             ORDER BY start_time ASC",
        )?;
        let rows = stmt.query_map(params![session_id.to_string()], row_to_break)?;
        rows.collect()
    }

    fn sessions_where(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, row_to_session)?;
        let mut sessions: Vec<SessionRecord> = rows.collect::<Result<_, _>>()?;
        for session in &mut sessions {
            session.break_events = self.breaks_for(session.id)?;
        }
        Ok(sessions)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl RecordStore for Database {
    fn save_session(&self, session: &SessionRecord) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO work_sessions
                 (id, task_name, start_time, end_time, focus_duration, break_duration, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.id.to_string(),
                session.task_name,
                session.start_time.to_rfc3339(),
                session.end_time.map(|t| t.to_rfc3339()),
                session.focus_duration,
                session.break_duration,
                session.created_at.to_rfc3339(),
            ],
        )?;
        // Re-saving replaces the owned break set wholesale.
        tx.execute(
            "DELETE FROM break_events WHERE session_id = ?1",
            params![session.id.to_string()],
        )?;
        for brk in &session.break_events {
            tx.execute(
                "INSERT INTO break_events (id, session_id, kind, start_time, end_time, duration)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    brk.id.to_string(),
                    session.id.to_string(),
                    brk.kind.as_str(),
                    brk.start_time.to_rfc3339(),
                    brk.end_time.map(|t| t.to_rfc3339()),
                    brk.duration,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn sessions_desc(&self) -> Result<Vec<SessionRecord>, DatabaseError> {
        self.sessions_where(
            "SELECT id, task_name, start_time, end_time, focus_duration, break_duration, created_at
             FROM work_sessions
             ORDER BY start_time DESC",
            &[],
        )
    }

    fn sessions_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        self.sessions_where(
            "SELECT id, task_name, start_time, end_time, focus_duration, break_duration, created_at
             FROM work_sessions
             WHERE start_time >= ?1 AND start_time < ?2
             ORDER BY start_time DESC",
            &[&start.to_rfc3339(), &end.to_rfc3339()],
        )
    }

    fn delete_session(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.conn.execute(
            "DELETE FROM work_sessions WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    fn delete_break_event(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.conn.execute(
            "DELETE FROM break_events WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    fn delete_all(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "DELETE FROM break_events;
             DELETE FROM work_sessions;
             DELETE FROM kv;",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn finished_session(task: &str, start: DateTime<Utc>, focus: u64) -> SessionRecord {
        let mut s = SessionRecord::begin(task, start);
        s.end_time = Some(start + Duration::seconds(focus as i64));
        s.focus_duration = focus;
        s
    }

    #[test]
    fn save_and_fetch_roundtrip() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();

        let mut session = finished_session("deep work", now, 1500);
        let mut brk = BreakRecord::begin(session.id, BreakKind::Meal, now + Duration::seconds(600));
        brk.end_time = Some(now + Duration::seconds(900));
        brk.duration = 300;
        session.break_duration = 300;
        session.break_events.push(brk);

        db.save_session(&session).unwrap();

        let fetched = db.sessions_desc().unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].task_name, "deep work");
        assert_eq!(fetched[0].focus_duration, 1500);
        assert_eq!(fetched[0].break_events.len(), 1);
        assert_eq!(fetched[0].break_events[0].kind, BreakKind::Meal);
        assert_eq!(fetched[0].break_events[0].duration, 300);
    }

    #[test]
    fn sessions_desc_orders_by_start_time() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        db.save_session(&finished_session("older", now - Duration::hours(2), 100))
            .unwrap();
        db.save_session(&finished_session("newer", now, 200))
            .unwrap();

        let fetched = db.sessions_desc().unwrap();
        assert_eq!(fetched[0].task_name, "newer");
        assert_eq!(fetched[1].task_name, "older");
    }

    #[test]
    fn range_query_is_half_open() {
        let db = Database::open_memory().unwrap();
        let base = Utc::now();
        db.save_session(&finished_session("inside", base, 10)).unwrap();
        db.save_session(&finished_session("at end", base + Duration::days(1), 20))
            .unwrap();
        db.save_session(&finished_session("before", base - Duration::seconds(1), 30))
            .unwrap();

        let hits = db
            .sessions_started_between(base, base + Duration::days(1))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].task_name, "inside");
    }

    #[test]
    fn deleting_session_cascades_to_breaks() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let mut session = finished_session("cascade", now, 60);
        session
            .break_events
            .push(BreakRecord::begin(session.id, BreakKind::Rest, now));
        db.save_session(&session).unwrap();

        db.delete_session(session.id).unwrap();

        assert!(db.sessions_desc().unwrap().is_empty());
        let orphan_count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM break_events", [], |r| r.get(0))
            .unwrap();
        assert_eq!(orphan_count, 0);
    }

    #[test]
    fn deleting_break_event_keeps_session() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let mut session = finished_session("keep", now, 60);
        let brk = BreakRecord::begin(session.id, BreakKind::Toilet, now);
        let brk_id = brk.id;
        session.break_events.push(brk);
        db.save_session(&session).unwrap();

        db.delete_break_event(brk_id).unwrap();

        let fetched = db.sessions_desc().unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(fetched[0].break_events.is_empty());
    }

    #[test]
    fn delete_all_wipes_every_table() {
        let db = Database::open_memory().unwrap();
        db.save_session(&finished_session("gone", Utc::now(), 5))
            .unwrap();
        db.kv_set("machine", "{}").unwrap();

        db.delete_all().unwrap();

        assert!(db.sessions_desc().unwrap().is_empty());
        assert!(db.kv_get("machine").unwrap().is_none());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }
}
