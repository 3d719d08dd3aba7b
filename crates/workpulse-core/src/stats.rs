//! Today's-total aggregation and summary statistics.
//!
//! The today total is always recomputed from stored sessions rather than
//! incrementally accumulated, so it stays correct under external edits
//! and deletes.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DatabaseError;
use crate::storage::RecordStore;

/// The half-open local calendar day `[start_of_day, start_of_day + 1 day)`
/// containing `now`, expressed in UTC for range queries.
pub fn local_day_bounds(now: DateTime<Local>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_naive = now.date_naive().and_time(NaiveTime::MIN);
    let end_naive = start_naive + Duration::days(1);

    let resolve = |naive| match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        // Midnight skipped by a DST jump; fall back to the instant itself.
        LocalResult::None => now,
    };

    (
        resolve(start_naive).with_timezone(&Utc),
        resolve(end_naive).with_timezone(&Utc),
    )
}

/// Sums today's focus seconds over the record store.
///
/// Holds nothing besides the last computed total, cached for display.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct TodayAggregator {
    cached_secs: u64,
}

impl TodayAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last computed total, in seconds.
    pub fn total_secs(&self) -> u64 {
        self.cached_secs
    }

    /// Recompute from the store using the current local time.
    ///
    /// # Errors
    /// Returns an error if the range query fails; the cached total is left
    /// unchanged in that case.
    pub fn refresh(&mut self, store: &dyn RecordStore) -> Result<u64, DatabaseError> {
        self.refresh_at(store, Local::now())
    }

    /// Recompute for the local day containing `now`.
    pub fn refresh_at(
        &mut self,
        store: &dyn RecordStore,
        now: DateTime<Local>,
    ) -> Result<u64, DatabaseError> {
        let (start, end) = local_day_bounds(now);
        let sessions = store.sessions_started_between(start, end)?;
        self.cached_secs = sessions.iter().map(|s| s.focus_duration).sum();
        Ok(self.cached_secs)
    }
}

/// Aggregate counters over the whole store, plus today's slice.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_sessions: u64,
    pub total_focus_secs: u64,
    pub total_break_secs: u64,
    pub today_sessions: u64,
    pub today_focus_secs: u64,
}

impl Stats {
    /// Collect statistics from the store.
    ///
    /// # Errors
    /// Returns an error if the underlying queries fail.
    pub fn collect(store: &dyn RecordStore) -> Result<Self, DatabaseError> {
        Self::collect_at(store, Local::now())
    }

    pub fn collect_at(store: &dyn RecordStore, now: DateTime<Local>) -> Result<Self, DatabaseError> {
        let mut stats = Stats::default();
        for session in store.sessions_desc()? {
            stats.total_sessions += 1;
            stats.total_focus_secs += session.focus_duration;
            stats.total_break_secs += session.break_duration;
        }

        let (start, end) = local_day_bounds(now);
        for session in store.sessions_started_between(start, end)? {
            stats.today_sessions += 1;
            stats.today_focus_secs += session.focus_duration;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRecord;
    use crate::storage::Database;

    fn seeded(db: &Database, task: &str, start: DateTime<Utc>, focus: u64) {
        let mut s = SessionRecord::begin(task, start);
        s.end_time = Some(start);
        s.focus_duration = focus;
        db.save_session(&s).unwrap();
    }

    #[test]
    fn day_bounds_span_exactly_one_day() {
        let now = Local::now();
        let (start, end) = local_day_bounds(now);
        assert_eq!(end - start, Duration::days(1));
        assert!(start <= now.with_timezone(&Utc));
        assert!(now.with_timezone(&Utc) < end);
    }

    #[test]
    fn today_total_sums_only_today() {
        let db = Database::open_memory().unwrap();
        let now = Local::now();
        seeded(&db, "today a", now.with_timezone(&Utc), 600);
        seeded(&db, "today b", now.with_timezone(&Utc), 300);
        seeded(
            &db,
            "yesterday",
            now.with_timezone(&Utc) - Duration::days(1),
            9999,
        );

        let mut agg = TodayAggregator::new();
        assert_eq!(agg.refresh_at(&db, now).unwrap(), 900);
        assert_eq!(agg.total_secs(), 900);
    }

    #[test]
    fn today_total_is_zero_for_empty_store() {
        let db = Database::open_memory().unwrap();
        let mut agg = TodayAggregator::new();
        assert_eq!(agg.refresh(&db).unwrap(), 0);
    }

    #[test]
    fn repeated_refresh_is_pure() {
        let db = Database::open_memory().unwrap();
        let now = Local::now();
        seeded(&db, "stable", now.with_timezone(&Utc), 120);

        let mut agg = TodayAggregator::new();
        let first = agg.refresh_at(&db, now).unwrap();
        let second = agg.refresh_at(&db, now).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn stats_split_totals_and_today() {
        let db = Database::open_memory().unwrap();
        let now = Local::now();
        seeded(&db, "today", now.with_timezone(&Utc), 100);
        seeded(
            &db,
            "last week",
            now.with_timezone(&Utc) - Duration::days(7),
            500,
        );

        let stats = Stats::collect_at(&db, now).unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_focus_secs, 600);
        assert_eq!(stats.today_sessions, 1);
        assert_eq!(stats.today_focus_secs, 100);
    }
}
