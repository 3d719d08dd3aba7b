use std::collections::BTreeMap;

use chrono::Local;
use clap::Subcommand;
use uuid::Uuid;
use workpulse_core::{Database, RecordStore, SessionRecord};

use super::fmt_hms;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recorded sessions, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Delete a session (cascades to its break events)
    Delete {
        id: String,
        /// Treat the id as a break event and delete only that
        #[arg(long)]
        break_event: bool,
    },
}

fn parse_id(s: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    Uuid::parse_str(s).map_err(|_| format!("'{s}' is not a valid id").into())
}

fn print_grouped(sessions: &[SessionRecord]) {
    if sessions.is_empty() {
        println!("no recorded sessions");
        return;
    }

    // Group by local date; BTreeMap in reverse gives newest day first.
    let mut by_day: BTreeMap<String, Vec<&SessionRecord>> = BTreeMap::new();
    for session in sessions {
        let day = session
            .start_time
            .with_timezone(&Local)
            .format("%Y/%m/%d")
            .to_string();
        by_day.entry(day).or_default().push(session);
    }

    for (day, day_sessions) in by_day.iter().rev() {
        println!("{day}");
        for session in day_sessions {
            let start = session.start_time.with_timezone(&Local).format("%H:%M");
            let end = session
                .end_time
                .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".into());
            println!(
                "  {}  {start}-{end}  focus {}  breaks {}  {}",
                session.id,
                fmt_hms(session.focus_duration),
                fmt_hms(session.break_duration),
                session.task_name,
            );
            for brk in &session.break_events {
                println!(
                    "      {}  {}  {}",
                    brk.id,
                    fmt_hms(brk.duration),
                    brk.kind.display_name(),
                );
            }
        }
    }
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { json } => {
            let sessions = db.sessions_desc()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else {
                print_grouped(&sessions);
            }
        }
        HistoryAction::Delete { id, break_event } => {
            let id = parse_id(&id)?;
            if break_event {
                db.delete_break_event(id)?;
                println!("break event deleted");
            } else {
                db.delete_session(id)?;
                println!("session deleted (break events removed with it)");
            }
        }
    }
    Ok(())
}
