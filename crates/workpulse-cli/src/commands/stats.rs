use clap::Subcommand;
use workpulse_core::{Database, Stats, TodayAggregator};

use super::fmt_hms;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's accumulated focus time
    Today {
        #[arg(long)]
        json: bool,
    },
    /// All-time totals
    All {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Today { json } => {
            let mut agg = TodayAggregator::new();
            let total = agg.refresh(&db)?;
            if json {
                println!("{}", serde_json::json!({ "today_focus_secs": total }));
            } else {
                println!("today's focus: {}", fmt_hms(total));
            }
        }
        StatsAction::All { json } => {
            let stats = Stats::collect(&db)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("sessions:     {}", stats.total_sessions);
                println!("total focus:  {}", fmt_hms(stats.total_focus_secs));
                println!("total breaks: {}", fmt_hms(stats.total_break_secs));
                println!(
                    "today:        {} across {} session(s)",
                    fmt_hms(stats.today_focus_secs),
                    stats.today_sessions
                );
            }
        }
    }
    Ok(())
}
