use std::io::Write;
use std::rc::Rc;

use chrono::Utc;
use clap::Subcommand;
use workpulse_core::{
    AudioPort, BreakKind, Config, Database, Event, MachineSnapshot, RecordStore, SecondClock,
    SessionMachine, SessionState, TimerSettings,
};

use crate::ports::{AmbientAudio, SharedAlert};

use super::fmt_hms;

pub(crate) const MACHINE_KEY: &str = "session_machine";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a new work session
    Start {
        /// Task name (defaults to a placeholder)
        task: Option<String>,
        /// Arm target mode with this many minutes
        #[arg(long)]
        target: Option<u32>,
    },
    /// Pause the working session
    Pause,
    /// Resume a paused session
    Resume,
    /// Stop and record the session
    Stop,
    /// Break control
    Break {
        #[command(subcommand)]
        action: BreakAction,
    },
    /// Print current session state
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Tick the session in the foreground at 1 Hz
    Run,
}

#[derive(Subcommand)]
pub enum BreakAction {
    /// Begin a break (kind: toilet, meal, rest)
    Start { kind: Option<String> },
    /// End the running break and return to work
    End,
}

/// Restore the persisted machine and deliver wall-clock catch-up ticks
/// for the time this process wasn't running. Target clamping therefore
/// holds even without a foreground tick loop.
fn load_machine(
    db: &Rc<Database>,
    cfg: &Config,
    alert: SharedAlert,
) -> Result<(SessionMachine, Option<Event>), Box<dyn std::error::Error>> {
    let mut audio = AmbientAudio::new(cfg.audio.enabled);
    audio.set_volume(cfg.audio.volume as f32 / 100.0);

    let store = Rc::clone(db) as Rc<dyn RecordStore>;
    if let Some(json) = db.kv_get(MACHINE_KEY)? {
        if let Ok(snapshot) = serde_json::from_str::<MachineSnapshot>(&json) {
            let behind = (Utc::now() - snapshot.saved_at).num_seconds().max(0) as u64;
            let mut machine =
                SessionMachine::restore(snapshot, store, Box::new(alert), Box::new(audio));
            let caught_up = machine.tick_n(behind);
            return Ok((machine, caught_up));
        }
        tracing::warn!("discarding unreadable machine snapshot");
    }

    let machine = SessionMachine::new(
        TimerSettings::from(&cfg.timer),
        store,
        Box::new(alert),
        Box::new(audio),
    );
    Ok((machine, None))
}

fn save_machine(db: &Database, machine: &SessionMachine) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(&machine.snapshot())?;
    db.kv_set(MACHINE_KEY, &json)?;
    Ok(())
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

fn print_status(machine: &SessionMachine, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        return print_event(&machine.status());
    }
    let state = match machine.state() {
        SessionState::Idle => "idle",
        SessionState::Working => "working",
        SessionState::Paused => "paused",
        SessionState::OnBreak => "on break",
    };
    println!("state:   {state}");
    if let Some(task) = machine.task_name() {
        println!("task:    {task}");
        println!("focus:   {}", fmt_hms(machine.focus_secs()));
        if machine.state() == SessionState::OnBreak {
            println!("break:   {}", fmt_hms(machine.current_break_secs()));
        }
        println!("breaks:  {}", fmt_hms(machine.total_break_secs()));
        if let Some(remaining) = machine.remaining_target_secs() {
            println!("target:  {} remaining", fmt_hms(remaining));
        }
    }
    println!("today:   {}", fmt_hms(machine.today_total_secs()));
    Ok(())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Rc::new(Database::open()?);
    let cfg = Config::load_or_default();
    let alert = SharedAlert::new(cfg.notifications.enabled && cfg.notifications.speech);

    let (mut machine, caught_up) = load_machine(&db, &cfg, alert.clone())?;
    if let Some(ev) = &caught_up {
        print_event(ev)?;
    }

    match action {
        SessionAction::Start { task, target } => {
            if machine.state() == SessionState::Idle {
                machine.configure_target(
                    target.unwrap_or(cfg.timer.target_focus_minutes),
                    target.is_some() || cfg.timer.target_mode_enabled,
                );
            }
            match machine.start(task.as_deref().unwrap_or("")) {
                Some(ev) => print_event(&ev)?,
                None => println!("a session is already running; stop it first"),
            }
        }
        SessionAction::Pause => match machine.pause() {
            Some(ev) => print_event(&ev)?,
            None => println!("nothing to pause"),
        },
        SessionAction::Resume => match machine.resume() {
            Some(ev) => print_event(&ev)?,
            None => println!("nothing to resume"),
        },
        SessionAction::Stop => match machine.stop() {
            Some(ev) => print_event(&ev)?,
            None => println!("no active session"),
        },
        SessionAction::Break { action } => match action {
            BreakAction::Start { kind } => {
                let kind = kind
                    .as_deref()
                    .map(BreakKind::parse)
                    .unwrap_or_else(|| cfg.default_break_kind());
                match machine.start_break(kind) {
                    Some(ev) => print_event(&ev)?,
                    None => println!("breaks can only start while working"),
                }
            }
            BreakAction::End => match machine.end_break() {
                Some(ev) => print_event(&ev)?,
                None => println!("no break is running"),
            },
        },
        SessionAction::Status { json } => print_status(&machine, json)?,
        SessionAction::Run => {
            run_foreground(&db, &mut machine, &alert)?;
        }
    }

    save_machine(&db, &machine)
}

/// Foreground 1 Hz loop: ticks the machine, fires due alerts, and keeps
/// the persisted snapshot fresh so a kill loses at most a second.
fn run_foreground(
    db: &Database,
    machine: &mut SessionMachine,
    alert: &SharedAlert,
) -> Result<(), Box<dyn std::error::Error>> {
    if !machine.clock_running() {
        println!("no ticking session; use `workpulse session start` first");
        return Ok(());
    }

    let mut clock = SecondClock::new();
    loop {
        std::thread::sleep(std::time::Duration::from_millis(250));

        let mut ticked = false;
        for _ in 0..clock.poll_seconds() {
            ticked = true;
            if let Some(ev) = machine.tick() {
                println!();
                print_event(&ev)?;
            }
        }
        alert.fire_due();

        if ticked {
            save_machine(db, machine)?;
            let line = match machine.state() {
                SessionState::OnBreak => format!(
                    "on break {}  (focus {})",
                    fmt_hms(machine.current_break_secs()),
                    fmt_hms(machine.focus_secs())
                ),
                _ => match machine.remaining_target_secs() {
                    Some(remaining) => format!(
                        "focus {}  target -{}",
                        fmt_hms(machine.focus_secs()),
                        fmt_hms(remaining)
                    ),
                    None => format!("focus {}", fmt_hms(machine.focus_secs())),
                },
            };
            print!("\r{line}    ");
            std::io::stdout().flush()?;
        }

        if !machine.clock_running() {
            // Target clamp auto-paused, or an external snapshot change.
            println!();
            break;
        }
    }
    Ok(())
}
