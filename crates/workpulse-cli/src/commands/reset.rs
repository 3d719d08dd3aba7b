use std::rc::Rc;

use workpulse_core::{
    Database, NullAudio, RecordStore, SessionMachine, TimerSettings,
};

use crate::ports::SharedAlert;

/// Delete every stored record and force the machine back to idle.
///
/// Destructive by design: an in-flight session is discarded without being
/// persisted, matching the data-reset contract.
pub fn run(yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !yes {
        return Err("this deletes all recorded data; pass --yes to confirm".into());
    }

    let db = Rc::new(Database::open()?);
    db.delete_all()?;

    // Rebuild an idle machine and let it observe the reset so the saved
    // snapshot reflects zeroed counters and a recomputed (zero) today
    // total.
    let mut machine = SessionMachine::new(
        TimerSettings::default(),
        Rc::clone(&db) as Rc<dyn RecordStore>,
        Box::new(SharedAlert::new(false)),
        Box::new(NullAudio),
    );
    let event = machine.handle_data_reset();
    db.kv_set(
        super::session::MACHINE_KEY,
        &serde_json::to_string(&machine.snapshot())?,
    )?;

    println!("{}", serde_json::to_string_pretty(&event)?);
    println!("all data deleted");
    Ok(())
}
