mod clock;
mod machine;
mod record;

pub use clock::SecondClock;
pub use machine::{MachineSnapshot, SessionMachine, SessionState, TimerSettings};
pub use record::{BreakKind, BreakRecord, SessionRecord, UNTITLED_TASK};
