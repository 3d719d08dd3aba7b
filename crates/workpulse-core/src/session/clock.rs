//! 1 Hz cooperative tick source.
//!
//! The machine itself has no internal threads -- the caller polls a
//! `SecondClock` and delivers one `tick()` per whole elapsed second. A
//! caller loop can therefore sleep at a coarse interval and still keep
//! elapsed-time accounting exact.

use std::time::Instant;

/// Wall-clock accumulator that yields whole elapsed seconds.
#[derive(Debug)]
pub struct SecondClock {
    last: Instant,
    /// Sub-second remainder carried between polls, in milliseconds.
    carry_ms: u128,
}

impl SecondClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            carry_ms: 0,
        }
    }

    /// Number of whole seconds elapsed since the previous poll, with the
    /// sub-second remainder carried forward so no time is lost.
    pub fn poll_seconds(&mut self) -> u64 {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last).as_millis() + self.carry_ms;
        self.last = now;
        self.carry_ms = elapsed_ms % 1000;
        (elapsed_ms / 1000) as u64
    }

    /// Forget accumulated time, e.g. after the caller was deliberately
    /// not ticking (paused, idle).
    pub fn rearm(&mut self) {
        self.last = Instant::now();
        self.carry_ms = 0;
    }
}

impl Default for SecondClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fresh_clock_yields_nothing() {
        let mut clock = SecondClock::new();
        assert_eq!(clock.poll_seconds(), 0);
    }

    #[test]
    fn sub_second_remainder_is_carried() {
        let mut clock = SecondClock::new();
        // Simulate 1.5s having passed by backdating the anchor.
        clock.last = Instant::now() - Duration::from_millis(1500);
        assert_eq!(clock.poll_seconds(), 1);
        // The 500ms remainder stays banked.
        assert!(clock.carry_ms >= 500);
    }

    #[test]
    fn rearm_discards_elapsed_time() {
        let mut clock = SecondClock::new();
        clock.last = Instant::now() - Duration::from_secs(5);
        clock.rearm();
        assert_eq!(clock.poll_seconds(), 0);
    }
}
