//! Ports for timed alerts, speech, and ambient audio.
//!
//! The session machine never talks to the OS directly -- it issues
//! commands through these traits so it can be driven in tests without
//! real timers, audio output, or notification permissions. Scheduling is
//! fire-and-forget: the machine gets no delivery callback, and the
//! tick-driven target enforcement stays authoritative.

/// Scheduling and audible/spoken feedback.
pub trait AlertPort {
    /// Schedule a one-shot alert after `after_secs`. Implementations must
    /// treat `after_secs == 0` as a no-op and must fire at most once.
    /// Failures are logged by the implementation, never surfaced.
    fn schedule_alert(&mut self, after_secs: u64, title: &str, body: &str);

    /// Cancel every outstanding scheduled alert and silence any
    /// in-progress speech.
    fn cancel_all_pending(&mut self);

    fn speak(&mut self, text: &str);

    /// Play a short system tone.
    fn play_tone(&mut self);
}

/// Ambient-audio playback control. Pure pass-through from the machine's
/// perspective; a missing audio asset degrades to a logged no-op.
pub trait AudioPort {
    fn play(&mut self);
    fn pause(&mut self);

    fn toggle(&mut self) {
        // Implementations that track playback state override this.
    }

    /// Volume in 0.0..=1.0.
    fn set_volume(&mut self, _volume: f32) {}
}

/// No-op alert sink, for tests and status-only commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAlert;

impl AlertPort for NullAlert {
    fn schedule_alert(&mut self, _after_secs: u64, _title: &str, _body: &str) {}
    fn cancel_all_pending(&mut self) {}
    fn speak(&mut self, _text: &str) {}
    fn play_tone(&mut self) {}
}

/// No-op audio sink, for tests and status-only commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioPort for NullAudio {
    fn play(&mut self) {}
    fn pause(&mut self) {}
}
