//! Terminal implementations of the core's alerting and audio ports.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use workpulse_core::{AlertPort, AudioPort};

struct PendingAlert {
    fire_at: DateTime<Utc>,
    title: String,
    body: String,
}

/// Alert sink for a terminal session.
///
/// Scheduled alerts are best-effort: they live in this process and are
/// checked by the foreground loop (`session run`). The machine's
/// tick-driven target enforcement stays the authoritative path; one-shot
/// commands simply let pending alerts die with the process.
pub struct TerminalAlert {
    pending: Vec<PendingAlert>,
    speech_enabled: bool,
}

impl TerminalAlert {
    pub fn new(speech_enabled: bool) -> Self {
        Self {
            pending: Vec::new(),
            speech_enabled,
        }
    }

    /// Print and discard every alert whose deadline has passed.
    /// Returns how many fired.
    pub fn fire_due(&mut self) -> usize {
        let now = Utc::now();
        let (due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|a| a.fire_at <= now);
        self.pending = rest;
        for alert in &due {
            println!("\x07[alert] {}: {}", alert.title, alert.body);
        }
        due.len()
    }
}

impl AlertPort for TerminalAlert {
    fn schedule_alert(&mut self, after_secs: u64, title: &str, body: &str) {
        if after_secs == 0 {
            return;
        }
        self.pending.push(PendingAlert {
            fire_at: Utc::now() + Duration::seconds(after_secs as i64),
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn cancel_all_pending(&mut self) {
        self.pending.clear();
    }

    fn speak(&mut self, text: &str) {
        if self.speech_enabled {
            println!("[voice] {text}");
        }
    }

    fn play_tone(&mut self) {
        print!("\x07");
        let _ = std::io::stdout().flush();
    }
}

/// Shared handle so the CLI can keep checking due alerts while the
/// machine owns its boxed port.
#[derive(Clone)]
pub struct SharedAlert(Rc<RefCell<TerminalAlert>>);

impl SharedAlert {
    pub fn new(speech_enabled: bool) -> Self {
        Self(Rc::new(RefCell::new(TerminalAlert::new(speech_enabled))))
    }

    pub fn fire_due(&self) -> usize {
        self.0.borrow_mut().fire_due()
    }
}

impl AlertPort for SharedAlert {
    fn schedule_alert(&mut self, after_secs: u64, title: &str, body: &str) {
        self.0.borrow_mut().schedule_alert(after_secs, title, body);
    }
    fn cancel_all_pending(&mut self) {
        self.0.borrow_mut().cancel_all_pending();
    }
    fn speak(&mut self, text: &str) {
        self.0.borrow_mut().speak(text);
    }
    fn play_tone(&mut self) {
        self.0.borrow_mut().play_tone();
    }
}

/// Ambient-audio control. No audio asset ships with the CLI, so playback
/// degrades to a logged no-op; the machine's play/pause commands are
/// still tracked so `toggle` behaves sensibly.
pub struct AmbientAudio {
    enabled: bool,
    playing: bool,
    volume: f32,
    warned: bool,
}

impl AmbientAudio {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            playing: false,
            volume: 0.5,
            warned: false,
        }
    }

    fn warn_once(&mut self) {
        if !self.warned {
            tracing::warn!("no ambient audio asset is bundled; playback is a no-op");
            self.warned = true;
        }
    }
}

impl AudioPort for AmbientAudio {
    fn play(&mut self) {
        if !self.enabled {
            return;
        }
        self.warn_once();
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_schedule_is_a_no_op() {
        let mut alert = TerminalAlert::new(false);
        alert.schedule_alert(0, "t", "b");
        assert_eq!(alert.pending.len(), 0);
        alert.schedule_alert(10, "t", "b");
        assert_eq!(alert.pending.len(), 1);
    }

    #[test]
    fn cancel_clears_everything() {
        let mut alert = TerminalAlert::new(false);
        alert.schedule_alert(5, "a", "b");
        alert.schedule_alert(9, "c", "d");
        alert.cancel_all_pending();
        assert_eq!(alert.fire_due(), 0);
    }

    #[test]
    fn due_alerts_fire_at_most_once() {
        let mut alert = TerminalAlert::new(false);
        alert.schedule_alert(1, "soon", "body");
        // Backdate the deadline instead of sleeping.
        alert.pending[0].fire_at = Utc::now() - Duration::seconds(1);
        assert_eq!(alert.fire_due(), 1);
        assert_eq!(alert.fire_due(), 0);
    }

    #[test]
    fn audio_toggle_tracks_state() {
        let mut audio = AmbientAudio::new(true);
        audio.toggle();
        assert!(audio.playing);
        audio.toggle();
        assert!(!audio.playing);

        let mut disabled = AmbientAudio::new(false);
        disabled.play();
        assert!(!disabled.playing);
    }
}
