pub mod config;
pub mod history;
pub mod reset;
pub mod session;
pub mod stats;

/// Format seconds as `HH:MM:SS`.
pub fn fmt_hms(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
