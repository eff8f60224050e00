//! Application-wide constants.
//!
//! Centralizes timing, layout and path defaults so the fleet core and the
//! terminal UI agree on them.

use std::path::PathBuf;

// ── Timing ────────────────────────────────────────────────────────
/// Metrics polling interval while at least one profile is running (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
/// Lower bound for a configured polling interval (ms).
pub const MIN_POLL_INTERVAL_MS: u64 = 250;
/// Redraw tick for the terminal loop (ms).
pub const REDRAW_TICK_MS: u64 = 250;
/// Status message display duration (seconds).
pub const STATUS_MESSAGE_TIMEOUT_SECS: u64 = 5;
/// How long headless mode lets the fleet settle before printing (ms).
pub const HEADLESS_SETTLE_MS: u64 = 1500;
/// Simulated launch latency of the local host (ms).
pub const DEFAULT_LAUNCH_DELAY_MS: u64 = 1200;
/// Simulated stop latency of the local host (ms).
pub const DEFAULT_STOP_DELAY_MS: u64 = 600;
/// Simulated upload latency of the local host (ms).
pub const DEFAULT_UPLOAD_DELAY_MS: u64 = 2000;

// ── Capacities ────────────────────────────────────────────────────
/// Buffer of the local host's broadcast channels.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
/// Maximum toasts kept waiting for the status bar.
pub const MAX_PENDING_NOTICES: usize = 32;

// ── Virtualized list ──────────────────────────────────────────────
/// Estimated height of a row before it has been laid out (terminal lines).
pub const DEFAULT_ROW_HEIGHT_ESTIMATE: u32 = 2;
/// Rows rendered beyond each edge of the viewport.
pub const DEFAULT_OVERSCAN_ROWS: usize = 4;
/// Passes of measure-then-recompute before a frame is drawn.
pub const MAX_MEASURE_PASSES: usize = 3;

// ── UI Layout ─────────────────────────────────────────────────────
/// Page up/down step size (rows).
pub const PAGE_SIZE: usize = 20;
/// Mouse wheel step (lines).
pub const WHEEL_STEP: u32 = 3;
/// Detail popup max width.
pub const DETAIL_POPUP_WIDTH: u16 = 72;
/// Detail popup max height.
pub const DETAIL_POPUP_HEIGHT: u16 = 20;
/// Help overlay width.
pub const HELP_POPUP_WIDTH: u16 = 58;
/// Help overlay height.
pub const HELP_POPUP_HEIGHT: u16 = 30;

// ── Spinner Animation ─────────────────────────────────────────────
/// Spinner character sequence for transient phases.
pub const SPINNER_CHARS: &[&str] = &["◐", "◓", "◑", "◒"];

// ── Paths ─────────────────────────────────────────────────────────

/// Returns the user's home directory, falling back to /tmp.
pub fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Returns `~/.config/foxia-fleet/`.
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join("foxia-fleet")
}

/// Returns `~/.config/foxia-fleet/config.toml`.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Returns `~/.local/share/foxia-fleet/`.
pub fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("foxia-fleet")
}

/// Returns the directory holding one `<uuid>/metadata.json` per profile.
pub fn default_profiles_dir() -> PathBuf {
    home_dir()
        .join(".local")
        .join("share")
        .join("Foxia")
        .join("profiles")
}

/// Returns `~/.local/share/foxia-fleet/preferences.db`.
pub fn default_preferences_path() -> PathBuf {
    data_dir().join("preferences.db")
}

/// Returns `~/.local/share/foxia-fleet/logs/`.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}
