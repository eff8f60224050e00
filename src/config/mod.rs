use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::constants::*;
use crate::host::local::HostDelays;

/// Application configuration with sensible defaults.
///
/// Can be overridden via ~/.config/foxia-fleet/config.toml
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one `<uuid>/metadata.json` per profile
    pub profiles_dir: PathBuf,
    /// Metrics polling interval while anything runs (milliseconds)
    pub poll_interval_ms: u64,
    /// Row height assumed before a row is laid out (lines)
    pub row_height_estimate: u32,
    /// Extra rows rendered past each viewport edge
    pub overscan_rows: usize,
    /// Theme name (built-in)
    pub theme: String,
    /// SQLite file for sort / partition preferences
    pub preferences_path: PathBuf,
    /// Local host simulation settings
    pub host: HostConfig,
}

/// Latency and lock settings of the local host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub launch_delay_ms: u64,
    pub stop_delay_ms: u64,
    pub upload_delay_ms: u64,
    /// Browser kinds with an update in progress; their profiles cannot launch.
    pub updating: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            launch_delay_ms: DEFAULT_LAUNCH_DELAY_MS,
            stop_delay_ms: DEFAULT_STOP_DELAY_MS,
            upload_delay_ms: DEFAULT_UPLOAD_DELAY_MS,
            updating: Vec::new(),
        }
    }
}

impl HostConfig {
    pub fn delays(&self) -> HostDelays {
        HostDelays {
            launch: Duration::from_millis(self.launch_delay_ms),
            stop: Duration::from_millis(self.stop_delay_ms),
            upload: Duration::from_millis(self.upload_delay_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles_dir: default_profiles_dir(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            row_height_estimate: DEFAULT_ROW_HEIGHT_ESTIMATE,
            overscan_rows: DEFAULT_OVERSCAN_ROWS,
            theme: "default".to_string(),
            preferences_path: default_preferences_path(),
            host: HostConfig::default(),
        }
    }
}

/// TOML-deserializable config file format.
/// All fields are optional — missing fields use defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    profiles_dir: Option<String>,
    poll_interval_ms: Option<u64>,
    row_height_estimate: Option<u32>,
    overscan_rows: Option<usize>,
    theme: Option<String>,
    preferences_path: Option<String>,
    host: Option<FileHostConfig>,
}

/// TOML-deserializable host config section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileHostConfig {
    launch_delay_ms: Option<u64>,
    stop_delay_ms: Option<u64>,
    upload_delay_ms: Option<u64>,
    updating: Option<Vec<String>>,
}

impl Config {
    /// Load config from ~/.config/foxia-fleet/config.toml, falling back to
    /// defaults for any missing fields. If the file doesn't exist, returns
    /// pure defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Config::default(), // No config file — use defaults
        };
        match Self::from_toml(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                Config::default()
            }
        }
    }

    /// Merge a TOML document over the defaults.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file_config: FileConfig = toml::from_str(content)?;
        let mut config = Config::default();

        if let Some(v) = file_config.profiles_dir {
            if !v.is_empty() {
                config.profiles_dir = expand_home(&v);
            }
        }
        if let Some(v) = file_config.poll_interval_ms {
            config.poll_interval_ms = v.max(MIN_POLL_INTERVAL_MS);
        }
        if let Some(v) = file_config.row_height_estimate {
            config.row_height_estimate = v.clamp(1, 4);
        }
        if let Some(v) = file_config.overscan_rows {
            config.overscan_rows = v.min(50);
        }
        if let Some(v) = file_config.theme {
            if !v.is_empty() {
                config.theme = v;
            }
        }
        if let Some(v) = file_config.preferences_path {
            if !v.is_empty() {
                config.preferences_path = expand_home(&v);
            }
        }

        // Merge host config
        if let Some(h) = file_config.host {
            if let Some(v) = h.launch_delay_ms {
                config.host.launch_delay_ms = v.min(60_000);
            }
            if let Some(v) = h.stop_delay_ms {
                config.host.stop_delay_ms = v.min(60_000);
            }
            if let Some(v) = h.upload_delay_ms {
                config.host.upload_delay_ms = v.min(60_000);
            }
            if let Some(v) = h.updating {
                config.host.updating = v.into_iter().filter(|b| !b.is_empty()).collect();
            }
        }

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.row_height_estimate, DEFAULT_ROW_HEIGHT_ESTIMATE);
        assert_eq!(config.theme, "default");
        assert!(config.host.updating.is_empty());
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let config = Config::from_toml(
            r#"
            theme = "nord"
            profiles_dir = "/srv/profiles"

            [host]
            launch_delay_ms = 10
            updating = ["wayfern", ""]
            "#,
        )
        .unwrap();
        assert_eq!(config.theme, "nord");
        assert_eq!(config.profiles_dir, PathBuf::from("/srv/profiles"));
        assert_eq!(config.host.launch_delay_ms, 10);
        assert_eq!(config.host.stop_delay_ms, DEFAULT_STOP_DELAY_MS);
        assert_eq!(config.host.updating, vec!["wayfern".to_string()]);
        assert_eq!(config.overscan_rows, DEFAULT_OVERSCAN_ROWS);
    }

    #[test]
    fn values_are_clamped() {
        let config = Config::from_toml(
            "poll_interval_ms = 10\nrow_height_estimate = 0\noverscan_rows = 1000",
        )
        .unwrap();
        assert_eq!(config.poll_interval_ms, MIN_POLL_INTERVAL_MS);
        assert_eq!(config.row_height_estimate, 1);
        assert_eq!(config.overscan_rows, 50);
    }

    #[test]
    fn home_is_expanded() {
        let config = Config::from_toml(r#"preferences_path = "~/prefs.db""#).unwrap();
        assert_eq!(config.preferences_path, home_dir().join("prefs.db"));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_ms = \"fast\"").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn missing_file_is_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/foxia-fleet.toml"));
        assert_eq!(config.theme, "default");
    }

    #[test]
    fn host_delays_from_config() {
        let mut host = HostConfig::default();
        host.launch_delay_ms = 5;
        assert_eq!(host.delays().launch, Duration::from_millis(5));
    }
}
