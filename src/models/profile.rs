use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a managed browser profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<uuid::Uuid> for ProfileId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id.to_string())
    }
}

/// One managed browser profile as supplied by the registry.
/// Immutable per render: the fleet core only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: ProfileId,
    pub name: String,
    /// Browser engine kind ("camoufox", "wayfern", ...). Host-wide update
    /// locks are keyed by this value.
    pub browser: String,
    pub version: String,
    /// Creation time in epoch seconds (0 when unknown).
    pub created_at: u64,
    /// Identifier in the remote profile directory, if the profile is linked.
    pub remote_id: Option<String>,
    pub group_id: Option<String>,
    pub tags: Vec<String>,
    pub note: Option<String>,
    pub proxy_id: Option<String>,
    pub sync_enabled: bool,
}

impl ProfileRecord {
    /// Minimal record; the remaining fields take their empty values.
    pub fn new(id: impl Into<ProfileId>, name: &str, browser: &str, created_at: u64) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            browser: browser.to_string(),
            version: String::new(),
            created_at,
            remote_id: None,
            group_id: None,
            tags: Vec::new(),
            note: None,
            proxy_id: None,
            sync_enabled: false,
        }
    }

    /// Whether the profile has a link into the remote directory.
    /// A blank identifier counts as no link.
    pub fn is_linked(&self) -> bool {
        self.remote_id
            .as_deref()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false)
    }

    /// Human-readable creation time, or "-" when unknown.
    pub fn created_display(&self) -> String {
        if self.created_at == 0 {
            return "-".to_string();
        }
        chrono::DateTime::from_timestamp(self.created_at as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

impl From<String> for ProfileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Formats bytes into human-readable string (KiB, MiB, GiB)
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}
