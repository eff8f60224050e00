//! Preference store backed by SQLite.
//!
//! Holds the fleet view's settings that outlive a session: the active sort
//! and the active partition. Values are JSON strings in a key/value table.
//! Anything missing or unreadable loads as the default.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::fleet::{Partition, SortSpec};

const SORT_KEY: &str = "fleet.sort";
const PARTITION_KEY: &str = "fleet.partition";

pub struct Preferences {
    conn: Connection,
}

impl Preferences {
    /// Open (or create) the preference database.
    ///
    /// If `path` is `None`, uses an in-memory database (useful for tests).
    pub fn open(path: Option<&Path>) -> SqlResult<Self> {
        let conn = match path {
            Some(p) => {
                if let Some(parent) = p.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                Connection::open(p)?
            }
            None => Connection::open_in_memory()?,
        };
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> SqlResult<()> {
        self.conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        self.conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS preferences (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                updated_at  INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }

    // ── Raw access ────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> SqlResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn set(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now_epoch_ms()],
        )?;
        Ok(())
    }

    fn load_json<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key, error = %e, "preference read failed, using default");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, "malformed preference, using default");
            T::default()
        })
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> SqlResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.set(key, &json)
    }

    // ── Fleet view ────────────────────────────────────────────────

    pub fn load_sort(&self) -> SortSpec {
        self.load_json(SORT_KEY)
    }

    pub fn save_sort(&self, spec: SortSpec) -> SqlResult<()> {
        self.save_json(SORT_KEY, &spec)
    }

    pub fn load_partition(&self) -> Partition {
        self.load_json(PARTITION_KEY)
    }

    pub fn save_partition(&self, partition: Partition) -> SqlResult<()> {
        self.save_json(PARTITION_KEY, &partition)
    }
}

/// Current time as Unix epoch milliseconds.
fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

// ── Tests ─────────────────────────────────────────────────────────
