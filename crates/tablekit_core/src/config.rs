//! Runtime configuration for connections and table services.
//!
//! Both structs deserialize with `#[serde(default)]`, so a partial document
//! (or an empty `{}`) yields the built-in defaults for missing fields.

use serde::{Deserialize, Serialize};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PER_PAGE: u32 = 10;

/// Connection-level settings applied by `open_db` / `open_db_in_memory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Enables `PRAGMA foreign_keys`.
    pub foreign_keys: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

/// Per-service settings for `TableService`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Page size used by paginated reads.
    pub per_page: u32,
}

impl ServiceConfig {
    /// Returns the page size, never smaller than one.
    pub fn effective_per_page(&self) -> u32 {
        self.per_page.max(1)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
        }
    }
}
