//! Durable session store
//!
//! Holds the handful of values telemetry enrichment needs across process
//! restarts: session dates and cached platform identity. Backed by SQLite
//! in production and by an in-memory map in tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;

/// Store keys owned by telemetry enrichment.
///
/// No other subsystem may write under these keys; enrichment assumes it is
/// the only writer.
pub mod keys {
    /// Cached stable per-user platform identity.
    pub const SQM_USER_ID: &str = "telemetry.sqm.userId";
    /// Cached stable per-machine platform identity.
    pub const SQM_MACHINE_ID: &str = "telemetry.sqm.machineId";
    /// Timestamp of the most recent process start.
    pub const LAST_SESSION_DATE: &str = "telemetry.lastSessionDate";
    /// Timestamp of the very first process start. Written once.
    pub const FIRST_SESSION_DATE: &str = "telemetry.firstSessionDate";
}

/// Key/value store that survives process restarts.
///
/// Last write wins; no transactional guarantees are required. Implementations
/// must be safe to share across threads because identity lookups persist
/// values from a background task.
pub trait SessionStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn store(&self, key: &str, value: &str) -> Result<()>;
}
