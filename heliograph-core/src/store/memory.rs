//! In-memory session store
//!
//! Nothing survives the process; useful for tests and embedders that opt out
//! of durable session tracking.

use super::SessionStore;
use crate::error::Result;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Session store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
