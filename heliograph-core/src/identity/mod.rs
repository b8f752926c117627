//! Identity enrichment
//!
//! Builds the common property/metric set attached to every telemetry event:
//! host version facts, session dates derived from the durable store, and the
//! platform identity values a registry may provide.
//!
//! The synchronous facts are ready before [`Enricher::initialize`] returns.
//! Platform identity lookups finish on a background task, so events logged
//! before a lookup resolves simply lack that property. Best effort is the
//! contract here.

pub mod source;

pub use source::{platform_identity_source, IdentityField, IdentitySource, NullIdentitySource};

use crate::store::{keys, SessionStore};
use crate::types::HostInfo;
use chrono::Utc;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::runtime::Handle;

/// Properties and metrics merged into every outgoing event.
///
/// Built once at appender construction. Updates only ever add absent keys,
/// never replace existing ones, so a pending identity lookup can land while
/// `log` calls read concurrently and no published value changes under them.
#[derive(Debug, Default)]
pub struct CommonData {
    properties: RwLock<BTreeMap<String, String>>,
    metrics: RwLock<BTreeMap<String, f64>>,
}

impl CommonData {
    /// Add a property unless the key is already present.
    /// Returns whether the value was inserted.
    pub fn insert_missing_property(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> bool {
        let mut properties = self.properties.write().unwrap();
        match properties.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Add a metric unless the key is already present.
    /// Returns whether the value was inserted.
    pub fn insert_missing_metric(&self, key: impl Into<String>, value: f64) -> bool {
        let mut metrics = self.metrics.write().unwrap();
        match metrics.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Snapshot of the current properties.
    pub fn properties(&self) -> BTreeMap<String, String> {
        self.properties.read().unwrap().clone()
    }

    /// Snapshot of the current metrics.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        self.metrics.read().unwrap().clone()
    }
}

/// Derives the common data set and keeps session bookkeeping in the store.
pub struct Enricher {
    store: Arc<dyn SessionStore>,
    source: Arc<dyn IdentitySource>,
    revalidate: bool,
}

impl Enricher {
    /// Enricher with the platform identity source and no revalidation.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            source: platform_identity_source(),
            revalidate: false,
        }
    }

    /// Replace the identity source (for tests and embedders).
    pub fn with_source(mut self, source: Arc<dyn IdentitySource>) -> Self {
        self.source = source;
        self
    }

    /// Re-issue identity lookups even for fields with a cached value.
    /// A fresh value refreshes the store only; the published property keeps
    /// the cached value for the rest of the process lifetime.
    pub fn with_revalidation(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }

    /// Build the common data set.
    ///
    /// Runs once per process lifetime; a second run against the same store
    /// would count this process as a past session. Store failures degrade to
    /// absent values and a warning, never an error.
    pub fn initialize(self, host: &HostInfo) -> Arc<CommonData> {
        let common = Arc::new(CommonData::default());

        if let Some(version) = &host.app_version {
            common.insert_missing_property("version.app", version);
        }
        if let Some(version) = &host.runtime_version {
            common.insert_missing_property("version.runtime", version);
        }
        if let Some(release) = &host.os_release {
            common.insert_missing_property("osVersion", release);
        }

        self.session_bookkeeping(&common);
        self.start_identity_lookups(&common);

        common
    }

    fn session_bookkeeping(&self, common: &CommonData) {
        let now = Utc::now().to_rfc3339();

        let first_session = match self.read(keys::FIRST_SESSION_DATE) {
            Some(date) => date,
            None => {
                self.write(keys::FIRST_SESSION_DATE, &now);
                now.clone()
            }
        };
        common.insert_missing_property("firstSessionDate", first_session);

        // Read the previous session date before overwriting it below, or the
        // new-session signal is lost.
        match self.read(keys::LAST_SESSION_DATE) {
            Some(last_session) => {
                common.insert_missing_metric("isNewSession", 0.0);
                common.insert_missing_property("lastSessionDate", last_session);
            }
            None => {
                common.insert_missing_metric("isNewSession", 1.0);
            }
        }
        self.write(keys::LAST_SESSION_DATE, &now);
    }

    fn start_identity_lookups(&self, common: &Arc<CommonData>) {
        let mut pending = Vec::new();
        for field in [IdentityField::UserId, IdentityField::MachineId] {
            match self.read(field.store_key()) {
                Some(cached) => {
                    common.insert_missing_property(field.property_name(), cached);
                    if self.revalidate {
                        pending.push(field);
                    }
                }
                None => pending.push(field),
            }
        }
        if pending.is_empty() {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            tracing::debug!("no async runtime; platform identity lookups skipped");
            return;
        };

        let store = Arc::clone(&self.store);
        let source = Arc::clone(&self.source);
        let common = Arc::clone(common);
        handle.spawn(async move {
            resolve_identity_fields(store, source, common, pending).await;
        });
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "session store read failed");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.store.store(key, value) {
            tracing::warn!(key, error = %err, "session store write failed");
        }
    }
}

/// Resolve identity fields against the source, publishing what it yields and
/// caching it in the store for future sessions.
pub(crate) async fn resolve_identity_fields(
    store: Arc<dyn SessionStore>,
    source: Arc<dyn IdentitySource>,
    common: Arc<CommonData>,
    fields: Vec<IdentityField>,
) {
    for field in fields {
        let Some(value) = source.lookup(field).await else {
            tracing::debug!(?field, "identity lookup yielded no value");
            continue;
        };

        // A value published from the cache earlier stays in place; the fresh
        // value still lands in the store for the next session.
        common.insert_missing_property(field.property_name(), value.clone());
        if let Err(err) = store.store(field.store_key(), &value) {
            tracing::warn!(?field, error = %err, "failed to cache identity value");
        }
    }
}
