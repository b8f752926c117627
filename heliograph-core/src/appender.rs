//! Telemetry appender
//!
//! The single entry point host applications log through. Construction wires
//! up enrichment and one backend client per configured key; `log` merges the
//! common data set into the caller's payload and fans the event out to every
//! client. Nothing in here raises back to the caller once construction
//! succeeds.

use std::sync::Arc;

use crate::client::{HttpClient, TelemetryClient};
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::identity::{CommonData, Enricher, IdentitySource};
use crate::store::SessionStore;
use crate::types::{EventData, HostInfo, TelemetryValue};

/// Namespace backend clients prepend to every event name.
pub const EVENT_NAME_PREFIX: &str = "heliograph";

/// Enriches telemetry events and fans them out to the configured backends.
///
/// Built once at service start. `dispose` (or dropping the appender) shuts
/// the clients down; afterwards `log` quietly drops events instead of
/// erroring.
pub struct TelemetryAppender {
    clients: Vec<Box<dyn TelemetryClient>>,
    common: Arc<CommonData>,
}

impl TelemetryAppender {
    /// Build an appender from configuration.
    ///
    /// One [`HttpClient`] per non-empty backend key; zero keys is valid and
    /// yields an appender that enriches but delivers nothing. Requires a
    /// Tokio runtime when any backend key is configured.
    pub fn new(
        store: Arc<dyn SessionStore>,
        config: &TelemetryConfig,
        host: HostInfo,
    ) -> Result<Self> {
        config.validate()?;

        let mut clients: Vec<Box<dyn TelemetryClient>> = Vec::new();
        for key in config.backend_keys() {
            clients.push(Box::new(HttpClient::new(EVENT_NAME_PREFIX, key, config)?));
        }

        let enricher = Enricher::new(store).with_revalidation(config.revalidate_identity);
        let common = enricher.initialize(&host);

        Ok(Self { clients, common })
    }

    /// Build an appender around pre-built clients.
    ///
    /// For tests and embedders with custom sinks. Enrichment still runs
    /// against the given store.
    pub fn with_clients(
        store: Arc<dyn SessionStore>,
        clients: Vec<Box<dyn TelemetryClient>>,
        host: HostInfo,
    ) -> Self {
        let common = Enricher::new(store).initialize(&host);
        Self { clients, common }
    }

    /// Like [`with_clients`](Self::with_clients), with an explicit identity
    /// source instead of the platform one.
    pub fn with_clients_and_source(
        store: Arc<dyn SessionStore>,
        clients: Vec<Box<dyn TelemetryClient>>,
        source: Arc<dyn IdentitySource>,
        host: HostInfo,
    ) -> Self {
        let common = Enricher::new(store).with_source(source).initialize(&host);
        Self { clients, common }
    }

    /// Log an event without a payload.
    pub fn log(&self, event_name: &str) {
        self.log_with(event_name, EventData::new());
    }

    /// Log an event, merging the common data set into `data` and forwarding
    /// the result to every live client.
    ///
    /// Never fails and never blocks: delivery trouble stays inside the
    /// clients, and a disposed appender simply drops the event.
    pub fn log_with(&self, event_name: &str, mut data: EventData) {
        for (key, value) in self.common.metrics() {
            data.insert(format!("common.{}", key), TelemetryValue::Number(value));
        }
        for (key, value) in self.common.properties() {
            data.insert(format!("common.{}", key), TelemetryValue::Text(value));
        }

        for client in &self.clients {
            client.log(event_name, &data);
        }
    }

    /// Dispose every owned client and drop the handles.
    ///
    /// Idempotent; each client is disposed exactly once no matter how often
    /// this is called.
    pub fn dispose(&mut self) {
        for client in self.clients.drain(..) {
            client.dispose();
        }
    }

    /// Number of live backend clients (zero once disposed).
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl Drop for TelemetryAppender {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Recorded copy of one forwarded event.
    struct RecordedEvent {
        name: String,
        data: EventData,
    }

    /// Test client that records events the way a backend adapter would see
    /// them, with the prefix applied.
    #[derive(Clone)]
    struct RecordingClient {
        prefix: String,
        events: Arc<Mutex<Vec<RecordedEvent>>>,
        dispose_calls: Arc<AtomicUsize>,
    }

    impl RecordingClient {
        fn new(prefix: &str) -> Self {
            Self {
                prefix: prefix.to_string(),
                events: Arc::new(Mutex::new(Vec::new())),
                dispose_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn events(&self) -> Vec<(String, EventData)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|event| (event.name.clone(), event.data.clone()))
                .collect()
        }

        fn dispose_calls(&self) -> usize {
            self.dispose_calls.load(Ordering::SeqCst)
        }
    }

    impl TelemetryClient for RecordingClient {
        fn log(&self, event_name: &str, data: &EventData) {
            self.events.lock().unwrap().push(RecordedEvent {
                name: format!("{}/{}", self.prefix, event_name),
                data: data.clone(),
            });
        }

        fn dispose(&self) {
            self.dispose_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn appender_with(clients: Vec<RecordingClient>) -> TelemetryAppender {
        let store = Arc::new(MemoryStore::new());
        let boxed: Vec<Box<dyn TelemetryClient>> = clients
            .into_iter()
            .map(|client| Box::new(client) as Box<dyn TelemetryClient>)
            .collect();
        TelemetryAppender::with_clients(store, boxed, HostInfo::default())
    }

    #[test]
    fn test_simple_event() {
        let adapter = RecordingClient::new(EVENT_NAME_PREFIX);
        let appender = appender_with(vec![adapter.clone()]);

        appender.log("testEvent");

        let events = adapter.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "heliograph/testEvent");
    }

    #[test]
    fn test_event_with_data() {
        let adapter = RecordingClient::new(EVENT_NAME_PREFIX);
        let appender = appender_with(vec![adapter.clone()]);

        let mut data = EventData::new();
        data.insert("title".to_string(), "some title".into());
        data.insert("width".to_string(), 100i64.into());
        data.insert("height".to_string(), 200i64.into());
        appender.log_with("testEvent", data);

        let events = adapter.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "heliograph/testEvent");

        // Caller entries arrive verbatim.
        let payload = &events[0].1;
        assert_eq!(payload["title"].as_text(), Some("some title"));
        assert_eq!(payload["width"].as_number(), Some(100.0));
        assert_eq!(payload["height"].as_number(), Some(200.0));
    }

    #[test]
    fn test_two_backends_both_receive() {
        let primary = RecordingClient::new(EVENT_NAME_PREFIX);
        let alternate = RecordingClient::new(EVENT_NAME_PREFIX);
        let appender = appender_with(vec![primary.clone(), alternate.clone()]);

        appender.log("testEvent");

        assert_eq!(primary.events().len(), 1);
        assert_eq!(alternate.events().len(), 1);
        assert_eq!(primary.events()[0].0, alternate.events()[0].0);
    }

    #[test]
    fn test_common_data_merged_under_prefix() {
        let adapter = RecordingClient::new(EVENT_NAME_PREFIX);
        let appender = appender_with(vec![adapter.clone()]);

        appender.log("testEvent");

        let payload = &adapter.events()[0].1;
        // Fresh store, so this process counts as a new session.
        assert_eq!(payload["common.isNewSession"].as_number(), Some(1.0));
        assert!(payload.contains_key("common.firstSessionDate"));
        assert!(payload.keys().all(|key| key.starts_with("common.")));
    }

    #[test]
    fn test_no_backends_is_valid() {
        let mut appender = appender_with(vec![]);
        assert_eq!(appender.client_count(), 0);

        appender.log("testEvent");
        appender.dispose();
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let adapter = RecordingClient::new(EVENT_NAME_PREFIX);
        let mut appender = appender_with(vec![adapter.clone()]);

        appender.dispose();
        appender.dispose();

        assert_eq!(adapter.dispose_calls(), 1);
        assert_eq!(appender.client_count(), 0);
    }

    #[test]
    fn test_log_after_dispose_is_noop() {
        let adapter = RecordingClient::new(EVENT_NAME_PREFIX);
        let mut appender = appender_with(vec![adapter.clone()]);

        appender.log("before");
        appender.dispose();
        appender.log("after");

        let events = adapter.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "heliograph/before");
    }

    #[test]
    fn test_drop_disposes_clients() {
        let adapter = RecordingClient::new(EVENT_NAME_PREFIX);
        {
            let _appender = appender_with(vec![adapter.clone()]);
        }
        assert_eq!(adapter.dispose_calls(), 1);
    }

    #[test]
    fn test_new_without_backends_needs_no_runtime() {
        let store = Arc::new(MemoryStore::new());
        let config = TelemetryConfig::default();
        let appender = TelemetryAppender::new(store, &config, HostInfo::default()).unwrap();
        assert_eq!(appender.client_count(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let store = Arc::new(MemoryStore::new());
        let config = TelemetryConfig {
            primary_key: Some("hg_live_primary".to_string()),
            endpoint: None,
            ..Default::default()
        };
        assert!(TelemetryAppender::new(store, &config, HostInfo::default()).is_err());
    }

    #[tokio::test]
    async fn test_new_builds_one_client_per_key() {
        let store = Arc::new(MemoryStore::new());
        let config = TelemetryConfig {
            primary_key: Some("hg_live_primary".to_string()),
            alternate_key: Some("hg_live_alternate".to_string()),
            endpoint: Some("https://telemetry.example.com".to_string()),
            ..Default::default()
        };
        let appender = TelemetryAppender::new(store, &config, HostInfo::default()).unwrap();
        assert_eq!(appender.client_count(), 2);
    }

    #[test]
    fn test_host_facts_reach_the_payload() {
        let store = Arc::new(MemoryStore::new());
        let adapter = RecordingClient::new(EVENT_NAME_PREFIX);
        let host = HostInfo {
            app_version: Some("1.4.0".to_string()),
            runtime_version: None,
            os_release: Some("6.8.0".to_string()),
        };
        let appender = TelemetryAppender::with_clients(
            store,
            vec![Box::new(adapter.clone()) as Box<dyn TelemetryClient>],
            host,
        );

        appender.log("testEvent");

        let payload = &adapter.events()[0].1;
        assert_eq!(payload["common.version.app"].as_text(), Some("1.4.0"));
        assert_eq!(payload["common.osVersion"].as_text(), Some("6.8.0"));
        assert!(!payload.contains_key("common.version.runtime"));
    }
}
