//! HTTP delivery to a telemetry collector
//!
//! Events queue on an in-process channel and a single worker task drains it,
//! so `log` stays fire-and-forget and per-client delivery order follows call
//! order. Delivery failures are logged and the event is dropped; telemetry
//! must never block or break the host application.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::config::TelemetryConfig;
use crate::error::{Error, Result};
use crate::types::EventData;

use super::TelemetryClient;

/// Event envelope for POST /events
///
/// This struct matches the schema expected by the collector's events API.
#[derive(Debug, Clone, Serialize)]
struct EventEnvelope {
    /// Fully prefixed event name
    name: String,
    /// When the event was logged by the host application
    occurred_at: DateTime<Utc>,
    /// Content-based hash for server-side deduplication
    event_hash: String,
    /// Merged payload (caller entries plus `common.*` entries)
    data: EventData,
}

impl EventEnvelope {
    fn new(prefix: &str, event_name: &str, data: EventData) -> Self {
        let name = format!("{}/{}", prefix, event_name);
        let occurred_at = Utc::now();
        let event_hash = compute_event_hash(&name, &occurred_at, &data);
        Self {
            name,
            occurred_at,
            event_hash,
            data,
        }
    }
}

/// Telemetry client delivering events to an HTTP collector endpoint
pub struct HttpClient {
    prefix: String,
    queue: Mutex<Option<UnboundedSender<EventEnvelope>>>,
}

impl HttpClient {
    /// Create a client for one backend route.
    ///
    /// `connection_key` authenticates against the collector; endpoint and
    /// timeout come from configuration. Must run inside a Tokio runtime
    /// because the delivery worker is spawned onto it.
    pub fn new(prefix: &str, connection_key: &str, config: &TelemetryConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::Config("telemetry.endpoint is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = format!("Bearer {}", connection_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| Error::Config(format!("invalid connection key: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Client(format!("failed to create HTTP client: {}", e)))?;

        let handle = Handle::try_current()
            .map_err(|_| Error::Client("HttpClient requires a Tokio runtime".to_string()))?;

        let (sender, mut receiver) = mpsc::unbounded_channel::<EventEnvelope>();
        let url = format!("{}/events", endpoint);

        handle.spawn(async move {
            while let Some(envelope) = receiver.recv().await {
                deliver(&http_client, &url, envelope).await;
            }
            tracing::debug!(url = %url, "telemetry delivery worker stopped");
        });

        Ok(Self {
            prefix: prefix.to_string(),
            queue: Mutex::new(Some(sender)),
        })
    }
}

impl TelemetryClient for HttpClient {
    fn log(&self, event_name: &str, data: &EventData) {
        let queue = self.queue.lock().unwrap();
        let Some(sender) = queue.as_ref() else {
            return;
        };
        let envelope = EventEnvelope::new(&self.prefix, event_name, data.clone());
        // Send only fails when the worker is gone; nothing left to do then.
        let _ = sender.send(envelope);
    }

    fn dispose(&self) {
        // Dropping the sender lets the worker drain what is queued and exit.
        self.queue.lock().unwrap().take();
    }
}

/// Post one event, reducing any failure to a warning.
async fn deliver(client: &reqwest::Client, url: &str, envelope: EventEnvelope) {
    let response = match client.post(url).json(&envelope).send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(name = %envelope.name, error = %err, "telemetry delivery failed");
            return;
        }
    };

    let status = response.status();
    if status.is_success() {
        tracing::trace!(name = %envelope.name, "telemetry event delivered");
    } else {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        tracing::warn!(
            name = %envelope.name,
            %status,
            error = %error_text,
            "collector rejected telemetry event"
        );
    }
}

/// Compute a content-based hash for event deduplication
///
/// Returns a 32-character hex digest of SHA-256(name + occurred_at + data)
fn compute_event_hash(name: &str, occurred_at: &DateTime<Utc>, data: &EventData) -> String {
    let content = serde_json::to_string(data).unwrap_or_default();
    let hash_input = format!("{}:{}:{}", name, occurred_at.to_rfc3339(), content);

    let mut hasher = Sha256::new();
    hasher.update(hash_input.as_bytes());
    let result = hasher.finalize();

    // Take first 16 bytes (32 hex chars)
    hex::encode(&result[..16])
}
