//! Telemetry backend clients
//!
//! One client per configured destination. The appender treats clients as an
//! opaque fan-out set; a client that fails must contain the failure and keep
//! its siblings unaffected.

pub mod http;

pub use http::HttpClient;

use crate::types::EventData;

/// Sink for telemetry events.
///
/// Implementations own the event-name prefix they were built with and apply
/// it themselves; the appender hands over the bare event name.
pub trait TelemetryClient: Send + Sync {
    /// Forward one event. Fire-and-forget: must not block the caller and
    /// must not surface delivery failures.
    fn log(&self, event_name: &str, data: &EventData);

    /// Release the client's resources. Safe to call more than once; `log`
    /// after `dispose` is a silent no-op.
    fn dispose(&self);
}
