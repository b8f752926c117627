//! Core domain types for heliograph
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | A named payload logged by the host application |
//! | **Property** | A string-valued payload entry |
//! | **Metric** | A numeric payload entry |
//! | **Common data** | Properties/metrics merged into every event under the `common.` prefix |
//! | **Host facts** | Version and OS details captured once at startup |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================
// Event payloads
// ============================================

/// A single payload value.
///
/// Telemetry backends keep string-valued properties and numeric metrics
/// apart, so the payload carries that split explicitly instead of
/// stringifying everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    /// String-valued entry (a property).
    Text(String),
    /// Numeric entry (a metric).
    Number(f64),
}

impl TelemetryValue {
    /// Returns the string value, if this is a property.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TelemetryValue::Text(value) => Some(value),
            TelemetryValue::Number(_) => None,
        }
    }

    /// Returns the numeric value, if this is a metric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TelemetryValue::Text(_) => None,
            TelemetryValue::Number(value) => Some(*value),
        }
    }
}

impl From<String> for TelemetryValue {
    fn from(value: String) -> Self {
        TelemetryValue::Text(value)
    }
}

impl From<&str> for TelemetryValue {
    fn from(value: &str) -> Self {
        TelemetryValue::Text(value.to_string())
    }
}

impl From<f64> for TelemetryValue {
    fn from(value: f64) -> Self {
        TelemetryValue::Number(value)
    }
}

impl From<i64> for TelemetryValue {
    fn from(value: i64) -> Self {
        TelemetryValue::Number(value as f64)
    }
}

impl From<i32> for TelemetryValue {
    fn from(value: i32) -> Self {
        TelemetryValue::Number(f64::from(value))
    }
}

impl From<u64> for TelemetryValue {
    fn from(value: u64) -> Self {
        TelemetryValue::Number(value as f64)
    }
}

impl From<u32> for TelemetryValue {
    fn from(value: u32) -> Self {
        TelemetryValue::Number(f64::from(value))
    }
}

/// Event payload: caller-supplied entries plus the merged `common.*` entries.
///
/// A `BTreeMap` keeps key order stable, so the serialized payload is
/// reproducible for the same input.
pub type EventData = BTreeMap<String, TelemetryValue>;

// ============================================
// Host facts
// ============================================

/// Host facts captured once at startup and handed to the appender.
///
/// Every field is optional: a missing fact is simply absent from the common
/// data, never an error. Callers build this value explicitly; the library
/// does not read process-global state for it.
#[derive(Debug, Clone, Default)]
pub struct HostInfo {
    /// Version of the embedding application.
    pub app_version: Option<String>,
    /// Version of the runtime the application runs on.
    pub runtime_version: Option<String>,
    /// Operating system release string.
    pub os_release: Option<String>,
}

impl HostInfo {
    /// Capture what the library can discover on its own (currently the OS
    /// release, read from the kernel on Linux and the `CurrentVersion`
    /// registry key on Windows; `None` on other platforms). The two version
    /// fields are the embedder's to fill.
    pub fn capture() -> Self {
        Self {
            app_version: None,
            runtime_version: None,
            os_release: os_release(),
        }
    }
}

#[cfg(target_os = "linux")]
fn os_release() -> Option<String> {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|release| !release.is_empty())
}

#[cfg(windows)]
fn os_release() -> Option<String> {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;

    // Composes the conventional "major.minor.build" version string.
    let version = RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey(r"SOFTWARE\Microsoft\Windows NT\CurrentVersion")
        .ok()?;
    let major: u32 = version.get_value("CurrentMajorVersionNumber").ok()?;
    let minor: u32 = version.get_value("CurrentMinorVersionNumber").ok()?;
    let build: String = version.get_value("CurrentBuild").ok()?;
    Some(format!("{}.{}.{}", major, minor, build))
}

#[cfg(not(any(target_os = "linux", windows)))]
fn os_release() -> Option<String> {
    None
}
