//! # heliograph-core
//!
//! Core library for heliograph - a telemetry event enrichment and fan-out
//! pipeline.
//!
//! This library provides:
//! - The [`TelemetryAppender`] host applications log events through
//! - Identity enrichment with durable session bookkeeping
//! - Pluggable session stores (SQLite, in-memory)
//! - Pluggable backend clients (HTTP collector delivery)
//!
//! ## Architecture
//!
//! An event passes through three stages:
//! - **Log:** the host hands `(name, data)` to the appender, fire-and-forget
//! - **Enrich:** the common property/metric set is merged in under `common.`
//! - **Fan out:** every configured backend client receives the merged event
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heliograph_core::{Config, HostInfo, SqliteStore, TelemetryAppender};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open the durable session store
//! let store = Arc::new(SqliteStore::open(&Config::database_path()).expect("failed to open store"));
//!
//! // Wire up the appender and log through it
//! let mut appender = TelemetryAppender::new(store, &config.telemetry, HostInfo::capture())
//!     .expect("failed to build appender");
//! appender.log("serviceStarted");
//! appender.dispose();
//! ```

// Re-export commonly used items at the crate root
pub use appender::{TelemetryAppender, EVENT_NAME_PREFIX};
pub use client::{HttpClient, TelemetryClient};
pub use config::Config;
pub use error::{Error, Result};
pub use identity::{CommonData, Enricher, IdentitySource, NullIdentitySource};
pub use store::{MemoryStore, SessionStore, SqliteStore};
pub use types::*;

// Public modules
pub mod appender;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod store;
pub mod types;
