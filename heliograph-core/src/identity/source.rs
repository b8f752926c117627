//! Platform identity lookup strategy
//!
//! Some platforms maintain stable machine/user identifiers outside the
//! application (Windows keeps SQM ids in the registry). Lookups go through
//! the [`IdentitySource`] trait so the capability is selected once at
//! startup and swapped out in tests.

use crate::store::keys;
use async_trait::async_trait;
use std::sync::Arc;

/// The identity fields a platform registry may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    /// Stable per-user identifier.
    UserId,
    /// Stable per-machine identifier.
    MachineId,
}

impl IdentityField {
    /// Session store key the value is cached under.
    pub(crate) fn store_key(self) -> &'static str {
        match self {
            IdentityField::UserId => keys::SQM_USER_ID,
            IdentityField::MachineId => keys::SQM_MACHINE_ID,
        }
    }

    /// Common-property name the value is published as.
    pub(crate) fn property_name(self) -> &'static str {
        match self {
            IdentityField::UserId => "sqm.userid",
            IdentityField::MachineId => "sqm.machineid",
        }
    }
}

/// Source of stable platform identity values.
///
/// `lookup` answers `None` both when the platform has no value and when the
/// lookup fails; a failed lookup must never panic or surface an error, the
/// field simply stays absent from the common data.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Read one identity field from the platform.
    async fn lookup(&self, field: IdentityField) -> Option<String>;
}

/// Identity source for platforms without an identity registry.
#[derive(Debug, Default)]
pub struct NullIdentitySource;

#[async_trait]
impl IdentitySource for NullIdentitySource {
    async fn lookup(&self, _field: IdentityField) -> Option<String> {
        None
    }
}

/// Select the identity source for the current platform.
///
/// Resolved once at appender construction; per-event code never branches on
/// the platform.
pub fn platform_identity_source() -> Arc<dyn IdentitySource> {
    #[cfg(windows)]
    {
        Arc::new(windows::SqmRegistrySource)
    }
    #[cfg(not(windows))]
    {
        Arc::new(NullIdentitySource)
    }
}

#[cfg(windows)]
mod windows {
    //! SQM (Software Quality Metrics) registry reads.

    use super::{IdentityField, IdentitySource};
    use async_trait::async_trait;
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
    use winreg::RegKey;

    const SQM_CLIENT_KEY: &str = r"Software\Microsoft\SQMClient";

    /// Reads the stable identifiers Windows maintains under
    /// `Software\Microsoft\SQMClient`: UserId in HKEY_CURRENT_USER,
    /// MachineId in HKEY_LOCAL_MACHINE.
    pub(super) struct SqmRegistrySource;

    #[async_trait]
    impl IdentitySource for SqmRegistrySource {
        async fn lookup(&self, field: IdentityField) -> Option<String> {
            // Registry access is blocking; keep it off the runtime threads.
            match tokio::task::spawn_blocking(move || read_sqm_value(field)).await {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(error = %err, "SQM registry task failed");
                    None
                }
            }
        }
    }

    fn read_sqm_value(field: IdentityField) -> Option<String> {
        let (hive, value_name) = match field {
            IdentityField::UserId => (HKEY_CURRENT_USER, "UserId"),
            IdentityField::MachineId => (HKEY_LOCAL_MACHINE, "MachineId"),
        };

        let key = match RegKey::predef(hive).open_subkey(SQM_CLIENT_KEY) {
            Ok(key) => key,
            Err(err) => {
                tracing::debug!(error = %err, "SQM registry key unavailable");
                return None;
            }
        };

        match key.get_value::<String, _>(value_name) {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(?field, error = %err, "SQM value missing");
                None
            }
        }
    }
}
