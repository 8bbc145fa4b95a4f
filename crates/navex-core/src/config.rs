//! Configuration types for Navex synchronization
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main synchronization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Carrier settings record
    pub credentials: CarrierCredentials,

    /// Host store configuration
    #[serde(default)]
    pub host_store: HostStoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a new configuration with defaults
    pub fn new(credentials: CarrierCredentials) -> Self {
        Self {
            credentials,
            host_store: HostStoreConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// Incomplete credentials are NOT an error here: an unconfigured carrier
    /// simply disables synchronization.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.host_store.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Carrier endpoint and credentials
///
/// Loaded once per process (or request) from the settings record and passed
/// explicitly into every [`crate::SyncEngine`] call. The core never mutates it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierCredentials {
    /// Base URL of the carrier API
    #[serde(default)]
    pub endpoint: String,

    /// Account username, embedded in the request path
    #[serde(default)]
    pub username: String,

    /// API key, embedded in the request path
    #[serde(default)]
    pub api_key: String,

    /// Default shipment designation used when the caller supplies none
    #[serde(default)]
    pub designation: String,
}

// The api key must never reach logs.
impl std::fmt::Debug for CarrierCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierCredentials")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("api_key", &"<REDACTED>")
            .field("designation", &self.designation)
            .finish()
    }
}

impl CarrierCredentials {
    /// Create credentials with an empty default designation
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            api_key: api_key.into(),
            designation: String::new(),
        }
    }

    /// Set the default designation
    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = designation.into();
        self
    }

    /// True when endpoint, username and api key are all non-empty
    pub fn is_complete(&self) -> bool {
        !self.endpoint.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.api_key.trim().is_empty()
    }

    /// Designation for a shipment: the caller's value if present, else the default
    pub fn designation_or_default<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.trim().is_empty() {
            &self.designation
        } else {
            requested
        }
    }
}

/// Host store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostStoreConfig {
    /// JSON snapshot file
    File {
        /// Path to the snapshot file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl HostStoreConfig {
    /// Validate the host store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            HostStoreConfig::File { path } if path.trim().is_empty() => Err(
                crate::Error::config("Host store path cannot be empty for the file store"),
            ),
            _ => Ok(()),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between two reconciliation passes
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new sync events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.reconcile_interval_secs == 0 {
            return Err(crate::Error::config("Reconcile interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_reconcile_interval_secs() -> u64 {
    3600
}

fn default_event_channel_capacity() -> usize {
    1000
}
