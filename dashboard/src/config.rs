//! Configuration management for the dashboard.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tour_desk_client::DEFAULT_BASE_URL;

/// Where vendor-tour links are read from and written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkBackend {
    /// `GET`/`POST /vendorTours` on the API
    Remote,
    /// The local key/value file
    Local,
}

impl LinkBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remote" => Some(Self::Remote),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

/// How multi-variant setup is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupMode {
    /// Wait a fixed delay, no I/O
    Simulated,
    /// Create the vendor-tour link
    Linked,
}

impl SetupMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" => Some(Self::Simulated),
            "linked" => Some(Self::Linked),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API base URL (`TOUR_DESK_API_URL`)
    pub api_url: String,
    /// Link repository backend (`TOUR_DESK_LINK_BACKEND`)
    pub link_backend: LinkBackend,
    /// File backing the local key/value store (`TOUR_DESK_STORAGE_PATH`)
    pub storage_path: PathBuf,
    /// Alert auto-dismiss delay in milliseconds (`TOUR_DESK_ALERT_TIMEOUT_MS`)
    pub alert_timeout_ms: u64,
    /// Setup provisioner (`TOUR_DESK_SETUP_MODE`)
    pub setup_mode: SetupMode,
    /// Simulated setup delay in milliseconds (`TOUR_DESK_SETUP_DELAY_MS`)
    pub setup_delay_ms: u64,
    /// Upper bound when awaiting a load or save (`TOUR_DESK_WAIT_TIMEOUT_SECS`)
    pub wait_timeout_secs: u64,
    /// Ticket the binary opens (`TOUR_DESK_TICKET_ID`)
    pub ticket_id: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("TOUR_DESK_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            link_backend: env::var("TOUR_DESK_LINK_BACKEND")
                .ok()
                .and_then(|s| LinkBackend::parse(&s))
                .unwrap_or(LinkBackend::Remote),
            storage_path: env::var("TOUR_DESK_STORAGE_PATH")
                .map_or_else(|_| PathBuf::from("tour-desk-storage.json"), PathBuf::from),
            alert_timeout_ms: env::var("TOUR_DESK_ALERT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            setup_mode: env::var("TOUR_DESK_SETUP_MODE")
                .ok()
                .and_then(|s| SetupMode::parse(&s))
                .unwrap_or(SetupMode::Simulated),
            setup_delay_ms: env::var("TOUR_DESK_SETUP_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            wait_timeout_secs: env::var("TOUR_DESK_WAIT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            ticket_id: env::var("TOUR_DESK_TICKET_ID")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Alert auto-dismiss delay
    #[must_use]
    pub const fn alert_timeout(&self) -> Duration {
        Duration::from_millis(self.alert_timeout_ms)
    }

    /// Simulated setup delay
    #[must_use]
    pub const fn setup_delay(&self) -> Duration {
        Duration::from_millis(self.setup_delay_ms)
    }

    /// Upper bound when awaiting a load or save
    #[must_use]
    pub const fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            link_backend: LinkBackend::Remote,
            storage_path: PathBuf::from("tour-desk-storage.json"),
            alert_timeout_ms: 5000,
            setup_mode: SetupMode::Simulated,
            setup_delay_ms: 1000,
            wait_timeout_secs: 30,
            ticket_id: None,
        }
    }
}
