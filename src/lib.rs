//! Listing-Harvest: an incremental directory-listing collector
//!
//! This crate drives a real browser through "load more" style directory pages,
//! extracts business listings, deduplicates them against earlier runs, and
//! persists them incrementally so an interrupted run can be resumed.

pub mod browser;
pub mod config;
pub mod enrich;
pub mod harvester;
pub mod output;
pub mod site;
pub mod state;
pub mod storage;

use thiserror::Error;

pub use output::ExportError;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Page left the expected location: expected '{expected}' in {actual}")]
    Navigation { expected: String, actual: String },

    #[error("Enrichment error: {0}")]
    Enrichment(String),

    #[error("A harvest run is already active")]
    AlreadyRunning,

    #[error("Stop requested")]
    Stopped,
}

impl HarvestError {
    /// Returns true if this error came from the stop signal
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if the driver may retry the step that produced this error
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Browser(e) => e.is_transient(),
            Self::Navigation { .. } => true,
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown site profile: {0}")]
    UnknownProfile(String),
}

/// Errors raised by the browser capability
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Element reference is stale: {0}")]
    StaleElement(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser session is closed")]
    Closed,
}

impl BrowserError {
    /// Launch failures and closed sessions cannot be fixed by retrying
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Launch(_) | Self::Closed)
    }
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for browser operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{run_harvest, HarvestOptions, HarvestReport};
pub use state::{Phase, RunStatus, StopSignal, Termination};
pub use storage::{Checkpoint, FieldValue, IdentityKey, Record, RecordStore};
