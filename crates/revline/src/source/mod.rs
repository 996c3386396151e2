//! Telemetry sources.
//!
//! A source produces one [`Reading`] per poll. The adapter source talks to an
//! ELM327; the simulated source stands in when no adapter answers.

pub mod elm327;
pub mod simulated;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::sample::Reading;

pub use elm327::{Elm327, Timeouts};
pub use simulated::SimulatedSource;

/// Where readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A live ELM327 adapter.
    Adapter,
    /// The built-in simulated drive.
    Simulated,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adapter => write!(f, "adapter"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

/// A producer of sensor readings.
#[async_trait]
pub trait TelemetrySource: Send {
    /// What kind of source this is.
    fn kind(&self) -> SourceKind;

    /// Whether the source can currently produce real data.
    fn is_connected(&self) -> bool;

    /// Take one reading of every polled PID.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read, e.g. the adapter link dropped.
    async fn read(&mut self) -> Result<Reading>;
}

/// Open the configured adapter, or the simulated source if none responds.
///
/// `force_simulated` skips the adapter entirely.
pub async fn open(config: &Config, force_simulated: bool) -> Box<dyn TelemetrySource> {
    if force_simulated || !config.adapter.enabled {
        info!("Using simulated telemetry");
        return Box::new(SimulatedSource::new());
    }

    match Elm327::connect_tcp(&config.adapter.address, Timeouts::from_config(config)).await {
        Ok(link) => {
            info!(address = %config.adapter.address, "Connected to OBD-II adapter");
            Box::new(link)
        }
        Err(e) if e.is_adapter_unavailable() => {
            warn!(error = %e, "No adapter responded, falling back to simulated telemetry");
            Box::new(SimulatedSource::new())
        }
        Err(e) => {
            error!(error = %e, "Adapter setup failed, falling back to simulated telemetry");
            Box::new(SimulatedSource::new())
        }
    }
}
