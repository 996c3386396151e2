//! Error types for revline.
//!
//! This module defines all error types used throughout the revline crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for revline operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Adapter Errors ===
    /// Could not reach the OBD-II adapter.
    #[error("failed to connect to adapter at {address}: {message}")]
    AdapterConnect {
        /// Address that was dialled.
        address: String,
        /// Description of what went wrong.
        message: String,
    },

    /// The adapter answered with something we could not use.
    #[error("unexpected adapter response to '{command}': {response}")]
    AdapterProtocol {
        /// The command that was sent.
        command: String,
        /// The raw response text.
        response: String,
    },

    /// The adapter link is closed.
    #[error("adapter disconnected")]
    AdapterDisconnected,

    // === Vehicle Errors ===
    /// No catalog entry matches the requested model.
    #[error("vehicle not found: {model}")]
    VehicleNotFound {
        /// The model that was looked up.
        model: String,
    },

    /// A catalog entry that cannot be used for calculations.
    #[error("invalid catalog entry: {message}")]
    InvalidVehicle {
        /// Description of what is wrong with the entry.
        message: String,
    },

    /// A displacement value that cannot be calibrated against.
    #[error("invalid engine displacement: {value}")]
    InvalidDisplacement {
        /// The rejected value as entered.
        value: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run log CSV could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // === Generic Errors ===
    /// An operation timed out.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },
}

/// A specialized Result type for revline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid catalog entry error.
    #[must_use]
    pub fn invalid_vehicle(message: impl Into<String>) -> Self {
        Self::InvalidVehicle {
            message: message.into(),
        }
    }

    /// Create an adapter connection error.
    #[must_use]
    pub fn adapter_connect(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AdapterConnect {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create an adapter protocol error.
    #[must_use]
    pub fn adapter_protocol(command: impl Into<String>, response: impl Into<String>) -> Self {
        Self::AdapterProtocol {
            command: command.into(),
            response: response.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Check if this error means the adapter could not be used at all.
    ///
    /// These are the failures that trigger the fallback to simulated data.
    #[must_use]
    pub fn is_adapter_unavailable(&self) -> bool {
        matches!(
            self,
            Self::AdapterConnect { .. }
                | Self::AdapterProtocol { .. }
                | Self::AdapterDisconnected
                | Self::Timeout { .. }
        )
    }
}
