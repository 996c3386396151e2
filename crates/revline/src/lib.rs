//! `revline` - Engine telemetry dashboard for ELM327 OBD-II adapters
//!
//! This library polls engine sensors through an ELM327 adapter (or a built-in
//! simulation), derives power, torque, volumetric efficiency and fuel figures,
//! times 0-100 km/h runs, records run logs and plays them back.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod calibration;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gauges;
pub mod logging;
pub mod poller;
pub mod recorder;
pub mod replay;
pub mod sample;
pub mod source;
pub mod storage;
pub mod telemetry;

pub use calibration::Calibrator;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use poller::{DashboardEvent, Frame, Poller, PollerHandle};
pub use recorder::RunRecorder;
pub use replay::Replayer;
pub use sample::{Metrics, Pid, Reading};
pub use source::{SourceKind, TelemetrySource};
pub use storage::{Storage, StorageStats};
pub use telemetry::{TelemetryBrain, VehicleProfile};
