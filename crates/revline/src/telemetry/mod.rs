//! The arithmetic layer that turns sensor readings into dashboard values.
//!
//! - [`formulas`]: power, torque, volumetric efficiency and fuel estimates
//! - [`stability`]: rolling fuel trim deviation
//! - [`perf`]: 0-100 km/h timing and the leaderboard
//! - [`fuel_map`]: fuel rate heat map over RPM and load
//! - [`brain`]: ties the above together, one reading at a time

pub mod brain;
pub mod formulas;
pub mod fuel_map;
pub mod perf;
pub mod stability;

pub use brain::{Extras, TelemetryBrain, VehicleProfile};
pub use fuel_map::FuelMap;
pub use perf::{CompletedRun, Leaderboard, PerfTimer};
pub use stability::TrimWindow;
