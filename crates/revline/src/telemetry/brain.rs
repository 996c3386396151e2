//! Per-reading metric derivation.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use super::formulas;
use super::fuel_map::FuelMap;
use super::perf::{CompletedRun, Leaderboard, LaunchWindow, PerfTimer};
use super::stability::TrimWindow;
use crate::config::TelemetryConfig;
use crate::error::{Error, Result};
use crate::sample::{Metrics, Reading};

/// The vehicle metrics are computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleProfile {
    /// Display name.
    pub model: String,
    /// Engine displacement, cc.
    pub displacement_cc: u32,
    /// Curb weight, kg.
    pub weight_kg: u32,
}

impl VehicleProfile {
    /// Displacement in litres.
    #[must_use]
    pub fn displacement_l(&self) -> f64 {
        f64::from(self.displacement_cc) / 1000.0
    }
}

impl Default for VehicleProfile {
    fn default() -> Self {
        Self {
            model: "Default".to_string(),
            displacement_cc: 2000,
            weight_kg: 1500,
        }
    }
}

/// Figures derived from a frame and the vehicle, shown beside it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Extras {
    /// Instant economy, L/100km.
    pub l_100km: f64,
    /// Power-to-weight, hp/tonne.
    pub hp_per_tonne: f64,
}

/// A run finished during an update, with its leaderboard rank if it placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedRun {
    /// The timed run.
    pub run: CompletedRun,
    /// 1-based leaderboard position, `None` if it did not place.
    pub rank: Option<usize>,
}

/// Result of feeding one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    /// The derived frame.
    pub metrics: Metrics,
    /// Set when this reading completed a timed run.
    pub completed: Option<RankedRun>,
}

/// Turns readings into dashboard frames and keeps the session state:
/// accumulated fuel, trim window, run timer, leaderboard and fuel map.
#[derive(Debug, Clone)]
pub struct TelemetryBrain {
    vehicle: VehicleProfile,
    fuel_total: f64,
    trim: TrimWindow,
    perf: PerfTimer,
    leaderboard: Leaderboard,
    fuel_map: FuelMap,
}

impl TelemetryBrain {
    /// Create a brain for `vehicle` with the given telemetry settings.
    #[must_use]
    pub fn new(vehicle: VehicleProfile, config: &TelemetryConfig) -> Self {
        Self {
            vehicle,
            fuel_total: 0.0,
            trim: TrimWindow::new(config.trim_window),
            perf: PerfTimer::new(LaunchWindow {
                min_kmh: config.launch_min_kmh,
                max_kmh: config.launch_max_kmh,
                target_kmh: config.target_kmh,
            }),
            leaderboard: Leaderboard::new(config.leaderboard_size),
            fuel_map: FuelMap::new(),
        }
    }

    /// Seed the leaderboard with runs from earlier sessions.
    #[must_use]
    pub fn with_leaderboard(mut self, leaderboard: Leaderboard) -> Self {
        self.leaderboard = leaderboard;
        self
    }

    /// The vehicle currently calculated for.
    #[must_use]
    pub fn vehicle(&self) -> &VehicleProfile {
        &self.vehicle
    }

    /// Recalibrate the displacement used for volumetric efficiency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDisplacement`] for zero.
    pub fn set_displacement_cc(&mut self, cc: u32) -> Result<()> {
        if cc == 0 {
            return Err(Error::InvalidDisplacement {
                value: cc.to_string(),
            });
        }
        debug!(cc, "Displacement recalibrated");
        self.vehicle.displacement_cc = cc;
        Ok(())
    }

    /// Feed one reading taken `dt` after the previous one.
    pub fn update(&mut self, reading: &Reading, dt: Duration) -> Tick {
        let hp = formulas::horsepower(reading.maf);
        let torque = formulas::torque_nm(hp, reading.rpm);
        let ve = formulas::volumetric_efficiency(
            reading.maf,
            reading.rpm,
            self.vehicle.displacement_l(),
            reading.intake,
        );
        let fuel_rate = formulas::fuel_rate_lph(reading.maf);
        self.fuel_total += fuel_rate * dt.as_secs_f64() / 3600.0;

        self.trim.push(reading.fuel_trim);
        let stability = self.trim.std_dev();

        let completed = self
            .perf
            .update(reading.speed, reading.timestamp)
            .map(|run| RankedRun {
                run,
                rank: self.leaderboard.insert(run.seconds),
            });

        self.fuel_map.record(reading.rpm, reading.load, fuel_rate);

        trace!(rpm = reading.rpm, speed = reading.speed, hp, ve, "Reading processed");

        Tick {
            metrics: Metrics {
                timestamp: reading.timestamp,
                rpm: reading.rpm,
                speed: reading.speed,
                hp,
                torque,
                ve,
                fuel_rate,
                coolant: reading.coolant,
                load: reading.load,
                fuel_total: self.fuel_total,
                stability,
                temp_in: reading.intake,
            },
            completed,
        }
    }

    /// Economy and power-to-weight for a frame.
    #[must_use]
    pub fn extras(&self, metrics: &Metrics) -> Extras {
        Extras {
            l_100km: formulas::litres_per_100km(metrics.fuel_rate, metrics.speed),
            hp_per_tonne: formulas::hp_per_tonne(metrics.hp, f64::from(self.vehicle.weight_kg)),
        }
    }

    /// Best run times, fastest first.
    #[must_use]
    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// The fuel heat map so far.
    #[must_use]
    pub fn fuel_map(&self) -> &FuelMap {
        &self.fuel_map
    }

    /// Fuel used this session, L.
    #[must_use]
    pub fn fuel_total(&self) -> f64 {
        self.fuel_total
    }

    /// True while a run is being timed.
    #[must_use]
    pub fn is_timing(&self) -> bool {
        self.perf.is_running()
    }
}
