//! Simulated drive used when no adapter is present.
//!
//! The drive repeats a fixed cycle: idle, a full-throttle launch through the
//! gears, a settling cruise and a coast back to a stop. Every cycle contains
//! one 0-100 run, so the timer and leaderboard can be exercised without a car.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{SourceKind, TelemetrySource};
use crate::error::Result;
use crate::sample::Reading;

const IDLE_SECS: f64 = 8.0;
const LAUNCH_SECS: f64 = 8.0;
const CRUISE_SECS: f64 = 24.0;
const COAST_SECS: f64 = 12.0;

/// Length of one drive cycle, seconds.
pub const CYCLE_SECS: f64 = IDLE_SECS + LAUNCH_SECS + CRUISE_SECS + COAST_SECS;

const IDLE_RPM: f64 = 850.0;
const LAUNCH_PEAK_KMH: f64 = 110.0;
const CRUISE_KMH: f64 = 90.0;

/// Road speed per 1000 RPM in each gear, km/h.
const GEAR_KMH_PER_KRPM: [f64; 5] = [8.0, 14.0, 21.0, 28.0, 35.0];

/// Upshift points, km/h.
const SHIFT_KMH: [f64; 4] = [40.0, 70.0, 100.0, 130.0];

/// Phase of the simulated drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrivePhase {
    /// Stationary, engine idling.
    Idle,
    /// Full-throttle acceleration.
    Launch,
    /// Steady highway speed.
    Cruise,
    /// Off throttle, slowing to a stop.
    Coast,
}

/// Phase and seconds into it for a point in the cycle.
#[must_use]
pub fn phase_at(elapsed: Duration) -> (DrivePhase, f64) {
    let t = elapsed.as_secs_f64() % CYCLE_SECS;
    if t < IDLE_SECS {
        (DrivePhase::Idle, t)
    } else if t < IDLE_SECS + LAUNCH_SECS {
        (DrivePhase::Launch, t - IDLE_SECS)
    } else if t < IDLE_SECS + LAUNCH_SECS + CRUISE_SECS {
        (DrivePhase::Cruise, t - IDLE_SECS - LAUNCH_SECS)
    } else {
        (DrivePhase::Coast, t - IDLE_SECS - LAUNCH_SECS - CRUISE_SECS)
    }
}

fn engine_rpm(speed: f64) -> f64 {
    let gear = SHIFT_KMH.iter().take_while(|&&s| speed >= s).count();
    (speed / GEAR_KMH_PER_KRPM[gear] * 1000.0).max(IDLE_RPM)
}

/// The simulated sensor values `elapsed` into the drive.
#[must_use]
pub fn reading_at(elapsed: Duration, timestamp: DateTime<Utc>) -> Reading {
    let secs = elapsed.as_secs_f64();
    let (phase, p) = phase_at(elapsed);

    let (speed, load, trim_swing) = match phase {
        DrivePhase::Idle => (0.0, 20.0, 1.0),
        DrivePhase::Launch => (LAUNCH_PEAK_KMH * (p / LAUNCH_SECS).powf(0.8), 95.0, 6.0),
        DrivePhase::Cruise => (
            CRUISE_KMH + (LAUNCH_PEAK_KMH - CRUISE_KMH) * (-p / 3.0).exp(),
            35.0,
            2.0,
        ),
        DrivePhase::Coast => (CRUISE_KMH * (1.0 - p / COAST_SECS), 10.0, 1.5),
    };

    let rpm = if phase == DrivePhase::Idle {
        IDLE_RPM + 25.0 * (secs * 2.1).sin()
    } else {
        engine_rpm(speed)
    };
    let maf = rpm / 1000.0 * load / 100.0 * 30.0;

    let mut reading = Reading::at(timestamp);
    reading.rpm = rpm;
    reading.speed = speed;
    reading.maf = maf;
    reading.load = load;
    reading.coolant = 40.0 + 50.0 * (secs / 120.0).min(1.0);
    reading.fuel_trim = trim_swing * (secs * 1.3).sin();
    reading.intake = 25.0 + 10.0 * load / 100.0;
    reading
}

/// A [`TelemetrySource`] replaying the simulated drive in real time.
#[derive(Debug)]
pub struct SimulatedSource {
    started: Instant,
}

impl SimulatedSource {
    /// Start the drive at idle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for SimulatedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Simulated
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn read(&mut self) -> Result<Reading> {
        Ok(reading_at(self.started.elapsed(), Utc::now()))
    }
}
