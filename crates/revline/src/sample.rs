//! Core telemetry types for revline.
//!
//! A [`Reading`] is one poll of raw sensor values; a [`Metrics`] frame is what
//! the dashboard shows and what run logs store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The Mode 01 parameters revline polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pid {
    /// Engine speed, rev/min.
    Rpm,
    /// Vehicle speed, km/h.
    Speed,
    /// Mass air flow rate, g/s.
    Maf,
    /// Engine coolant temperature, °C.
    CoolantTemp,
    /// Calculated engine load, %.
    EngineLoad,
    /// Short term fuel trim, bank 1, %.
    ShortFuelTrim1,
    /// Intake air temperature, °C.
    IntakeTemp,
}

impl Pid {
    /// Every polled PID, in query order.
    pub const ALL: [Pid; 7] = [
        Pid::Rpm,
        Pid::Speed,
        Pid::Maf,
        Pid::CoolantTemp,
        Pid::EngineLoad,
        Pid::ShortFuelTrim1,
        Pid::IntakeTemp,
    ];

    /// The PID byte.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::EngineLoad => 0x04,
            Self::CoolantTemp => 0x05,
            Self::ShortFuelTrim1 => 0x06,
            Self::Rpm => 0x0C,
            Self::Speed => 0x0D,
            Self::IntakeTemp => 0x0F,
            Self::Maf => 0x10,
        }
    }

    /// Number of data bytes in the response.
    #[must_use]
    pub const fn data_len(self) -> usize {
        match self {
            Self::Rpm | Self::Maf => 2,
            _ => 1,
        }
    }

    /// Value used when the vehicle does not report this PID.
    #[must_use]
    pub const fn fallback(self) -> f64 {
        match self {
            Self::IntakeTemp => 25.0,
            _ => 0.0,
        }
    }

    /// Decode response data bytes into engineering units.
    ///
    /// Returns `None` when fewer bytes than [`Pid::data_len`] are given.
    #[must_use]
    pub fn decode(self, data: &[u8]) -> Option<f64> {
        if data.len() < self.data_len() {
            return None;
        }
        let a = f64::from(data[0]);
        let value = match self {
            Self::Rpm => (a * 256.0 + f64::from(data[1])) / 4.0,
            Self::Maf => (a * 256.0 + f64::from(data[1])) / 100.0,
            Self::Speed => a,
            Self::CoolantTemp | Self::IntakeTemp => a - 40.0,
            Self::EngineLoad => a * 100.0 / 255.0,
            Self::ShortFuelTrim1 => (a - 128.0) * 100.0 / 128.0,
        };
        Some(value)
    }
}

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rpm => write!(f, "rpm"),
            Self::Speed => write!(f, "speed"),
            Self::Maf => write!(f, "maf"),
            Self::CoolantTemp => write!(f, "coolant_temp"),
            Self::EngineLoad => write!(f, "engine_load"),
            Self::ShortFuelTrim1 => write!(f, "short_fuel_trim_1"),
            Self::IntakeTemp => write!(f, "intake_temp"),
        }
    }
}

/// One poll of raw sensor values.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// When the poll completed.
    pub timestamp: DateTime<Utc>,
    /// Engine speed, rev/min.
    pub rpm: f64,
    /// Vehicle speed, km/h.
    pub speed: f64,
    /// Mass air flow, g/s.
    pub maf: f64,
    /// Coolant temperature, °C.
    pub coolant: f64,
    /// Engine load, %.
    pub load: f64,
    /// Short term fuel trim, %.
    pub fuel_trim: f64,
    /// Intake air temperature, °C.
    pub intake: f64,
}

impl Reading {
    /// A reading with every PID at its fallback value.
    #[must_use]
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            rpm: Pid::Rpm.fallback(),
            speed: Pid::Speed.fallback(),
            maf: Pid::Maf.fallback(),
            coolant: Pid::CoolantTemp.fallback(),
            load: Pid::EngineLoad.fallback(),
            fuel_trim: Pid::ShortFuelTrim1.fallback(),
            intake: Pid::IntakeTemp.fallback(),
        }
    }

    /// Store a value for `pid`, or its fallback when absent.
    pub fn set(&mut self, pid: Pid, value: Option<f64>) {
        let value = value.unwrap_or_else(|| pid.fallback());
        match pid {
            Pid::Rpm => self.rpm = value,
            Pid::Speed => self.speed = value,
            Pid::Maf => self.maf = value,
            Pid::CoolantTemp => self.coolant = value,
            Pid::EngineLoad => self.load = value,
            Pid::ShortFuelTrim1 => self.fuel_trim = value,
            Pid::IntakeTemp => self.intake = value,
        }
    }
}

/// One dashboard frame.
///
/// Field order matches the run log column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Frame time, serialized as UNIX seconds.
    #[serde(with = "unix_seconds", default)]
    pub timestamp: DateTime<Utc>,
    /// Engine speed, rev/min.
    #[serde(default)]
    pub rpm: f64,
    /// Vehicle speed, km/h.
    #[serde(default)]
    pub speed: f64,
    /// Estimated power, hp.
    #[serde(default)]
    pub hp: f64,
    /// Estimated torque, Nm.
    #[serde(default)]
    pub torque: f64,
    /// Volumetric efficiency, %.
    #[serde(default)]
    pub ve: f64,
    /// Fuel consumption, L/h.
    #[serde(default)]
    pub fuel_rate: f64,
    /// Coolant temperature, °C.
    #[serde(default)]
    pub coolant: f64,
    /// Engine load, %.
    #[serde(default)]
    pub load: f64,
    /// Fuel used this session, L.
    #[serde(default)]
    pub fuel_total: f64,
    /// Standard deviation of recent fuel trim.
    #[serde(default)]
    pub stability: f64,
    /// Intake air temperature, °C.
    #[serde(default = "default_temp_in")]
    pub temp_in: f64,
}

fn default_temp_in() -> f64 {
    Pid::IntakeTemp.fallback()
}

impl Metrics {
    /// Column names of a run log, in order.
    pub const HEADERS: [&'static str; 12] = [
        "timestamp",
        "rpm",
        "speed",
        "hp",
        "torque",
        "ve",
        "fuel_rate",
        "coolant",
        "load",
        "fuel_total",
        "stability",
        "temp_in",
    ];

    /// The frame shown while no source is connected.
    #[must_use]
    pub fn zeroed(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            rpm: 0.0,
            speed: 0.0,
            hp: 0.0,
            torque: 0.0,
            ve: 0.0,
            fuel_rate: 0.0,
            coolant: 0.0,
            load: 0.0,
            fuel_total: 0.0,
            stability: 0.0,
            temp_in: 0.0,
        }
    }
}

mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        let seconds = ts.timestamp_micros() as f64 / 1_000_000.0;
        serializer.serialize_f64(seconds)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {seconds}")))
    }
}
