//! Engine estimates from scalar readings.
//!
//! These are the rough MAF-based estimates a phone dashboard can afford, not a
//! dyno model: power scales linearly with air mass, fuel assumes petrol at
//! stoichiometric mixture.

/// Horsepower per g/s of air flow.
pub const HP_PER_MAF: f64 = 1.32;

/// Converts hp at a given RPM to Nm.
pub const TORQUE_CONSTANT: f64 = 7127.0;

/// Below this RPM torque is reported as zero.
pub const TORQUE_MIN_RPM: f64 = 500.0;

/// Below this RPM volumetric efficiency is reported as zero.
pub const VE_MIN_RPM: f64 = 400.0;

/// Air density at 15 °C, sea level, kg/m³.
pub const SEA_LEVEL_AIR_DENSITY: f64 = 1.225;

/// 15 °C in kelvin.
pub const REFERENCE_TEMP_K: f64 = 288.15;

/// 0 °C in kelvin.
pub const ZERO_CELSIUS_K: f64 = 273.15;

/// Stoichiometric air-fuel ratio for petrol.
pub const STOICH_AFR: f64 = 14.7;

/// Petrol density, g/L.
pub const FUEL_DENSITY_G_PER_L: f64 = 740.0;

/// Below this speed fuel economy is reported as zero, km/h.
pub const ECONOMY_MIN_SPEED: f64 = 5.0;

/// Estimated power from air flow.
#[must_use]
pub fn horsepower(maf: f64) -> f64 {
    maf * HP_PER_MAF
}

/// Estimated torque in Nm.
#[must_use]
pub fn torque_nm(hp: f64, rpm: f64) -> f64 {
    if rpm > TORQUE_MIN_RPM {
        hp * TORQUE_CONSTANT / rpm
    } else {
        0.0
    }
}

/// Intake air density in kg/m³, corrected for temperature only.
#[must_use]
pub fn air_density(intake_c: f64) -> f64 {
    SEA_LEVEL_AIR_DENSITY * REFERENCE_TEMP_K / (ZERO_CELSIUS_K + intake_c)
}

/// Volumetric efficiency in percent.
///
/// Compares measured air flow against what a four-stroke engine of
/// `displacement_l` would ingest at `rpm` (one intake stroke every two turns).
#[must_use]
pub fn volumetric_efficiency(maf: f64, rpm: f64, displacement_l: f64, intake_c: f64) -> f64 {
    if rpm <= VE_MIN_RPM {
        return 0.0;
    }
    let theoretical_gps = rpm * (displacement_l / 1000.0) * air_density(intake_c) / 120.0 * 1000.0;
    maf / theoretical_gps * 100.0
}

/// Fuel consumption in L/h.
#[must_use]
pub fn fuel_rate_lph(maf: f64) -> f64 {
    maf * 3600.0 / (STOICH_AFR * FUEL_DENSITY_G_PER_L)
}

/// Instant fuel economy in L/100km.
#[must_use]
pub fn litres_per_100km(fuel_rate: f64, speed: f64) -> f64 {
    if speed > ECONOMY_MIN_SPEED && fuel_rate > 0.0 {
        fuel_rate / speed * 100.0
    } else {
        0.0
    }
}

/// Power-to-weight in hp per tonne.
#[must_use]
pub fn hp_per_tonne(hp: f64, weight_kg: f64) -> f64 {
    if weight_kg <= 0.0 {
        return 0.0;
    }
    hp / (weight_kg / 1000.0)
}
