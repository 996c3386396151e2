//! Vehicle calibration.
//!
//! Decides which vehicle the telemetry is calculated for and persists changes
//! to that choice.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::{ActiveVehicle, Storage};
use crate::telemetry::VehicleProfile;

/// Result of a calibration change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Calibrated {
    /// The vehicle now in use.
    pub vehicle: VehicleProfile,
    /// True when no adapter is available, so values will be simulated.
    pub simulated: bool,
}

/// Reads and updates the active vehicle.
#[derive(Debug)]
pub struct Calibrator<'a> {
    storage: &'a Storage,
    config: &'a Config,
}

impl<'a> Calibrator<'a> {
    /// Create a calibrator over `storage` with fallbacks from `config`.
    #[must_use]
    pub fn new(storage: &'a Storage, config: &'a Config) -> Self {
        Self { storage, config }
    }

    /// The vehicle to calculate for.
    ///
    /// A persisted selection wins; without one the configured displacement
    /// and weight are used. Weight comes from the catalog when the selected
    /// model is in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn current(&self) -> Result<VehicleProfile> {
        let active = self.storage.active_vehicle()?;
        if active == ActiveVehicle::default() {
            return Ok(VehicleProfile {
                model: active.model,
                displacement_cc: self.config.vehicle.displacement_cc,
                weight_kg: self.config.vehicle.weight_kg,
            });
        }

        let weight_kg = self
            .storage
            .vehicle(&active.model)?
            .map_or(self.config.vehicle.weight_kg, |spec| spec.weight_kg);
        Ok(VehicleProfile {
            model: active.model,
            displacement_cc: active.displacement_cc,
            weight_kg,
        })
    }

    /// Switch to a catalog model and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VehicleNotFound`] if the model is not in the catalog.
    pub fn select(&self, model: &str) -> Result<Calibrated> {
        let spec = self
            .storage
            .vehicle(model)?
            .ok_or_else(|| Error::VehicleNotFound {
                model: model.to_string(),
            })?;

        self.storage
            .save_active_vehicle(&spec.model, spec.displacement_cc)?;
        info!(model = %spec.model, cc = spec.displacement_cc, "Vehicle selected");

        Ok(self.finish(VehicleProfile {
            model: spec.model,
            displacement_cc: spec.displacement_cc,
            weight_kg: spec.weight_kg,
        }))
    }

    /// Override the displacement of the current vehicle and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDisplacement`] for zero.
    pub fn set_displacement(&self, displacement_cc: u32) -> Result<Calibrated> {
        if displacement_cc == 0 {
            return Err(Error::InvalidDisplacement {
                value: displacement_cc.to_string(),
            });
        }

        let mut vehicle = self.current()?;
        vehicle.displacement_cc = displacement_cc;
        self.storage
            .save_active_vehicle(&vehicle.model, displacement_cc)?;
        info!(model = %vehicle.model, cc = displacement_cc, "Displacement calibrated");

        Ok(self.finish(vehicle))
    }

    fn finish(&self, vehicle: VehicleProfile) -> Calibrated {
        let simulated = !self.config.adapter.enabled;
        if simulated {
            warn!("Adapter disabled, calibration saved but values will come from simulated data");
        }
        Calibrated { vehicle, simulated }
    }
}

/// Parse a displacement typed by the user, in cc.
///
/// # Errors
///
/// Returns [`Error::InvalidDisplacement`] unless the input is a positive whole
/// number.
pub fn parse_displacement(input: &str) -> Result<u32> {
    match input.trim().parse::<u32>() {
        Ok(cc) if cc > 0 => Ok(cc),
        _ => Err(Error::InvalidDisplacement {
            value: input.to_string(),
        }),
    }
}

/// What to tell the user when a catalog search finds nothing.
#[must_use]
pub fn search_miss_hint(query: &str) -> String {
    format!(
        "No vehicles match \"{query}\".\n\
         Add it with `revline vehicle import FILE.json` \
         (a JSON array of {{model, cc, fuel, weight, drag}}),\n\
         or calibrate directly with `revline vehicle set-cc CC`."
    )
}
