//! Vehicle catalog entries and the built-in seed list.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One catalog entry.
///
/// Field names on the wire follow the shared catalog JSON:
/// `{"model", "cc", "fuel", "weight", "drag"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    /// Model name, unique in the catalog.
    pub model: String,
    /// Engine displacement, cc.
    #[serde(rename = "cc")]
    pub displacement_cc: u32,
    /// Fuel type, e.g. `Petrol`.
    #[serde(default = "default_fuel")]
    pub fuel: String,
    /// Curb weight, kg.
    #[serde(rename = "weight")]
    pub weight_kg: u32,
    /// Aerodynamic drag coefficient.
    #[serde(rename = "drag", default)]
    pub drag_coefficient: f64,
}

fn default_fuel() -> String {
    "Petrol".to_string()
}

impl VehicleSpec {
    /// Build an entry.
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        displacement_cc: u32,
        fuel: impl Into<String>,
        weight_kg: u32,
        drag_coefficient: f64,
    ) -> Self {
        Self {
            model: model.into(),
            displacement_cc,
            fuel: fuel.into(),
            weight_kg,
            drag_coefficient,
        }
    }

    /// Check the entry can be used for calculations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDisplacement`] for a zero displacement and
    /// [`Error::InvalidVehicle`] for an empty model name or zero weight.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::invalid_vehicle("vehicle model name is empty"));
        }
        if self.displacement_cc == 0 {
            return Err(Error::InvalidDisplacement {
                value: format!("{} cc for {}", self.displacement_cc, self.model),
            });
        }
        if self.weight_kg == 0 {
            return Err(Error::invalid_vehicle(format!("{} has zero weight", self.model)));
        }
        Ok(())
    }
}

/// Entries written into an empty catalog: model, cc, fuel, kg, drag.
pub const SEED_CATALOG: &[(&str, u32, &str, u32, f64)] = &[
    ("Toyota Mark X", 2499, "Petrol", 1550, 0.29),
    ("Subaru Forester XT", 1998, "Petrol", 1610, 0.33),
    ("Mercedes C200", 1497, "Petrol", 1505, 0.26),
    ("Volkswagen Golf R", 1984, "Petrol", 1483, 0.35),
    ("Honda Fit RS", 1496, "Petrol", 1050, 0.32),
    ("Nissan GT-R", 3799, "Petrol", 1750, 0.30),
    ("Subaru WRX STi", 2499, "Petrol", 1610, 0.31),
    ("Ford Mustang GT", 5038, "Petrol", 1750, 0.32),
    ("Subaru Outback (SX)", 2499, "Petrol", 1610, 0.33),
    ("Mercedes-Benz C-Class", 1998, "Petrol", 1505, 0.27),
    ("Subaru Impreza (2.0i)", 1995, "Petrol", 1050, 0.29),
    ("Mazda Demio (1.5)", 1496, "Petrol", 1050, 0.31),
    ("Mitsubishi Lancer EX", 1998, "Petrol", 1610, 0.32),
    ("Subaru WRX", 2499, "Petrol", 1610, 0.43),
    ("Mercedes-Benz E-Class", 2499, "Petrol", 1505, 0.22),
    ("Volkswagen Jetta GLI", 1984, "Petrol", 1483, 0.31),
    ("Honda CR-V (2.0i)", 1996, "Petrol", 1050, 0.28),
    ("Volkswagen Golf GTI", 1984, "Petrol", 1478, 0.35),
];

/// The seed list as entries.
pub fn seed_entries() -> impl Iterator<Item = VehicleSpec> {
    SEED_CATALOG
        .iter()
        .map(|&(model, cc, fuel, weight, drag)| VehicleSpec::new(model, cc, fuel, weight, drag))
}

/// Parse a catalog JSON array.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or any entry fails validation.
pub fn parse_catalog(json: &str) -> Result<Vec<VehicleSpec>> {
    let entries: Vec<VehicleSpec> = serde_json::from_str(json)?;
    for entry in &entries {
        entry.validate()?;
    }
    Ok(entries)
}
