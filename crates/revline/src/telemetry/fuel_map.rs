//! Fuel rate heat map over RPM and engine load.

use std::io::Write;

use serde::Serialize;

/// Width of an RPM bin.
pub const RPM_STEP: f64 = 250.0;

/// Last RPM bin edge.
pub const RPM_MAX: f64 = 7500.0;

/// Width of a load bin, %.
pub const LOAD_STEP: f64 = 5.0;

/// Last load bin edge, %.
pub const LOAD_MAX: f64 = 100.0;

/// Number of RPM bins (0, 250, ..., 7500).
pub const RPM_BINS: usize = 31;

/// Number of load bins (0, 5, ..., 100).
pub const LOAD_BINS: usize = 21;

const NORMALIZE_EPSILON: f64 = 1e-6;

/// Latest fuel rate seen in each (load, RPM) cell.
///
/// Cells are overwritten, not averaged: the map shows where the engine has
/// been and what it burned there most recently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuelMap {
    cells: Vec<f64>,
}

impl FuelMap {
    /// An all-zero map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![0.0; LOAD_BINS * RPM_BINS],
        }
    }

    /// Record `fuel_rate` in the cell for `rpm` and `load`.
    ///
    /// Returns the `(load_index, rpm_index)` written, or `None` when either
    /// value is negative or not a number.
    pub fn record(&mut self, rpm: f64, load: f64, fuel_rate: f64) -> Option<(usize, usize)> {
        let rpm_index = bin_index(rpm, RPM_STEP, RPM_BINS)?;
        let load_index = bin_index(load, LOAD_STEP, LOAD_BINS)?;
        self.cells[load_index * RPM_BINS + rpm_index] = fuel_rate;
        Some((load_index, rpm_index))
    }

    /// Value of one cell.
    #[must_use]
    pub fn cell(&self, load_index: usize, rpm_index: usize) -> Option<f64> {
        if load_index >= LOAD_BINS || rpm_index >= RPM_BINS {
            return None;
        }
        Some(self.cells[load_index * RPM_BINS + rpm_index])
    }

    /// Largest recorded fuel rate.
    #[must_use]
    pub fn peak(&self) -> f64 {
        self.cells.iter().copied().fold(f64::MIN, f64::max)
    }

    /// Map `(width, height)` in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (usize, usize) {
        (RPM_BINS, LOAD_BINS)
    }

    /// Min/max normalised 8-bit luminance, highest load row first.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn luminance(&self) -> Vec<u8> {
        let min = self.cells.iter().copied().fold(f64::MAX, f64::min);
        let max = self.peak();
        let range = max - min + NORMALIZE_EPSILON;

        let mut pixels = Vec::with_capacity(self.cells.len());
        for row in self.cells.chunks(RPM_BINS).rev() {
            pixels.extend(row.iter().map(|v| ((v - min) / range * 255.0) as u8));
        }
        pixels
    }

    /// Encode the luminance buffer as a binary PGM image.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub fn write_pgm(&self, mut out: impl Write) -> std::io::Result<()> {
        write!(out, "P5\n{RPM_BINS} {LOAD_BINS}\n255\n")?;
        out.write_all(&self.luminance())?;
        out.flush()
    }

    /// The PGM image as bytes.
    #[must_use]
    pub fn to_pgm(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_pgm(&mut bytes);
        bytes
    }
}

impl Default for FuelMap {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn bin_index(value: f64, step: f64, bins: usize) -> Option<usize> {
    if value.is_nan() || value < 0.0 {
        return None;
    }
    let index = (value / step).floor();
    if index >= (bins - 1) as f64 {
        Some(bins - 1)
    } else {
        Some(index as usize)
    }
}
