//! Presentation models for the dashboard gauges.
//!
//! These hold the state and thresholds a renderer needs; the text dashboard is
//! one such renderer.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::DisplayConfig;

/// Two-state colouring used by value labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Within limits (green).
    Ok,
    /// Over a limit (red).
    Alert,
}

/// RPM warning threshold for the given coolant temperature.
///
/// A cold engine gets a lower limit.
#[must_use]
pub fn rpm_limit(coolant: f64, display: &DisplayConfig) -> f64 {
    if coolant > display.warm_coolant_c {
        display.redline_warm_rpm
    } else {
        display.redline_cold_rpm
    }
}

/// Indicator for the RPM readout.
#[must_use]
pub fn rpm_indicator(rpm: f64, coolant: f64, display: &DisplayConfig) -> Indicator {
    if rpm > rpm_limit(coolant, display) {
        Indicator::Alert
    } else {
        Indicator::Ok
    }
}

/// Indicator for the fuel trim stability readout.
#[must_use]
pub fn stability_indicator(stability: f64, display: &DisplayConfig) -> Indicator {
    if stability < display.stability_alert {
        Indicator::Ok
    } else {
        Indicator::Alert
    }
}

/// Leaderboard caption, e.g. `0-100: 6.42s, 7.10s`.
#[must_use]
pub fn leaderboard_label(times: &[f64]) -> String {
    if times.is_empty() {
        return "0-100: N/A".to_string();
    }
    let joined = times
        .iter()
        .map(|t| format!("{t:.2}s"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("0-100: {joined}")
}

/// Colour band of the shift light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftZone {
    /// Below 70 % of full scale.
    Green,
    /// 70 % to 90 %.
    Yellow,
    /// 90 % and above.
    Red,
}

/// Vertical bar filling with RPM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShiftLight {
    /// Fill level, 0 to 1.
    pub level: f64,
    /// Colour band for `level`.
    pub zone: ShiftZone,
}

impl ShiftLight {
    /// Shift light state for `rpm` against a full scale of `max_rpm`.
    #[must_use]
    pub fn new(rpm: f64, max_rpm: f64) -> Self {
        let level = if max_rpm > 0.0 {
            (rpm / max_rpm).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let zone = if level < 0.7 {
            ShiftZone::Green
        } else if level < 0.9 {
            ShiftZone::Yellow
        } else {
            ShiftZone::Red
        };
        Self { level, zone }
    }
}

/// Operating point on the load/torque plane, both axes 0 to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressPoint {
    /// Engine load fraction.
    pub x: f64,
    /// Torque fraction.
    pub y: f64,
}

impl StressPoint {
    /// Place the dot for `load` % and `torque_pct` % of peak torque.
    #[must_use]
    pub fn new(load: f64, torque_pct: f64) -> Self {
        Self {
            x: (load / 100.0).clamp(0.0, 1.0),
            y: (torque_pct / 100.0).clamp(0.0, 1.0),
        }
    }
}

/// Rolling history for a line graph, values normalised by a full scale.
#[derive(Debug, Clone)]
pub struct TraceBuffer {
    points: VecDeque<f64>,
    capacity: usize,
    full_scale: f64,
}

impl TraceBuffer {
    /// Points shown by default.
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Create a buffer showing `capacity` points against `full_scale`.
    #[must_use]
    pub fn new(capacity: usize, full_scale: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            full_scale,
        }
    }

    /// Append a value.
    pub fn push(&mut self, value: f64) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        let normalized = if self.full_scale > 0.0 {
            value / self.full_scale
        } else {
            0.0
        };
        self.points.push_back(normalized);
    }

    /// Normalised points, oldest first.
    pub fn points(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().copied()
    }

    /// Number of points held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A line needs at least two points.
    #[must_use]
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= 2
    }

    /// One-line sparkline of the buffer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn sparkline(&self) -> String {
        const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        self.points
            .iter()
            .map(|p| BARS[((p.clamp(0.0, 1.0) * 7.0).round()) as usize])
            .collect()
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, 7000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpm_limit_depends_on_coolant() {
        let display = DisplayConfig::default();
        assert!((rpm_limit(60.0, &display) - 3500.0).abs() < f64::EPSILON);
        assert!((rpm_limit(75.0, &display) - 3500.0).abs() < f64::EPSILON);
        assert!((rpm_limit(90.0, &display) - 6000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rpm_indicator() {
        let display = DisplayConfig::default();
        assert_eq!(rpm_indicator(4000.0, 40.0, &display), Indicator::Alert);
        assert_eq!(rpm_indicator(4000.0, 90.0, &display), Indicator::Ok);
        assert_eq!(rpm_indicator(6500.0, 90.0, &display), Indicator::Alert);
    }

    #[test]
    fn test_stability_indicator() {
        let display = DisplayConfig::default();
        assert_eq!(stability_indicator(1.0, &display), Indicator::Ok);
        assert_eq!(stability_indicator(2.5, &display), Indicator::Alert);
    }

    #[test]
    fn test_leaderboard_label() {
        assert_eq!(leaderboard_label(&[]), "0-100: N/A");
        assert_eq!(leaderboard_label(&[6.421, 7.1]), "0-100: 6.42s, 7.10s");
    }

    #[test]
    fn test_shift_light_zones() {
        assert_eq!(ShiftLight::new(3000.0, 7000.0).zone, ShiftZone::Green);
        assert_eq!(ShiftLight::new(5600.0, 7000.0).zone, ShiftZone::Yellow);
        assert_eq!(ShiftLight::new(6300.0, 7000.0).zone, ShiftZone::Red);
    }

    #[test]
    fn test_shift_light_level_clamped() {
        assert!((ShiftLight::new(9000.0, 7000.0).level - 1.0).abs() < f64::EPSILON);
        assert!(ShiftLight::new(-10.0, 7000.0).level.abs() < f64::EPSILON);
        assert!(ShiftLight::new(1000.0, 0.0).level.abs() < f64::EPSILON);
    }

    #[test]
    fn test_stress_point() {
        let point = StressPoint::new(50.0, 120.0);
        assert!((point.x - 0.5).abs() < f64::EPSILON);
        assert!((point.y - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_trace_buffer_rolls() {
        let mut trace = TraceBuffer::new(50, 7000.0);
        for i in 0..60 {
            trace.push(f64::from(i) * 100.0);
        }
        assert_eq!(trace.len(), 50);
        let first = trace.points().next().unwrap();
        assert!((first - 1000.0 / 7000.0).abs() < 1e-12);
    }

    #[test]
    fn test_trace_buffer_drawable() {
        let mut trace = TraceBuffer::default();
        assert!(trace.is_empty());
        trace.push(1.0);
        assert!(!trace.is_drawable());
        trace.push(2.0);
        assert!(trace.is_drawable());
    }

    #[test]
    fn test_sparkline() {
        let mut trace = TraceBuffer::new(3, 100.0);
        trace.push(0.0);
        trace.push(50.0);
        trace.push(100.0);
        assert_eq!(trace.sparkline(), "▁▅█");
    }
}
