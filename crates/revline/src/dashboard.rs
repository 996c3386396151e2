//! Plain-text dashboard.

use std::fmt::Write as _;

use crate::config::DisplayConfig;
use crate::gauges::{
    leaderboard_label, rpm_indicator, stability_indicator, Indicator, ShiftLight, ShiftZone,
    StressPoint, TraceBuffer,
};
use crate::poller::Frame;
use crate::sample::Metrics;
use crate::telemetry::fuel_map::{LOAD_BINS, LOAD_STEP, RPM_BINS};
use crate::telemetry::FuelMap;

/// Shades from cold to hot.
const SHADES: &[u8] = b" .:-=+*#%@";

const SHIFT_BAR_WIDTH: usize = 20;

/// Renders frames as text, keeping the little history the gauges need.
#[derive(Debug, Clone)]
pub struct Dashboard {
    display: DisplayConfig,
    rpm_trace: TraceBuffer,
    peak_torque: f64,
    ghost: Option<Metrics>,
}

impl Dashboard {
    /// Create a dashboard with the given thresholds.
    #[must_use]
    pub fn new(display: DisplayConfig) -> Self {
        let rpm_trace = TraceBuffer::new(TraceBuffer::DEFAULT_CAPACITY, display.shift_max_rpm);
        Self {
            display,
            rpm_trace,
            peak_torque: 0.0,
            ghost: None,
        }
    }

    /// Remember the latest ghost frame for the comparison row.
    pub fn set_ghost(&mut self, metrics: Metrics) {
        self.ghost = Some(metrics);
    }

    /// Record a frame and render it.
    pub fn render(&mut self, frame: &Frame) -> String {
        let m = &frame.metrics;
        self.rpm_trace.push(m.rpm);
        self.peak_torque = self.peak_torque.max(m.torque);

        let rpm_mark = marker(rpm_indicator(m.rpm, m.coolant, &self.display));
        let stability_mark = marker(stability_indicator(m.stability, &self.display));

        let rows = [
            ("RPM", m.rpm, rpm_mark, "Speed", m.speed, ""),
            ("HP", m.hp, "", "Torque Nm", m.torque, ""),
            ("VE %", m.ve, "", "Fuel L/h", m.fuel_rate, ""),
            ("Coolant C", m.coolant, "", "Load %", m.load, ""),
            ("Total Fuel", m.fuel_total, "", "Stability", m.stability, stability_mark),
        ];

        let mut out = String::new();
        for (left, lv, lm, right, rv, rm) in rows {
            let _ = writeln!(out, "{left:<11}{lv:>9.1} {lm:<3} {right:<11}{rv:>9.1} {rm}");
        }

        let _ = writeln!(
            out,
            "L/100km    {:>9.1}     hp/t       {:>9.1}",
            frame.extras.l_100km, frame.extras.hp_per_tonne
        );

        let shift = ShiftLight::new(m.rpm, self.display.shift_max_rpm);
        let _ = writeln!(out, "Shift      {}", shift_bar(shift));

        let torque_pct = if self.peak_torque > 0.0 {
            m.torque / self.peak_torque * 100.0
        } else {
            0.0
        };
        let stress = StressPoint::new(m.load, torque_pct);
        let _ = writeln!(
            out,
            "Stress     load {:>3.0}%  torque {:>3.0}%",
            stress.x * 100.0,
            stress.y * 100.0
        );

        if self.rpm_trace.is_drawable() {
            let _ = writeln!(out, "RPM trace  {}", self.rpm_trace.sparkline());
        }

        let _ = writeln!(out, "{}", leaderboard_label(&frame.leaderboard));

        if let Some(ghost) = &self.ghost {
            let _ = writeln!(
                out,
                "Ghost      speed {:>6.1} ({:+.1})  rpm {:>7.1} ({:+.1})",
                ghost.speed,
                m.speed - ghost.speed,
                ghost.rpm,
                m.rpm - ghost.rpm
            );
        }
        out
    }
}

fn marker(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::Ok => "",
        Indicator::Alert => "(!)",
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn shift_bar(shift: ShiftLight) -> String {
    let filled = (shift.level * SHIFT_BAR_WIDTH as f64).round() as usize;
    let zone = match shift.zone {
        ShiftZone::Green => "green",
        ShiftZone::Yellow => "yellow",
        ShiftZone::Red => "RED",
    };
    format!(
        "[{}{}] {zone}",
        "#".repeat(filled),
        ".".repeat(SHIFT_BAR_WIDTH - filled)
    )
}

/// Shaded text rendering of the fuel map, highest load at the top.
#[must_use]
pub fn render_heatmap(map: &FuelMap) -> String {
    let pixels = map.luminance();
    let mut out = String::new();
    for (row, cells) in pixels.chunks(RPM_BINS).enumerate() {
        let load = (LOAD_BINS - 1 - row) as f64 * LOAD_STEP;
        let _ = write!(out, "{load:>4.0}% |");
        out.extend(cells.iter().map(|&p| shade(p)));
        out.push('\n');
    }
    let _ = writeln!(out, "      +{}", "-".repeat(RPM_BINS));
    let _ = writeln!(out, "       0 rpm{:>width$}", "7500", width = RPM_BINS - 5);
    out
}

fn shade(pixel: u8) -> char {
    let index = usize::from(pixel) * SHADES.len() / 256;
    char::from(SHADES[index])
}
