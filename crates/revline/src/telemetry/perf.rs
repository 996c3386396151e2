//! 0-100 km/h timing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Speed band that arms the timer and the speed that stops it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchWindow {
    /// Lower bound of the launch band (exclusive), km/h.
    pub min_kmh: f64,
    /// Upper bound of the launch band (exclusive), km/h.
    pub max_kmh: f64,
    /// Speed that completes a run, km/h.
    pub target_kmh: f64,
}

impl Default for LaunchWindow {
    fn default() -> Self {
        Self {
            min_kmh: 2.0,
            max_kmh: 8.0,
            target_kmh: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TimerState {
    Idle,
    Running { started: DateTime<Utc> },
}

/// A finished run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletedRun {
    /// When the launch was detected.
    pub started: DateTime<Utc>,
    /// When the target speed was reached.
    pub finished: DateTime<Utc>,
    /// Elapsed time in seconds.
    pub seconds: f64,
}

/// Detects launches and times them to the target speed.
///
/// Timing uses reading timestamps, so replayed and simulated drives time the
/// same way live ones do.
#[derive(Debug, Clone)]
pub struct PerfTimer {
    window: LaunchWindow,
    state: TimerState,
}

impl PerfTimer {
    /// Create an idle timer.
    #[must_use]
    pub fn new(window: LaunchWindow) -> Self {
        Self {
            window,
            state: TimerState::Idle,
        }
    }

    /// True while a run is being timed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    /// Feed one speed sample; returns the run if this sample completed it.
    pub fn update(&mut self, speed: f64, at: DateTime<Utc>) -> Option<CompletedRun> {
        match self.state {
            TimerState::Idle => {
                if speed > self.window.min_kmh && speed < self.window.max_kmh {
                    debug!(speed, "Launch detected, timing run");
                    self.state = TimerState::Running { started: at };
                }
                None
            }
            TimerState::Running { started } => {
                if speed >= self.window.target_kmh {
                    self.state = TimerState::Idle;
                    let seconds = (at - started).num_microseconds().unwrap_or(i64::MAX) as f64
                        / 1_000_000.0;
                    if seconds <= 0.0 {
                        warn!(seconds, "Clock went backwards during run, discarding it");
                        return None;
                    }
                    info!(seconds, "Run completed");
                    Some(CompletedRun {
                        started,
                        finished: at,
                        seconds,
                    })
                } else {
                    if speed <= self.window.min_kmh {
                        debug!(speed, "Vehicle stopped before target, run abandoned");
                        self.state = TimerState::Idle;
                    }
                    None
                }
            }
        }
    }
}

impl Default for PerfTimer {
    fn default() -> Self {
        Self::new(LaunchWindow::default())
    }
}

/// Best run times, fastest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaderboard {
    times: Vec<f64>,
    capacity: usize,
}

impl Leaderboard {
    /// Create an empty board keeping `capacity` times.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            times: Vec::with_capacity(capacity + 1),
            capacity: capacity.max(1),
        }
    }

    /// Create a board pre-filled with earlier times.
    #[must_use]
    pub fn with_times(capacity: usize, times: impl IntoIterator<Item = f64>) -> Self {
        let mut board = Self::new(capacity);
        for seconds in times {
            board.insert(seconds);
        }
        board
    }

    /// Offer a time; returns its 1-based rank if it made the board.
    pub fn insert(&mut self, seconds: f64) -> Option<usize> {
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        let position = self.times.partition_point(|&t| t <= seconds);
        if position >= self.capacity {
            return None;
        }
        self.times.insert(position, seconds);
        self.times.truncate(self.capacity);
        Some(position + 1)
    }

    /// Times, fastest first.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The fastest time so far.
    #[must_use]
    pub fn best(&self) -> Option<f64> {
        self.times.first().copied()
    }

    /// True when no run has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::new(3)
    }
}
