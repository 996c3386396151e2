//! Playback of recorded run logs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::poller::{DashboardEvent, Frame};
use crate::sample::Metrics;
use crate::telemetry::brain::RankedRun;
use crate::telemetry::{formulas, Extras, Leaderboard, PerfTimer};

/// Spacing of frames in a log at normal speed.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// A run log loaded into memory.
#[derive(Debug, Clone)]
pub struct Replayer {
    path: PathBuf,
    frames: Vec<Metrics>,
    skipped: usize,
    weight_kg: Option<u32>,
}

impl Replayer {
    /// Load a run log.
    ///
    /// Columns are matched by header name. Missing metric columns read as 0,
    /// a missing `temp_in` as 25 °C. Rows that cannot be parsed are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or has no header row.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        reader.headers()?;

        let mut frames = Vec::new();
        let mut skipped = 0;
        for (line, row) in reader.deserialize::<Metrics>().enumerate() {
            match row {
                Ok(metrics) => frames.push(metrics),
                Err(e) => {
                    debug!(row = line + 1, error = %e, "Skipping unreadable log row");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "Some log rows could not be read");
        }
        info!(path = %path.display(), frames = frames.len(), "Run log loaded");

        Ok(Self {
            path: path.to_path_buf(),
            frames,
            skipped,
            weight_kg: None,
        })
    }

    /// Weigh replayed frames against this vehicle for hp/t.
    #[must_use]
    pub fn with_vehicle_weight(mut self, weight_kg: u32) -> Self {
        self.weight_kg = Some(weight_kg);
        self
    }

    /// Path the log was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The loaded frames in order.
    #[must_use]
    pub fn frames(&self) -> &[Metrics] {
        &self.frames
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when the log held no usable rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Rows dropped while loading.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Fastest 0-100 times found in the log.
    #[must_use]
    pub fn best_runs(&self, capacity: usize) -> Leaderboard {
        let mut timer = PerfTimer::default();
        let mut board = Leaderboard::new(capacity);
        for frame in &self.frames {
            if let Some(run) = timer.update(frame.speed, frame.timestamp) {
                board.insert(run.seconds);
            }
        }
        board
    }

    /// Emit the log as dashboard frames, `speed` times faster than recorded.
    ///
    /// Runs completed in the log are announced as they are reached. Returns
    /// early if the receiver goes away.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible alongside the other producers.
    pub async fn play(&self, tx: mpsc::Sender<DashboardEvent>, speed: f64) -> Result<()> {
        let mut ticker = interval(frame_interval(speed));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut timer = PerfTimer::default();
        let mut board = Leaderboard::default();

        for metrics in &self.frames {
            ticker.tick().await;

            let completed = timer.update(metrics.speed, metrics.timestamp).map(|run| RankedRun {
                run,
                rank: board.insert(run.seconds),
            });
            let frame = Frame {
                metrics: metrics.clone(),
                extras: self.extras(metrics),
                leaderboard: board.times().to_vec(),
                source: None,
            };
            if tx.send(DashboardEvent::Frame(frame)).await.is_err() {
                debug!("Replay receiver closed");
                return Ok(());
            }
            if let Some(ranked) = completed {
                if tx.send(DashboardEvent::RunCompleted(ranked)).await.is_err() {
                    return Ok(());
                }
            }
        }

        debug!(frames = self.frames.len(), "Replay finished");
        Ok(())
    }

    /// Run logs hold no weight; hp/t is 0 until one is given.
    fn extras(&self, metrics: &Metrics) -> Extras {
        Extras {
            l_100km: formulas::litres_per_100km(metrics.fuel_rate, metrics.speed),
            hp_per_tonne: self.weight_kg.map_or(0.0, |kg| {
                formulas::hp_per_tonne(metrics.hp, f64::from(kg))
            }),
        }
    }

    /// Emit the log as ghost frames at recorded speed, next to a live session.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible alongside the other producers.
    pub async fn play_ghost(&self, tx: mpsc::Sender<DashboardEvent>) -> Result<()> {
        let mut ticker = interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for metrics in &self.frames {
            ticker.tick().await;
            if tx.send(DashboardEvent::Ghost(metrics.clone())).await.is_err() {
                break;
            }
        }
        debug!("Ghost run finished");
        Ok(())
    }
}

/// Time between frames at `speed`x. Non-positive or non-finite speeds play at 1x.
#[must_use]
pub fn frame_interval(speed: f64) -> Duration {
    if speed.is_finite() && speed > 0.0 {
        FRAME_INTERVAL.div_f64(speed)
    } else {
        FRAME_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_log(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "revline_replay_{}_{}.csv",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn full_log() -> String {
        let mut log = Metrics::HEADERS.join(",");
        log.push('\n');
        let speeds = [0.0, 5.0, 40.0, 80.0, 101.0, 90.0];
        for (i, speed) in speeds.iter().enumerate() {
            let ts = 1_700_000_000.0 + i as f64 * 2.0;
            log.push_str(&format!(
                "{ts},3000,{speed},60,140,80,9.5,88,55,0.01,1.2,30\n"
            ));
        }
        log
    }

    #[test]
    fn test_load_full_log() {
        let path = write_log("full", &full_log());
        let replay = Replayer::load(&path).unwrap();
        assert_eq!(replay.len(), 6);
        assert_eq!(replay.skipped(), 0);
        let first = &replay.frames()[0];
        assert!((first.rpm - 3000.0).abs() < f64::EPSILON);
        assert!((first.temp_in - 30.0).abs() < f64::EPSILON);
        assert_eq!(first.timestamp.timestamp(), 1_700_000_000);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_fills_missing_columns() {
        let path = write_log("partial", "timestamp,speed,rpm\n1700000000.0,12,1500\n");
        let replay = Replayer::load(&path).unwrap();
        let frame = &replay.frames()[0];
        assert!((frame.speed - 12.0).abs() < f64::EPSILON);
        assert!(frame.hp.abs() < f64::EPSILON);
        assert!((frame.temp_in - 25.0).abs() < f64::EPSILON);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_skips_bad_rows() {
        let path = write_log(
            "bad",
            "timestamp,rpm\n1700000000.0,900\n1700000000.1,lots\n1700000000.2,950\n",
        );
        let replay = Replayer::load(&path).unwrap();
        assert_eq!(replay.len(), 2);
        assert_eq!(replay.skipped(), 1);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let result = Replayer::load("/nonexistent/revline/run.csv");
        assert!(result.is_err());
    }

    #[test]
    fn test_best_runs_from_log() {
        let path = write_log("best", &full_log());
        let replay = Replayer::load(&path).unwrap();
        // Launch at 5 km/h (t=2), 101 km/h at t=8
        assert_eq!(replay.best_runs(3).times(), &[6.0]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_extras_without_weight() {
        let path = write_log("noweight", &full_log());
        let replay = Replayer::load(&path).unwrap();
        let extras = replay.extras(&replay.frames()[2]);
        assert!(extras.hp_per_tonne.abs() < f64::EPSILON);
        // 9.5 L/h at 40 km/h
        assert!((extras.l_100km - 23.75).abs() < 1e-9);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(frame_interval(1.0), Duration::from_millis(100));
        assert_eq!(frame_interval(4.0), Duration::from_millis(25));
        assert_eq!(frame_interval(0.0), FRAME_INTERVAL);
        assert_eq!(frame_interval(f64::NAN), FRAME_INTERVAL);
    }

    #[tokio::test]
    async fn test_play_emits_frames_and_runs() {
        let path = write_log("play", &full_log());
        let replay = Replayer::load(&path).unwrap().with_vehicle_weight(1200);
        let (tx, mut rx) = mpsc::channel(64);

        replay.play(tx, 50.0).await.unwrap();

        let mut frames = 0;
        let mut runs = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                DashboardEvent::Frame(frame) => {
                    assert!(frame.source.is_none());
                    // 60 hp over 1.2 t
                    assert!((frame.extras.hp_per_tonne - 50.0).abs() < 1e-9);
                    frames += 1;
                }
                DashboardEvent::RunCompleted(ranked) => runs.push(ranked),
                _ => {}
            }
        }
        assert_eq!(frames, 6);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].rank, Some(1));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_ghost_frames() {
        let path = write_log("ghost", "timestamp,rpm\n1700000000.0,900\n1700000000.1,950\n");
        let replay = Replayer::load(&path).unwrap();
        let (tx, mut rx) = mpsc::channel(64);

        replay.play_ghost(tx).await.unwrap();

        let mut ghosts = 0;
        while let Some(event) = rx.recv().await {
            assert!(matches!(event, DashboardEvent::Ghost(_)));
            ghosts += 1;
        }
        assert_eq!(ghosts, 2);
        std::fs::remove_file(path).ok();
    }
}
