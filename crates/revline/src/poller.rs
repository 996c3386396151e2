//! Background polling of a telemetry source.
//!
//! The poller owns the source and the [`TelemetryBrain`]. It runs as one tokio
//! task and hands everything the dashboard needs over a bounded channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::sample::Metrics;
use crate::source::{SourceKind, TelemetrySource};
use crate::telemetry::brain::RankedRun;
use crate::telemetry::{Extras, FuelMap, TelemetryBrain};

/// Capacity of the event channel.
pub const CHANNEL_CAPACITY: usize = 64;

/// One frame ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// The derived metrics.
    pub metrics: Metrics,
    /// Economy and power-to-weight.
    pub extras: Extras,
    /// Current best run times, fastest first.
    pub leaderboard: Vec<f64>,
    /// Source of the frame, `None` for replayed logs.
    pub source: Option<SourceKind>,
}

/// Messages from a producer to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// A new frame.
    Frame(Frame),
    /// A 0-100 run just finished.
    RunCompleted(RankedRun),
    /// Snapshot of the fuel heat map.
    FuelMap(FuelMap),
    /// A frame from a recorded run played alongside the live one.
    Ghost(Metrics),
}

/// Stops a running poller from another task.
#[derive(Debug, Clone)]
pub struct PollerHandle {
    stop_signal: Arc<AtomicBool>,
}

impl PollerHandle {
    fn new() -> Self {
        Self {
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ask the poller to stop after the current tick.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

/// Polls a source at a fixed interval and feeds the brain.
pub struct Poller {
    source: Box<dyn TelemetrySource>,
    brain: TelemetryBrain,
    poll_interval: Duration,
    fuel_map_interval: Duration,
    handle: PollerHandle,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("source", &self.source.kind())
            .field("poll_interval", &self.poll_interval)
            .field("fuel_map_interval", &self.fuel_map_interval)
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Create a poller using the intervals from `config`.
    #[must_use]
    pub fn new(source: Box<dyn TelemetrySource>, brain: TelemetryBrain, config: &Config) -> Self {
        Self::with_intervals(
            source,
            brain,
            config.poll_interval(),
            config.fuel_map_interval(),
        )
    }

    /// Create a poller with explicit intervals.
    #[must_use]
    pub fn with_intervals(
        source: Box<dyn TelemetrySource>,
        brain: TelemetryBrain,
        poll_interval: Duration,
        fuel_map_interval: Duration,
    ) -> Self {
        Self {
            source,
            brain,
            poll_interval,
            fuel_map_interval,
            handle: PollerHandle::new(),
        }
    }

    /// A handle that stops this poller.
    #[must_use]
    pub fn handle(&self) -> PollerHandle {
        self.handle.clone()
    }

    /// Run on a new task.
    ///
    /// The task ends when stopped or when the receiver is dropped and returns
    /// the brain so the session's results can be saved.
    pub fn spawn(self) -> (PollerHandle, mpsc::Receiver<DashboardEvent>, JoinHandle<TelemetryBrain>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (handle, task) = self.spawn_with(tx);
        (handle, rx, task)
    }

    /// Run on a new task, sending into an existing channel.
    ///
    /// Lets other producers, such as a ghost replay, share the receiver.
    pub fn spawn_with(
        self,
        tx: mpsc::Sender<DashboardEvent>,
    ) -> (PollerHandle, JoinHandle<TelemetryBrain>) {
        let handle = self.handle();
        let task = tokio::spawn(self.run(tx));
        (handle, task)
    }

    /// Poll until stopped or the channel closes.
    pub async fn run(mut self, tx: mpsc::Sender<DashboardEvent>) -> TelemetryBrain {
        let kind = self.source.kind();
        debug!(
            source = %kind,
            interval_ms = self.poll_interval.as_millis(),
            "Starting poller"
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_poll = Instant::now();
        let mut last_map = Instant::now();
        let mut failing = false;

        while !self.handle.should_stop() {
            ticker.tick().await;
            let now = Instant::now();
            let dt = now - last_poll;
            last_poll = now;

            let result = if self.source.is_connected() {
                self.source.read().await
            } else {
                Err(Error::AdapterDisconnected)
            };
            let (metrics, completed) = match result {
                Ok(reading) => {
                    if failing {
                        info!(source = %kind, "Telemetry source recovered");
                        failing = false;
                    }
                    let tick = self.brain.update(&reading, dt);
                    (tick.metrics, tick.completed)
                }
                Err(e) => {
                    if failing {
                        debug!(error = %e, "Telemetry read failed");
                    } else {
                        warn!(error = %e, "Telemetry read failed, showing zeroed frames");
                        failing = true;
                    }
                    (Metrics::zeroed(Utc::now()), None)
                }
            };

            let frame = Frame {
                extras: self.brain.extras(&metrics),
                metrics,
                leaderboard: self.brain.leaderboard().times().to_vec(),
                source: Some(kind),
            };
            if tx.send(DashboardEvent::Frame(frame)).await.is_err() {
                debug!("Dashboard channel closed, stopping poller");
                break;
            }

            if let Some(ranked) = completed {
                if tx.send(DashboardEvent::RunCompleted(ranked)).await.is_err() {
                    break;
                }
            }

            if now - last_map >= self.fuel_map_interval {
                last_map = now;
                let snapshot = DashboardEvent::FuelMap(self.brain.fuel_map().clone());
                if tx.send(snapshot).await.is_err() {
                    break;
                }
            }
        }

        debug!("Poller stopped");
        self.brain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::config::TelemetryConfig;
    use crate::error::Result;
    use crate::sample::Reading;
    use crate::source::SimulatedSource;
    use crate::telemetry::VehicleProfile;

    /// An adapter whose link is down. Counts how often it is read anyway.
    #[derive(Default)]
    struct DeadSource {
        reads: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl TelemetrySource for DeadSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Adapter
        }

        fn is_connected(&self) -> bool {
            false
        }

        async fn read(&mut self) -> Result<Reading> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Err(Error::AdapterDisconnected)
        }
    }

    /// A connected adapter that never answers in time.
    struct SlowSource;

    #[async_trait::async_trait]
    impl TelemetrySource for SlowSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Adapter
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn read(&mut self) -> Result<Reading> {
            Err(Error::timeout("adapter response to 010C"))
        }
    }

    fn brain() -> TelemetryBrain {
        TelemetryBrain::new(VehicleProfile::default(), &TelemetryConfig::default())
    }

    fn poller(source: Box<dyn TelemetrySource>) -> Poller {
        Poller::with_intervals(
            source,
            brain(),
            Duration::from_millis(5),
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn test_frames_flow_from_simulated_source() {
        let (handle, mut rx, task) = poller(Box::new(SimulatedSource::new())).spawn();

        let mut frames = 0;
        let mut maps = 0;
        while frames < 10 || maps == 0 {
            match rx.recv().await.unwrap() {
                DashboardEvent::Frame(frame) => {
                    assert_eq!(frame.source, Some(SourceKind::Simulated));
                    assert!(frame.metrics.rpm > 0.0);
                    frames += 1;
                }
                DashboardEvent::FuelMap(_) => maps += 1,
                _ => {}
            }
        }

        handle.stop();
        drop(rx);
        let brain = task.await.unwrap();
        assert!(brain.fuel_map().peak() > 0.0);
    }

    #[tokio::test]
    async fn test_disconnected_source_yields_zeroed_frame() {
        crate::logging::init_test_logging();
        let source = DeadSource::default();
        let reads = Arc::clone(&source.reads);
        let (handle, mut rx, task) = poller(Box::new(source)).spawn();

        for _ in 0..3 {
            if let DashboardEvent::Frame(frame) = rx.recv().await.unwrap() {
                assert!(frame.metrics.rpm.abs() < f64::EPSILON);
                assert!(frame.metrics.temp_in.abs() < f64::EPSILON);
            }
        }

        handle.stop();
        drop(rx);
        task.await.unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_read_error_yields_zeroed_frame() {
        let (handle, mut rx, task) = poller(Box::new(SlowSource)).spawn();

        let mut frames = 0;
        while frames < 3 {
            if let DashboardEvent::Frame(frame) = rx.recv().await.unwrap() {
                assert!(frame.metrics.speed.abs() < f64::EPSILON);
                assert_eq!(frame.source, Some(SourceKind::Adapter));
                frames += 1;
            }
        }

        handle.stop();
        drop(rx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropping_receiver_stops_poller() {
        let (_handle, rx, task) = poller(Box::new(SimulatedSource::new())).spawn();
        drop(rx);
        let finished = tokio::time::timeout(Duration::from_secs(2), task).await;
        assert!(finished.is_ok());
    }

    #[test]
    fn test_handle_shares_stop_signal() {
        let poller = poller(Box::new(DeadSource::default()));
        let a = poller.handle();
        let b = poller.handle();
        assert!(!b.should_stop());
        a.stop();
        assert!(b.should_stop());
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = DashboardEvent::Ghost(Metrics::zeroed(Utc::now()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "ghost");
    }
}
