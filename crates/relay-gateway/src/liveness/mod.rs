//! Liveness probe
//!
//! Periodically asks every session in every room to emit a ping. The probe
//! works on point-in-time member snapshots and never touches a transport, so
//! a dead peer only fails its own session's writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::room::RoomRegistry;

/// Counts from one probe pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Rooms visited
    pub rooms: usize,
    /// Sessions whose writer was signalled
    pub signalled: usize,
    /// Sessions already shutting down
    pub skipped: usize,
}

/// Periodic ping driver
#[derive(Debug, Clone)]
pub struct LivenessProbe {
    registry: Arc<RoomRegistry>,
    interval: Duration,
}

impl LivenessProbe {
    pub fn new(registry: Arc<RoomRegistry>, interval: Duration) -> Self {
        Self {
            registry,
            // A zero period would make tokio's interval panic
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Signal every current session once
    pub fn tick(&self) -> ProbeReport {
        let mut report = ProbeReport::default();

        for room in self.registry.rooms() {
            report.rooms += 1;
            for session in room.members_snapshot() {
                if session.ping() {
                    report.signalled += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }

        tracing::debug!(
            rooms = report.rooms,
            signalled = report.signalled,
            skipped = report.skipped,
            "Liveness probe tick"
        );

        report
    }

    /// Run until the registry shuts down
    pub async fn run(self) {
        let shutdown = self.registry.shutdown_token().clone();
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        tracing::info!("Liveness probe stopped");
    }

    /// Start the probe on the runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tracing::info!(interval_secs = self.interval.as_secs(), "Liveness probe started");
        tokio::spawn(self.run())
    }
}
