//! Heartbeat worker: a monitored background task that confirms it is
//! alive on every tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use vitals_core::{MonitoredService, WorkerContext};

pub struct Heartbeat {
    interval: Duration,
    beats: AtomicU64,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            beats: AtomicU64::new(0),
        }
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }
}

impl MonitoredService for Heartbeat {
    async fn on_execute(&self, mut ctx: WorkerContext) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let beat = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
                    ctx.report_running();
                    debug!(service = ctx.service_name(), beat, "heartbeat");
                }
                _ = ctx.stopped() => break,
            }
        }
        Ok(())
    }
}
