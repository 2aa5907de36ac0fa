use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RuntimeConfig;
use crate::publish::{PublishEngine, ScanReport};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SchedulerConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(60),
        }
    }
}

impl From<&RuntimeConfig> for SchedulerConfig {
    fn from(runtime: &RuntimeConfig) -> Self {
        Self {
            initial_delay: runtime.initial_delay,
            interval: runtime.scan_interval,
        }
    }
}

/// Drives [`PublishEngine::scan_and_publish`] on a fixed period and on demand.
#[derive(Clone)]
pub struct SchedulerDriver {
    engine: Arc<PublishEngine>,
    config: SchedulerConfig,
    manual: Arc<Notify>,
}

impl SchedulerDriver {
    pub fn new(engine: Arc<PublishEngine>, config: SchedulerConfig) -> Self {
        Self {
            engine,
            config,
            manual: Arc::new(Notify::new()),
        }
    }

    /// Asks a running [`SchedulerDriver::run`] loop for an extra scan.
    pub fn trigger(&self) {
        self.manual.notify_one();
    }

    /// Runs one scan on the caller's task, outside the periodic loop.
    pub async fn trigger_now(&self) -> ScanReport {
        self.engine.scan_and_publish().await
    }

    /// Ticks until `shutdown` resolves, then waits for the in-flight scan.
    pub async fn run<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let first = Instant::now() + self.config.initial_delay;
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(first, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            initial_delay_ms = self.config.initial_delay.as_millis() as u64,
            interval_ms = self.config.interval.as_millis() as u64,
            "scheduler started"
        );

        let mut scans = JoinSet::new();
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
                _ = self.manual.notified() => {
                    tracing::info!("manual scan requested");
                }
            }

            while scans.try_join_next().is_some() {}
            let engine = Arc::clone(&self.engine);
            scans.spawn(async move {
                let report = engine.scan_and_publish().await;
                if report.was_skipped() {
                    tracing::debug!("tick dropped, previous scan still running");
                }
                report
            });
        }

        while let Some(result) = scans.join_next().await {
            match result {
                Ok(report) if !report.ok && !report.was_skipped() => {
                    tracing::warn!(error = ?report.error, "final scan did not complete cleanly");
                }
                Ok(_) => {}
                Err(error) => tracing::error!(error = %error, "scan task failed during shutdown"),
            }
        }
        tracing::info!("scheduler stopped");
    }
}
