use crate::adapter::Adapter;
use crate::detector::UpdateDetector;
use crate::error::Result;
use crate::models::Notification;
use crate::registry::AdapterRegistry;
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Default, Serialize, Clone)]
pub struct CheckSummary {
    pub started_at: i64,
    pub finished_at: i64,
    pub adapters_checked: usize,
    pub adapters_failed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub notifications: Vec<Notification>,
}

/// Periodically runs update detection over every registered adapter.
pub struct UpdateScheduler {
    registry: Arc<AdapterRegistry>,
    detector: UpdateDetector,
    interval: Duration,
    sink: Option<mpsc::Sender<Notification>>,
    last_run: Mutex<Option<CheckSummary>>,
}

impl UpdateScheduler {
    pub fn new(registry: Arc<AdapterRegistry>, detector: UpdateDetector, interval: Duration) -> Self {
        Self {
            registry,
            detector,
            interval,
            sink: None,
            last_run: Mutex::new(None),
        }
    }

    /// Deliver notifications to `sink` as they are produced.
    pub fn with_sink(mut self, sink: mpsc::Sender<Notification>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn last_summary(&self) -> Option<CheckSummary> {
        self.last_run.lock().ok().and_then(|s| s.clone())
    }

    async fn check_adapter(&self, adapter: &dyn Adapter) -> Result<(usize, usize, Vec<Notification>)> {
        let run = self.detector.check(adapter).await?;
        let notifications = self.detector.record(&run);
        Ok((run.result.updated.len(), run.result.unchanged.len(), notifications))
    }

    /// One pass over all adapters.
    ///
    /// A failing adapter, including one that panics, is logged and counted;
    /// the remaining adapters are still checked.
    pub async fn run_once(&self) -> CheckSummary {
        let mut summary = CheckSummary {
            started_at: Utc::now().timestamp(),
            ..CheckSummary::default()
        };

        for adapter in self.registry.adapters() {
            summary.adapters_checked += 1;
            let outcome = AssertUnwindSafe(self.check_adapter(adapter.as_ref()))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok((updated, unchanged, notifications))) => {
                    summary.updated += updated;
                    summary.unchanged += unchanged;
                    for notification in notifications {
                        self.deliver(&notification).await;
                        summary.notifications.push(notification);
                    }
                }
                Ok(Err(e)) => {
                    summary.adapters_failed += 1;
                    log::error!("[{}] Update check failed: {}", adapter.name(), e);
                }
                Err(_) => {
                    summary.adapters_failed += 1;
                    log::error!("[{}] Update check panicked", adapter.name());
                }
            }
        }

        summary.finished_at = Utc::now().timestamp();
        log::info!(
            "Update check finished: {} adapters, {} failed, {} updated, {} unchanged",
            summary.adapters_checked,
            summary.adapters_failed,
            summary.updated,
            summary.unchanged
        );
        if let Ok(mut last) = self.last_run.lock() {
            *last = Some(summary.clone());
        }
        summary
    }

    async fn deliver(&self, notification: &Notification) {
        if let Some(sink) = &self.sink {
            if sink.send(notification.clone()).await.is_err() {
                log::warn!("Notification receiver closed, dropping update for {}", notification.title_url);
            }
        }
    }

    /// Check forever, sleeping `interval` between passes.
    pub async fn run(self: Arc<Self>) {
        log::info!("Update scheduler started, interval {}s", self.interval.as_secs());
        loop {
            self.run_once().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
