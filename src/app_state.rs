//! Application state for the Actix-web server
//!
//! `AppState` is wrapped in `web::Data` and shared by every handler. All of
//! its members are thread-safe on their own, so handlers never lock the state
//! as a whole.

use crate::config::Config;
use crate::db::SubscriptionStore;
use crate::detector::UpdateDetector;
use crate::http_client::Fetch;
use crate::metrics::MetricsTracker;
use crate::models::Notification;
use crate::pager::ChapterPager;
use crate::registry::AdapterRegistry;
use crate::scheduler::UpdateScheduler;
use crate::source_utils::SiteContext;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct AppState {
    pub registry: Arc<AdapterRegistry>,
    pub store: Arc<dyn SubscriptionStore>,
    pub scheduler: Arc<UpdateScheduler>,
    /// Shared with every adapter, which record their fetches into it
    pub metrics: Arc<MetricsTracker>,
    pub pager: ChapterPager,
    pub config: Config,
}

impl AppState {
    /// Wire adapters, detector and scheduler from `config`.
    ///
    /// Notifications produced by update checks go to `sink` when given.
    pub fn build(
        config: Config,
        fetcher: Arc<dyn Fetch>,
        store: Arc<dyn SubscriptionStore>,
        sink: Option<mpsc::Sender<Notification>>,
    ) -> Self {
        let metrics = Arc::new(MetricsTracker::new());
        let ctx = SiteContext::new(fetcher)
            .with_page_size(config.paging.page_size)
            .with_metrics(metrics.clone());

        let registry = Arc::new(AdapterRegistry::from_config(&config.adapters, &ctx));
        let mut scheduler = UpdateScheduler::new(
            registry.clone(),
            UpdateDetector::new(store.clone()),
            config.check_interval(),
        );
        if let Some(sink) = sink {
            scheduler = scheduler.with_sink(sink);
        }

        Self {
            registry,
            store,
            scheduler: Arc::new(scheduler),
            metrics,
            pager: ChapterPager::new(config.paging.page_size),
            config,
        }
    }
}
