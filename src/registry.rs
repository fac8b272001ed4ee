//! Routing of title URLs to the adapter that owns them.

use crate::adapter::Adapter;
use crate::config::AdaptersConfig;
use crate::error::{Result, TrackerError};
use crate::models::{AdapterId, TitleCard};
use crate::source_utils::SiteContext;
use crate::sources;
use futures::future::join_all;
use std::sync::Arc;

/// Configured adapters in registration order.
///
/// Resolution returns the first adapter whose `owns` accepts the URL.
/// Overlapping domains are not rejected; the earlier registration wins.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[adapters]` section. Unknown names are logged and skipped.
    pub fn from_config(config: &AdaptersConfig, ctx: &SiteContext) -> Self {
        let mut registry = Self::new();
        for name in &config.enabled {
            match sources::build_adapter(name, ctx) {
                Ok(adapter) => {
                    if registry.get(adapter.id().as_str()).is_some() {
                        log::warn!("Adapter {} listed twice, keeping the first", adapter.id());
                        continue;
                    }
                    log::info!("Registered adapter {} ({})", adapter.name(), adapter.base_url());
                    registry.register(adapter);
                }
                Err(e) => log::error!("Skipping adapter {}: {}", name, e),
            }
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
        self.adapters.push(adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn resolve(&self, url: &str) -> Result<Arc<dyn Adapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.owns(url))
            .cloned()
            .ok_or_else(|| TrackerError::NoAdapterFound(url.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.id().as_str() == id)
            .cloned()
    }

    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Search every adapter concurrently, grouped by adapter in registration order.
    pub async fn search_all(&self, query: &str, page: usize) -> Vec<(AdapterId, Vec<TitleCard>)> {
        let searches = self.adapters.iter().map(|adapter| async move {
            (adapter.id().clone(), adapter.search(query, page).await)
        });
        join_all(searches).await
    }
}
