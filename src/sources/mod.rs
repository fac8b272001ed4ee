use crate::adapter::Adapter;
use crate::error::{Result, TrackerError};
use crate::source_utils::SiteContext;
use std::sync::Arc;

pub mod manhuafast;
pub mod omegascans;

// Base WP-Manga implementation
pub mod wp_manga;

pub use manhuafast::ManhuaFast;
pub use omegascans::OmegaScans;

/// Names accepted in `[adapters] enabled`.
pub const AVAILABLE: &[&str] = &[manhuafast::ID, omegascans::ID];

/// Build an adapter by configuration name.
pub fn build_adapter(name: &str, ctx: &SiteContext) -> Result<Arc<dyn Adapter>> {
    match name.to_lowercase().as_str() {
        manhuafast::ID | "manhua-fast" => Ok(Arc::new(ManhuaFast::new(ctx)?)),
        omegascans::ID | "omegascan" | "omega-scans" => Ok(Arc::new(OmegaScans::new(ctx)?)),
        other => Err(TrackerError::Config(format!(
            "unknown adapter '{}', expected one of {:?}",
            other, AVAILABLE
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::StaticFetcher;

    #[test]
    fn test_build_adapter_by_name() {
        let ctx = SiteContext::new(Arc::new(StaticFetcher::new()));
        assert_eq!(build_adapter("ManhuaFast", &ctx).unwrap().id().as_str(), "manhuafast");
        assert_eq!(build_adapter("omega-scans", &ctx).unwrap().id().as_str(), "omegascans");
        assert!(matches!(build_adapter("mangadex", &ctx), Err(TrackerError::Config(_))));
    }
}
