use crate::adapter::Adapter;
use crate::error::Result;
use crate::models::{AdapterId, ChapterEntry, Listing, TitleCard};
use crate::source_utils::{parse_cards, parse_listing, SiteClient, SiteContext};
use crate::sources::wp_manga;
use async_trait::async_trait;

pub const ID: &str = "manhuafast";
pub const BASE_URL: &str = "https://manhuafast.net/";

/// ManhuaFast, a Madara-themed site. The home page slider doubles as its
/// updates feed.
pub struct ManhuaFast {
    site: SiteClient,
    page_size: usize,
}

impl ManhuaFast {
    pub fn new(ctx: &SiteContext) -> Result<Self> {
        Self::with_base_url(ctx, BASE_URL)
    }

    /// Point the adapter at a mirror.
    pub fn with_base_url(ctx: &SiteContext, base_url: &str) -> Result<Self> {
        Ok(Self {
            site: SiteClient::new(ID, "ManhuaFast", base_url, ctx)?,
            page_size: ctx.page_size,
        })
    }

    pub fn search_url(&self, query: &str, page: usize) -> String {
        wp_manga::search_url(self.site.base(), query, page.max(1))
    }

    pub fn updates_url(&self) -> &str {
        self.site.base_url()
    }

    pub fn parse_search(&self, html: &str) -> Result<Vec<TitleCard>> {
        parse_cards(html, wp_manga::CARD_SELECTORS, wp_manga::IMAGE_ATTRS, &self.site)
    }

    pub fn parse_updates(&self, html: &str) -> Result<Listing> {
        parse_listing(html, "div.slider__content", &self.site)
    }
}

#[async_trait]
impl Adapter for ManhuaFast {
    fn id(&self) -> &AdapterId {
        self.site.id()
    }

    fn name(&self) -> &str {
        self.site.name()
    }

    fn base_url(&self) -> &str {
        self.site.base_url()
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn search(&self, query: &str, page: usize) -> Vec<TitleCard> {
        let url = self.search_url(query, page);
        let cards = self
            .site
            .fetch_parsed(&url, "search results", |html| self.parse_search(html))
            .await;
        log::info!("[{}] Fetched {} mangas from page.", self.name(), cards.len());
        cards
    }

    async fn fetch_chapters(&self, card: &TitleCard) -> Result<Vec<ChapterEntry>> {
        wp_manga::fetch_chapters(&self.site, card).await
    }

    async fn latest_listing(&self) -> Listing {
        let listing = self
            .site
            .fetch_parsed(self.updates_url(), "updates", |html| self.parse_updates(html))
            .await;
        log::info!("[{}] Fetched {} manga updates.", self.name(), listing.len());
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::StaticFetcher;
    use std::sync::Arc;

    fn adapter() -> ManhuaFast {
        ManhuaFast::new(&SiteContext::new(Arc::new(StaticFetcher::new()))).unwrap()
    }

    #[test]
    fn test_parse_search_cards() {
        let html = r#"
            <div class="c-tabs-item__content">
              <div class="tab-thumb c-image-hover">
                <a href="https://manhuafast.net/manga/martial-peak/" title="Martial Peak">
                  <img data-src="https://manhuafast.net/covers/mp.jpg" src="placeholder.gif">
                </a>
              </div>
              <div class="tab-thumb c-image-hover">
                <a title="Broken card without href"><img data-src="x.jpg"></a>
              </div>
              <div class="tab-thumb c-image-hover">
                <a href="https://manhuafast.net/manga/no-cover/" title="No Cover"></a>
              </div>
            </div>
        "#;
        let cards = adapter().parse_search(html).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "Martial Peak");
        assert_eq!(cards[0].cover_image_url, "https://manhuafast.net/covers/mp.jpg");
        assert_eq!(cards[0].source.as_str(), ID);
        assert_eq!(cards[1].title, "No Cover");
    }

    #[test]
    fn test_parse_updates_slider() {
        let html = r#"
            <div class="slider__content">
              <div class="slider__content_item">
                <a href="/manga/martial-peak/">Martial Peak</a>
                <div class="chapter-item"><a href="/manga/martial-peak/chapter-3700/">Chapter 3700</a></div>
              </div>
            </div>
            <div class="slider__content">
              <a href="https://manhuafast.net/manga/tales-of-demons/">Tales</a>
              <a href="https://manhuafast.net/manga/tales-of-demons/chapter-480/">Chapter 480</a>
            </div>
        "#;
        let listing = adapter().parse_updates(html).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(
            listing["https://manhuafast.net/manga/martial-peak/"],
            "https://manhuafast.net/manga/martial-peak/chapter-3700/"
        );
    }

    #[test]
    fn test_search_url_clamps_page() {
        assert_eq!(adapter().search_url("", 0), "https://manhuafast.net/");
    }

    #[test]
    fn test_owns() {
        let a = adapter();
        assert!(a.owns("https://manhuafast.net/manga/martial-peak/"));
        assert!(!a.owns("https://omegascans.com/series/x"));
    }
}
