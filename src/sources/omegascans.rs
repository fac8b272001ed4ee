use crate::adapter::Adapter;
use crate::error::Result;
use crate::models::{AdapterId, ChapterEntry, Listing, TitleCard};
use crate::source_utils::{parse_cards, parse_chapters, parse_listing, SiteClient, SiteContext};
use async_trait::async_trait;

pub const ID: &str = "omegascans";
pub const BASE_URL: &str = "https://omegascans.com/";

const CARD_SELECTORS: &[&str] = &["div.manga-list div.manga-card", "div.manga-card"];
const IMAGE_ATTRS: &[&str] = &["src", "data-src"];
const CHAPTER_SELECTORS: &[&str] = &["li.chapter-item a"];

pub struct OmegaScans {
    site: SiteClient,
    page_size: usize,
}

impl OmegaScans {
    pub fn new(ctx: &SiteContext) -> Result<Self> {
        Self::with_base_url(ctx, BASE_URL)
    }

    pub fn with_base_url(ctx: &SiteContext, base_url: &str) -> Result<Self> {
        Ok(Self {
            site: SiteClient::new(ID, "OmegaScans", base_url, ctx)?,
            page_size: ctx.page_size,
        })
    }

    /// The search form always submits `s`, even when empty.
    pub fn search_url(&self, query: &str, page: usize) -> String {
        let mut url = self.site.base().clone();
        if page > 1 {
            url.set_path(&format!("{}page/{}/", self.site.base().path(), page));
        }
        url.query_pairs_mut().append_pair("s", query);
        url.to_string()
    }

    pub fn updates_url(&self) -> String {
        format!("{}latest-releases/", self.site.base_url())
    }

    pub fn parse_search(&self, html: &str) -> Result<Vec<TitleCard>> {
        parse_cards(html, CARD_SELECTORS, IMAGE_ATTRS, &self.site)
    }

    pub fn parse_chapters(&self, html: &str, parent: &TitleCard) -> Result<Vec<ChapterEntry>> {
        parse_chapters(html, CHAPTER_SELECTORS, parent)
    }

    pub fn parse_updates(&self, html: &str) -> Result<Listing> {
        parse_listing(html, "div.manga-item", &self.site)
    }
}

#[async_trait]
impl Adapter for OmegaScans {
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
        self.site
            .fetch_parsed(&url, "search results", |html| self.parse_search(html))
            .await
    }

    async fn fetch_chapters(&self, card: &TitleCard) -> Result<Vec<ChapterEntry>> {
        let html = self.site.get_html(&card.url).await?;
        self.parse_chapters(&html, card)
    }

    async fn latest_listing(&self) -> Listing {
        let url = self.updates_url();
        self.site
            .fetch_parsed(&url, "updates", |html| self.parse_updates(html))
            .await
    }
}
