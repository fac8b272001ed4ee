//! Shared plumbing for site adapters.
//!
//! [`SiteClient`] wraps the fetch primitive with a site's base URL, headers and
//! metrics. The `parse_*` functions turn raw markup into model objects and
//! skip individual malformed entries instead of failing the whole page.
//!
//! Parsing is synchronous: `scraper::Html` is not `Send`, so a document must
//! never live across an `.await`.

use crate::error::{Result, TrackerError};
use crate::http_client::Fetch;
use crate::metrics::MetricsTracker;
use crate::models::{AdapterId, ChapterEntry, Listing, TitleCard};
use crate::pager::DEFAULT_PAGE_SIZE;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Desktop Firefox UA the sites accept without a challenge page.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:97.0) Gecko/20100101 Firefox/97.0";

/// Resources shared by every adapter built from one configuration.
#[derive(Clone)]
pub struct SiteContext {
    pub fetcher: Arc<dyn Fetch>,
    pub metrics: Arc<MetricsTracker>,
    pub page_size: usize,
}

impl SiteContext {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            metrics: Arc::new(MetricsTracker::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsTracker>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Per-site view over the fetch primitive.
pub struct SiteClient {
    id: AdapterId,
    name: String,
    base: Url,
    headers: HeaderMap,
    fetcher: Arc<dyn Fetch>,
    metrics: Arc<MetricsTracker>,
}

impl SiteClient {
    pub fn new(id: &str, name: &str, base_url: &str, ctx: &SiteContext) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| TrackerError::Config(format!("invalid base url {}: {}", base_url, e)))?;
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        Ok(Self {
            id: AdapterId::new(id),
            name: name.to_string(),
            base,
            headers,
            fetcher: Arc::clone(&ctx.fetcher),
            metrics: Arc::clone(&ctx.metrics),
        })
    }

    pub fn id(&self) -> &AdapterId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Lexical ownership check against the canonical base URL.
    pub fn owns(&self, url: &str) -> bool {
        url.starts_with(self.base.as_str())
    }

    /// Resolve a possibly relative href against the site root.
    pub fn absolutize(&self, href: &str) -> Option<String> {
        resolve_href(self.base.as_str(), href)
    }

    pub async fn get_html(&self, url: &str) -> Result<String> {
        let started = Instant::now();
        let result = self.fetcher.get_url(url, &self.headers).await;
        self.finish(started, result)
    }

    pub async fn post_html(&self, url: &str, form: &[(&str, &str)]) -> Result<String> {
        let started = Instant::now();
        let result = self.fetcher.post_form(url, &self.headers, form).await;
        self.finish(started, result)
    }

    fn finish(&self, started: Instant, result: Result<Vec<u8>>) -> Result<String> {
        match result {
            Ok(body) => {
                self.metrics.record_success(self.id.as_str(), started.elapsed());
                Ok(String::from_utf8_lossy(&body).into_owned())
            }
            Err(e) => {
                self.metrics.record_failure(self.id.as_str(), &e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch `url` and parse it, degrading to `T::default()` on any failure.
    pub async fn fetch_parsed<T, F>(&self, url: &str, what: &str, parse: F) -> T
    where
        T: Default,
        F: FnOnce(&str) -> Result<T> + Send,
    {
        let html = match self.get_html(url).await {
            Ok(html) => html,
            Err(e) => {
                log::error!("[{}] Error fetching {} from {}: {}", self.name, what, url, e);
                return T::default();
            }
        };
        match parse(&html) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::error!("[{}] Error parsing {} from {}: {}", self.name, what, url, e);
                T::default()
            }
        }
    }
}

pub fn resolve_href(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .ok()
}

pub fn select(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| TrackerError::Parse(format!("invalid selector {}: {:?}", css, e)))
}

/// Element text with whitespace runs collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a listing title, rejecting ones with nothing readable left.
pub fn clean_title(raw: &str) -> Option<String> {
    let cleaned = normalize_whitespace(raw);
    if cleaned.is_empty() || cleaned.chars().all(|c| !c.is_alphanumeric()) {
        return None;
    }
    Some(cleaned)
}

fn chapter_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"chapter[-/_](\d+(?:[.-]\d+)?)").expect("valid chapter regex"))
}

/// Label for a chapter link, falling back to the number in its URL.
pub fn derive_chapter_label(text: &str, href: &str) -> String {
    let t = normalize_whitespace(text);
    if !t.is_empty() && t != "#" {
        return t;
    }
    let lower = href.to_lowercase();
    if let Some(cap) = chapter_number_re().captures(&lower) {
        return format!("Chapter {}", cap[1].replace('-', "."));
    }
    href.trim().to_string()
}

/// Parse title cards. The first selector that matches anything wins.
///
/// A card without a link or readable title is skipped. A card without an
/// image keeps an empty cover URL; relative covers are made absolute.
pub fn parse_cards(
    html: &str,
    card_selectors: &[&str],
    image_attrs: &[&str],
    site: &SiteClient,
) -> Result<Vec<TitleCard>> {
    let document = Html::parse_document(html);
    let link_sel = select("a[href]")?;
    let img_sel = select("img")?;

    for css in card_selectors {
        let card_sel = select(css)?;
        let mut cards = Vec::new();
        let mut skipped = 0usize;

        for element in document.select(&card_sel) {
            match parse_card(element, &link_sel, &img_sel, image_attrs, site) {
                Some(card) => cards.push(card),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("[{}] Skipped {} malformed cards ({})", site.name(), skipped, css);
        }
        if !cards.is_empty() || skipped > 0 {
            log::info!("[{}] Parsed {} cards using selector: {}", site.name(), cards.len(), css);
            return Ok(cards);
        }
    }
    Ok(Vec::new())
}

fn parse_card(
    element: ElementRef<'_>,
    link_sel: &Selector,
    img_sel: &Selector,
    image_attrs: &[&str],
    site: &SiteClient,
) -> Option<TitleCard> {
    let link = element.select(link_sel).next()?;
    let url = site.absolutize(link.value().attr("href")?)?;
    let raw_title = link
        .value()
        .attr("title")
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| element_text(link));
    let title = clean_title(&raw_title)?;

    let cover = element
        .select(img_sel)
        .next()
        .and_then(|img| image_attrs.iter().find_map(|attr| img.value().attr(attr)))
        .map(|src| site.absolutize(src).unwrap_or_else(|| src.trim().to_string()))
        .unwrap_or_default();
    if cover.is_empty() {
        log::debug!("[{}] Card without cover image: {}", site.name(), url);
    }

    Some(TitleCard::new(site.id().clone(), title, url, cover))
}

/// Parse chapter links in source order, dropping repeated URLs.
pub fn parse_chapters(
    html: &str,
    selectors: &[&str],
    parent: &TitleCard,
) -> Result<Vec<ChapterEntry>> {
    let document = Html::parse_document(html);
    let mut chapters = Vec::new();
    let mut seen = HashSet::new();

    for css in selectors {
        let sel = select(css)?;
        for a in document.select(&sel) {
            let Some(href) = a.value().attr("href").or_else(|| a.value().attr("data-href")) else {
                continue;
            };
            let Some(url) = resolve_href(&parent.url, href) else {
                continue;
            };
            if seen.insert(url.clone()) {
                let label = derive_chapter_label(&element_text(a), href);
                chapters.push(ChapterEntry::new(label, url, parent.clone()));
            }
        }
        if !chapters.is_empty() {
            log::debug!("Found {} chapters using selector: {}", chapters.len(), css);
            break;
        }
    }
    Ok(chapters)
}

/// Parse an updates page into `title_url -> newest chapter_url`.
///
/// Inside each item the first link is the title and the first link pointing
/// elsewhere is its newest chapter. When a title shows up twice the first
/// (topmost) occurrence is kept.
pub fn parse_listing(html: &str, item_css: &str, site: &SiteClient) -> Result<Listing> {
    let document = Html::parse_document(html);
    let item_sel = select(item_css)?;
    let link_sel = select("a[href]")?;
    let mut listing = Listing::new();
    let mut skipped = 0usize;

    for item in document.select(&item_sel) {
        let mut urls = item
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| site.absolutize(href));
        let Some(title_url) = urls.next() else {
            skipped += 1;
            continue;
        };
        let Some(chapter_url) = urls.find(|u| *u != title_url) else {
            skipped += 1;
            continue;
        };
        listing.entry(title_url).or_insert(chapter_url);
    }

    if skipped > 0 {
        log::warn!("[{}] Skipped {} malformed update items", site.name(), skipped);
    }
    Ok(listing)
}
