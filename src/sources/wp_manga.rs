//! Shared parsing for WP-Manga (Madara theme) sites.

use crate::error::Result;
use crate::models::{ChapterEntry, TitleCard};
use crate::source_utils::{parse_chapters, select, SiteClient};
use regex::Regex;
use reqwest::Url;
use scraper::Html;
use std::sync::OnceLock;

/// Chapter list selectors across Madara builds, most specific first.
pub const CHAPTER_SELECTORS: &[&str] = &[
    "li.wp-manga-chapter a",
    "ul.main.version-chap li a",
    "div.listing-chapters_wrap a",
    "ul.version-chap a",
];

/// Search result and browse card containers.
pub const CARD_SELECTORS: &[&str] = &[
    "div.tab-thumb.c-image-hover",
    "div.item-thumb.c-image-hover",
    "div.page-item-detail",
];

/// Madara lazy-loads covers, so `data-src` carries the real image.
pub const IMAGE_ATTRS: &[&str] = &["data-src", "data-lazy-src", "src"];

/// Build a search URL. Page 1 is the bare search, later pages use `/page/N/`.
pub fn search_url(base: &Url, query: &str, page: usize) -> String {
    let mut url = base.clone();
    if page > 1 {
        url.set_path(&format!("{}page/{}/", base.path(), page));
    }
    if !query.is_empty() {
        url.query_pairs_mut()
            .append_pair("s", query)
            .append_pair("post_type", "wp-manga");
    }
    url.to_string()
}

fn manga_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"manga_id["']?\s*[:=]\s*["']?(\d+)"#).expect("valid manga id regex"))
}

/// Post id needed by the legacy `admin-ajax.php` chapter endpoint.
pub fn find_post_id(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    if let Ok(sel) = select("div#manga-chapters-holder[data-id]") {
        if let Some(id) = document
            .select(&sel)
            .next()
            .and_then(|div| div.value().attr("data-id"))
        {
            return Some(id.to_string());
        }
    }
    manga_id_re().captures(html).map(|cap| cap[1].to_string())
}

/// Chapter list of a Madara title page.
///
/// Tries the inline list first, then the `ajax/chapters/` endpoint newer
/// builds use, then the legacy `admin-ajax.php` endpoint.
pub async fn fetch_chapters(site: &SiteClient, parent: &TitleCard) -> Result<Vec<ChapterEntry>> {
    let html = site.get_html(&parent.url).await?;
    let chapters = parse_chapters(&html, CHAPTER_SELECTORS, parent)?;
    if !chapters.is_empty() {
        return Ok(chapters);
    }

    let ajax_url = format!("{}/ajax/chapters/", parent.url.trim_end_matches('/'));
    match site.post_html(&ajax_url, &[]).await {
        Ok(fragment) => {
            let chapters = parse_chapters(&fragment, CHAPTER_SELECTORS, parent)?;
            if !chapters.is_empty() {
                return Ok(chapters);
            }
        }
        Err(e) => log::debug!("[{}] AJAX chapter list unavailable: {}", site.name(), e),
    }

    if let Some(post_id) = find_post_id(&html) {
        let admin_ajax = format!("{}wp-admin/admin-ajax.php", site.base_url());
        let fragment = site
            .post_html(
                &admin_ajax,
                &[("action", "manga_get_chapters"), ("manga", post_id.as_str())],
            )
            .await?;
        return parse_chapters(&fragment, CHAPTER_SELECTORS, parent);
    }

    log::warn!("[{}] No chapters found for {}", site.name(), parent.url);
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let base = Url::parse("https://manhuafast.net/").unwrap();
        assert_eq!(
            search_url(&base, "solo leveling", 1),
            "https://manhuafast.net/?s=solo+leveling&post_type=wp-manga"
        );
        assert_eq!(
            search_url(&base, "x", 3),
            "https://manhuafast.net/page/3/?s=x&post_type=wp-manga"
        );
        assert_eq!(search_url(&base, "", 1), "https://manhuafast.net/");
    }

    #[test]
    fn test_find_post_id() {
        let holder = r#"<div id="manga-chapters-holder" data-id="4521"></div>"#;
        assert_eq!(find_post_id(holder).as_deref(), Some("4521"));

        let script = r#"<script>var manga = {"manga_id":"981"};</script>"#;
        assert_eq!(find_post_id(script).as_deref(), Some("981"));

        assert_eq!(find_post_id("<html></html>"), None);
    }
}
