/// Adapter behaviour shared by every site: paging, streaming, routing and
/// tolerance to broken markup

use futures::StreamExt;
use rust_manga_tracker::adapter::Adapter;
use rust_manga_tracker::config::AdaptersConfig;
use rust_manga_tracker::http_client::StaticFetcher;
use rust_manga_tracker::models::{AdapterId, TitleCard};
use rust_manga_tracker::pager::ChapterPager;
use rust_manga_tracker::registry::AdapterRegistry;
use rust_manga_tracker::source_utils::SiteContext;
use rust_manga_tracker::sources::{ManhuaFast, OmegaScans};
use rust_manga_tracker::TrackerError;
use std::sync::Arc;

const SERIES: &str = "https://omegascans.com/series/long-run/";

fn chapter_url(i: usize) -> String {
    format!("{}chapter-{}", SERIES, 45 - i)
}

fn series_page() -> String {
    let items: String = (0..45)
        .map(|i| {
            format!(
                r#"<li class="chapter-item"><a href="{}">Chapter {}</a></li>"#,
                chapter_url(i),
                45 - i
            )
        })
        .collect();
    format!("<ul class=\"chapters\">{}</ul>", items)
}

fn omega(fetcher: StaticFetcher) -> OmegaScans {
    OmegaScans::new(&SiteContext::new(Arc::new(fetcher))).unwrap()
}

fn card() -> TitleCard {
    TitleCard::new(AdapterId::new("omegascans"), "Long Run", SERIES, "")
}

#[tokio::test]
async fn test_list_chapters_pages() {
    let adapter = omega(StaticFetcher::new().with_page(SERIES, series_page()));

    let page3 = adapter.list_chapters(&card(), 3).await;
    let urls: Vec<_> = page3.iter().map(|c| c.url.clone()).collect();
    let expected: Vec<_> = (40..45).map(chapter_url).collect();
    assert_eq!(urls, expected);

    assert!(adapter.list_chapters(&card(), 4).await.is_empty());
    assert!(adapter.list_chapters(&card(), 0).await.is_empty());
}

#[tokio::test]
async fn test_pages_concatenate_to_full_list() {
    let adapter = omega(StaticFetcher::new().with_page(SERIES, series_page()));
    let mut all = Vec::new();
    for page in 1..=3 {
        all.extend(adapter.list_chapters(&card(), page).await);
    }
    let full = adapter.fetch_chapters(&card()).await.unwrap();
    assert_eq!(all, full);
    assert_eq!(ChapterPager::default().page_count(full.len()), 3);
}

#[tokio::test]
async fn test_iter_chapters_matches_fetch_order() {
    let adapter = omega(StaticFetcher::new().with_page(SERIES, series_page()));
    let streamed: Vec<_> = adapter
        .iter_chapters(SERIES, "Long Run")
        .map(|c| c.url)
        .collect()
        .await;
    assert_eq!(streamed.len(), 45);
    assert_eq!(streamed[0], chapter_url(0));
    assert_eq!(streamed[44], chapter_url(44));
}

#[tokio::test]
async fn test_iter_chapters_ends_on_fetch_failure() {
    let adapter = omega(StaticFetcher::new());
    let mut stream = adapter.iter_chapters(SERIES, "Long Run");
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_list_chapters_on_fetch_failure_is_empty() {
    let adapter = omega(StaticFetcher::new());
    assert!(adapter.list_chapters(&card(), 1).await.is_empty());
}

#[tokio::test]
async fn test_search_skips_malformed_cards() {
    let page = r#"
        <div class="manga-list">
          <div class="manga-card"><a href="/series/one/" title="One"><img src="/c/1.webp"></a></div>
          <div class="manga-card"><span>no link at all</span></div>
          <div class="manga-card"><a href="/series/three/" title="Three"></a></div>
        </div>"#;
    let adapter = omega(StaticFetcher::new().with_page("https://omegascans.com/?s=o", page));

    let cards = adapter.search("o", 1).await;
    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|c| c.source.as_str() == "omegascans"));
    assert_eq!(cards[1].cover_image_url, "");
}

#[tokio::test]
async fn test_search_on_fetch_failure_is_empty() {
    let adapter = omega(StaticFetcher::new());
    assert!(adapter.search("anything", 1).await.is_empty());
}

#[tokio::test]
async fn test_madara_chapters_from_ajax_endpoint() {
    let title = "https://manhuafast.net/manga/martial-peak/";
    let fetcher = StaticFetcher::new()
        .with_page(title, "<div id=\"manga-chapters-holder\" data-id=\"12\"></div>")
        .with_page(
            "https://manhuafast.net/manga/martial-peak/ajax/chapters/",
            r#"<ul class="main version-chap">
                 <li class="wp-manga-chapter"><a href="https://manhuafast.net/manga/martial-peak/chapter-2/">Chapter 2</a></li>
                 <li class="wp-manga-chapter"><a href="https://manhuafast.net/manga/martial-peak/chapter-1/">Chapter 1</a></li>
               </ul>"#,
        );
    let fetcher = Arc::new(fetcher);
    let adapter = ManhuaFast::new(&SiteContext::new(fetcher.clone())).unwrap();

    let parent = TitleCard::new(AdapterId::new("manhuafast"), "Martial Peak", title, "");
    let chapters = adapter.fetch_chapters(&parent).await.unwrap();
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].title, "Chapter 2");
    assert_eq!(chapters[0].parent, parent);
    assert_eq!(fetcher.requests().len(), 2);
}

#[test]
fn test_registry_resolution_matches_owns() {
    let ctx = SiteContext::new(Arc::new(StaticFetcher::new()));
    let registry = AdapterRegistry::from_config(&AdaptersConfig::default(), &ctx);
    assert_eq!(registry.len(), 2);

    for url in [
        "https://manhuafast.net/manga/martial-peak/",
        "https://omegascans.com/series/long-run/",
    ] {
        let adapter = registry.resolve(url).unwrap();
        assert!(adapter.owns(url));
    }

    match registry.resolve("https://example.org/manga/x") {
        Err(TrackerError::NoAdapterFound(url)) => assert_eq!(url, "https://example.org/manga/x"),
        _ => panic!("expected NoAdapterFound"),
    }
}

#[tokio::test]
async fn test_search_all_groups_by_adapter() {
    let fetcher = StaticFetcher::new().with_page(
        "https://omegascans.com/?s=peak",
        r#"<div class="manga-card"><a href="/series/peak/" title="Peak"></a></div>"#,
    );
    let ctx = SiteContext::new(Arc::new(fetcher));
    let registry = AdapterRegistry::from_config(&AdaptersConfig::default(), &ctx);

    let results = registry.search_all("peak", 1).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.as_str(), "manhuafast");
    assert!(results[0].1.is_empty());
    assert_eq!(results[1].0.as_str(), "omegascans");
    assert_eq!(results[1].1.len(), 1);
}
