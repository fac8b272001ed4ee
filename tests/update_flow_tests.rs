/// Integration tests for update detection
/// Adapters run against canned pages, the store against SQLite

use rust_manga_tracker::adapter::Adapter;
use rust_manga_tracker::app_state::AppState;
use rust_manga_tracker::config::Config;
use rust_manga_tracker::db::{SqliteStore, SubscriptionStore};
use rust_manga_tracker::detector::UpdateDetector;
use rust_manga_tracker::http_client::StaticFetcher;
use rust_manga_tracker::models::LastKnownChapter;
use rust_manga_tracker::source_utils::SiteContext;
use rust_manga_tracker::sources::OmegaScans;
use std::sync::Arc;
use tokio::sync::mpsc;

const A: &str = "https://omegascans.com/series/alpha/";
const B: &str = "https://omegascans.com/series/beta/";
const C: &str = "https://omegascans.com/series/gamma/";

fn latest_releases() -> String {
    format!(
        r#"<div class="latest">
             <div class="manga-item"><a href="{a}">Alpha</a><a href="{a}chapter-5">Chapter 5</a></div>
             <div class="manga-item"><a href="{b}">Beta</a><a href="{b}chapter-3">Chapter 3</a></div>
             <div class="manga-item"><a href="{a}">Alpha</a><a href="{a}chapter-4">Chapter 4</a></div>
           </div>"#,
        a = A,
        b = B
    )
}

fn fetcher() -> Arc<StaticFetcher> {
    Arc::new(StaticFetcher::new().with_page("https://omegascans.com/latest-releases/", latest_releases()))
}

fn seeded_store() -> Arc<SqliteStore> {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    store.subscribe("100", A, "Alpha", Some(&format!("{}chapter-4", A))).unwrap();
    store.subscribe("200", A, "Alpha", None).unwrap();
    store.subscribe("100", B, "Beta", Some(&format!("{}chapter-3", B))).unwrap();
    store.subscribe("300", C, "Gamma", Some(&format!("{}chapter-1", C))).unwrap();
    store
}

#[tokio::test]
async fn test_detect_updates_scenario() {
    let adapter = OmegaScans::new(&SiteContext::new(fetcher())).unwrap();
    let tracked = vec![
        LastKnownChapter::new(A, format!("{}chapter-4", A)),
        LastKnownChapter::new(B, format!("{}chapter-3", B)),
        LastKnownChapter::new(C, format!("{}chapter-1", C)),
    ];

    let result = adapter.detect_updates(&tracked).await;
    assert_eq!(result.updated.iter().collect::<Vec<_>>(), vec![A]);
    assert_eq!(result.unchanged.iter().collect::<Vec<_>>(), vec![B]);
    assert!(!result.updated.contains(C) && !result.unchanged.contains(C));
}

#[tokio::test]
async fn test_detect_updates_is_repeatable() {
    let adapter = OmegaScans::new(&SiteContext::new(fetcher())).unwrap();
    let tracked = vec![LastKnownChapter::new(A, format!("{}chapter-4", A))];

    let first = adapter.detect_updates(&tracked).await;
    let second = adapter.detect_updates(&tracked).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unreachable_updates_page_reports_nothing() {
    let adapter = OmegaScans::new(&SiteContext::new(Arc::new(StaticFetcher::new()))).unwrap();
    let tracked = vec![LastKnownChapter::new(A, format!("{}chapter-4", A))];

    assert!(adapter.detect_updates(&tracked).await.is_empty());
}

#[tokio::test]
async fn test_detector_records_and_notifies() {
    let store = seeded_store();
    let adapter = OmegaScans::new(&SiteContext::new(fetcher())).unwrap();
    let detector = UpdateDetector::new(store.clone());

    let run = detector.check(&adapter).await.unwrap();
    assert_eq!(run.result.updated.len(), 1);
    assert_eq!(run.result.unchanged.len(), 1);

    let notifications = detector.record(&run);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title_url, A);
    assert_eq!(notifications[0].chapter_url, format!("{}chapter-5", A));
    assert_eq!(notifications[0].subscribers, vec!["100", "200"]);

    let stored = store.get_last_chapter(A).unwrap().unwrap();
    assert_eq!(stored.chapter_url, format!("{}chapter-5", A));
    assert_eq!(
        store.get_last_chapter(C).unwrap().unwrap().chapter_url,
        format!("{}chapter-1", C)
    );

    // Nothing new on the same snapshot
    let again = detector.check(&adapter).await.unwrap();
    assert!(again.result.updated.is_empty());
    assert_eq!(again.result.unchanged.len(), 2);
}

#[tokio::test]
async fn test_app_state_scheduler_pass() {
    let store = seeded_store();
    let config = Config::from_toml(
        r#"
        [adapters]
        enabled = ["omegascans"]

        [paging]
        page_size = 5
        "#,
    )
    .unwrap();

    let (tx, mut rx) = mpsc::channel(4);
    let state = AppState::build(config, fetcher(), store, Some(tx));
    assert_eq!(state.registry.len(), 1);
    assert_eq!(state.pager.page_size(), 5);
    assert_eq!(state.registry.adapters()[0].page_size(), 5);

    let summary = state.scheduler.run_once().await;
    assert_eq!(summary.adapters_failed, 0);
    assert_eq!(summary.updated, 1);

    let notification = rx.recv().await.unwrap();
    assert_eq!(notification.title_url, A);

    let metrics = state.metrics.get_metrics("omegascans").unwrap();
    assert_eq!(metrics.successful_requests, 1);
}

#[tokio::test]
async fn test_subscriptions_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manga.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.subscribe("100", A, "Alpha", Some("https://omegascans.com/series/alpha/chapter-4")).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let tracked = store.get_tracked_titles("https://omegascans.com/").unwrap();
    assert_eq!(tracked, vec![LastKnownChapter::new(A, "https://omegascans.com/series/alpha/chapter-4")]);
    assert_eq!(store.get_subs("100", &[]).unwrap()[0].name, "Alpha");
}
