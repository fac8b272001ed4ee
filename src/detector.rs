//! Update detection: compare recorded last chapters with a site snapshot.

use crate::adapter::Adapter;
use crate::db::SubscriptionStore;
use crate::error::Result;
use crate::models::{AdapterId, LastKnownChapter, Listing, Notification, UpdateResult};
use std::sync::Arc;

/// Classify tracked titles against `snapshot`.
///
/// A title whose snapshot chapter differs from the recorded one is `updated`,
/// an equal one is `unchanged`. Titles missing from the snapshot (scrolled
/// off the updates page) land in neither set.
pub fn classify(snapshot: &Listing, tracked: &[LastKnownChapter]) -> UpdateResult {
    let mut result = UpdateResult::default();
    for record in tracked {
        match snapshot.get(&record.title_url) {
            Some(latest) if *latest != record.chapter_url => {
                result.updated.insert(record.title_url.clone());
            }
            Some(_) => {
                result.unchanged.insert(record.title_url.clone());
            }
            None => {}
        }
    }
    // A title tracked twice with different chapters counts as updated only.
    let overlap: Vec<String> = result.unchanged.intersection(&result.updated).cloned().collect();
    for url in overlap {
        result.unchanged.remove(&url);
    }
    result
}

/// One adapter's detection pass together with the snapshot it ran against.
#[derive(Debug, Clone)]
pub struct DetectionRun {
    pub source: AdapterId,
    pub result: UpdateResult,
    pub snapshot: Listing,
}

impl DetectionRun {
    /// `(title_url, new chapter_url)` for every updated title.
    pub fn new_chapters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.result.updated.iter().filter_map(|title_url| {
            self.snapshot
                .get(title_url)
                .map(|chapter_url| (title_url.as_str(), chapter_url.as_str()))
        })
    }
}

pub struct UpdateDetector {
    store: Arc<dyn SubscriptionStore>,
}

impl UpdateDetector {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SubscriptionStore> {
        &self.store
    }

    /// Run detection for every tracked title in `adapter`'s domain.
    ///
    /// The site is fetched once no matter how many titles are tracked, and not
    /// at all when nothing is tracked.
    pub async fn check(&self, adapter: &dyn Adapter) -> Result<DetectionRun> {
        let tracked = self.store.get_tracked_titles(adapter.base_url())?;
        if tracked.is_empty() {
            log::debug!("[{}] No tracked titles, skipping", adapter.name());
            return Ok(DetectionRun {
                source: adapter.id().clone(),
                result: UpdateResult::default(),
                snapshot: Listing::new(),
            });
        }

        let snapshot = adapter.latest_listing().await;
        let result = classify(&snapshot, &tracked);
        log::info!(
            "[{}] Checked {} tracked titles: {} updated, {} unchanged, {} not listed",
            adapter.name(),
            tracked.len(),
            result.updated.len(),
            result.unchanged.len(),
            tracked.len() - result.updated.len() - result.unchanged.len()
        );

        Ok(DetectionRun {
            source: adapter.id().clone(),
            result,
            snapshot,
        })
    }

    /// Record the new chapters of `run` and build one notification per title.
    ///
    /// Each title is written on its own; a failure on one is logged and the
    /// rest still get recorded.
    pub fn record(&self, run: &DetectionRun) -> Vec<Notification> {
        let mut notifications = Vec::new();
        for (title_url, chapter_url) in run.new_chapters() {
            if let Err(e) = self.store.set_last_chapter(title_url, chapter_url) {
                log::error!("Failed to record last chapter for {}: {}", title_url, e);
                continue;
            }
            match self.store.get_subscribers(title_url) {
                Ok(subscribers) => notifications.push(Notification {
                    source: run.source.clone(),
                    title_url: title_url.to_string(),
                    chapter_url: chapter_url.to_string(),
                    subscribers,
                }),
                Err(e) => log::error!("Failed to load subscribers for {}: {}", title_url, e),
            }
        }
        notifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Listing {
        pairs
            .iter()
            .map(|(t, c)| (t.to_string(), c.to_string()))
            .collect()
    }

    #[test]
    fn test_classify_scenario() {
        let snap = snapshot(&[("A", "ch5"), ("B", "ch3")]);
        let tracked = vec![
            LastKnownChapter::new("A", "ch4"),
            LastKnownChapter::new("B", "ch3"),
            LastKnownChapter::new("C", "ch1"),
        ];

        let result = classify(&snap, &tracked);
        assert_eq!(result.updated.into_iter().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(result.unchanged.into_iter().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_absent_titles_in_neither_set() {
        let snap = snapshot(&[("A", "ch5")]);
        let tracked = vec![LastKnownChapter::new("X", "ch1"), LastKnownChapter::new("Y", "ch5")];

        let result = classify(&snap, &tracked);
        assert!(result.is_empty());
    }

    #[test]
    fn test_classify_is_idempotent() {
        let snap = snapshot(&[("A", "ch5"), ("B", "ch3")]);
        let tracked = vec![LastKnownChapter::new("A", "ch4"), LastKnownChapter::new("B", "ch3")];

        assert_eq!(classify(&snap, &tracked), classify(&snap, &tracked));
    }

    #[test]
    fn test_sets_are_disjoint_with_duplicate_records() {
        let snap = snapshot(&[("A", "ch5")]);
        let tracked = vec![LastKnownChapter::new("A", "ch5"), LastKnownChapter::new("A", "ch4")];

        let result = classify(&snap, &tracked);
        assert!(result.updated.contains("A"));
        assert!(result.unchanged.is_empty());
    }

    #[test]
    fn test_new_chapters_pairs_updated_titles_with_snapshot() {
        let snap = snapshot(&[("A", "ch5"), ("B", "ch3")]);
        let tracked = vec![LastKnownChapter::new("A", "ch4"), LastKnownChapter::new("B", "ch3")];
        let run = DetectionRun {
            source: AdapterId::new("test"),
            result: classify(&snap, &tracked),
            snapshot: snap,
        };

        assert_eq!(run.new_chapters().collect::<Vec<_>>(), vec![("A", "ch5")]);
    }
}
