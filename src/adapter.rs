//! The contract every site adapter satisfies.
//!
//! Only [`Adapter::fetch_chapters`] reports errors. Everything a caller
//! consumes directly (search, paged chapter lists, the chapter stream and the
//! updates snapshot) degrades to an empty result and logs instead, so one
//! broken page cannot abort a batch spanning many titles or sites.

use crate::detector;
use crate::error::Result;
use crate::models::{AdapterId, ChapterEntry, LastKnownChapter, Listing, TitleCard, UpdateResult};
use crate::pager::paginate;
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;

#[async_trait]
pub trait Adapter: Send + Sync {
    fn id(&self) -> &AdapterId;

    /// Display name used in logs.
    fn name(&self) -> &str;

    /// Canonical base URL; also the adapter's domain for store lookups.
    fn base_url(&self) -> &str;

    fn page_size(&self) -> usize;

    /// Search the site. An empty query browses the default listing.
    async fn search(&self, query: &str, page: usize) -> Vec<TitleCard>;

    /// Full chapter list in source order.
    async fn fetch_chapters(&self, card: &TitleCard) -> Result<Vec<ChapterEntry>>;

    /// Newest visible chapter per title, from a single fetch of the updates page.
    async fn latest_listing(&self) -> Listing;

    /// 1-indexed page of the chapter list. Pages past the end are empty.
    async fn list_chapters(&self, card: &TitleCard, page: usize) -> Vec<ChapterEntry> {
        match self.fetch_chapters(card).await {
            Ok(chapters) => {
                log::info!(
                    "[{}] Fetched {} chapters for {} - Page {}",
                    self.name(),
                    chapters.len(),
                    card.title,
                    page
                );
                paginate(&chapters, page, self.page_size())
            }
            Err(e) => {
                log::error!("[{}] Error fetching chapters for {}: {}", self.name(), card.url, e);
                Vec::new()
            }
        }
    }

    /// Chapters one at a time. A failed fetch ends the stream early.
    ///
    /// The stream is not restartable; call again for a second pass.
    fn iter_chapters(&self, title_url: &str, title_name: &str) -> BoxStream<'_, ChapterEntry> {
        let card = TitleCard::new(self.id().clone(), title_name, title_url, "");
        Box::pin(stream! {
            match self.fetch_chapters(&card).await {
                Ok(chapters) => {
                    for chapter in chapters {
                        yield chapter;
                    }
                }
                Err(e) => {
                    log::error!("[{}] Error iterating chapters of {}: {}", self.name(), card.url, e);
                }
            }
        })
    }

    fn owns(&self, url: &str) -> bool {
        url.starts_with(self.base_url())
    }

    async fn detect_updates(&self, tracked: &[LastKnownChapter]) -> UpdateResult {
        let snapshot = self.latest_listing().await;
        let result = detector::classify(&snapshot, tracked);
        log::info!(
            "[{}] Updated: {} | Not Updated: {}",
            self.name(),
            result.updated.len(),
            result.unchanged.len()
        );
        result
    }
}
