//! Fixed-size, 1-indexed paging over chapter lists.
//!
//! Page `n` covers `[(n-1)*size, n*size)`. Page 0 and pages past the end are
//! empty, which incremental walkers treat as the terminal condition.

use futures::stream::{Stream, StreamExt};

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Start and end offsets of `page`, or `None` when it cannot hold anything.
pub fn page_bounds(page: usize, size: usize) -> Option<(usize, usize)> {
    if page == 0 || size == 0 {
        return None;
    }
    let start = (page - 1).checked_mul(size)?;
    Some((start, start.saturating_add(size)))
}

pub fn paginate<T: Clone>(items: &[T], page: usize, size: usize) -> Vec<T> {
    match page_bounds(page, size) {
        Some((start, end)) if start < items.len() => items[start..end.min(items.len())].to_vec(),
        _ => Vec::new(),
    }
}

pub fn page_count(len: usize, size: usize) -> usize {
    if size == 0 {
        0
    } else {
        len.div_ceil(size)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChapterPager {
    page_size: usize,
}

impl Default for ChapterPager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ChapterPager {
    /// A zero page size falls back to the default.
    pub fn new(page_size: usize) -> Self {
        let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        Self { page_size }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page<T: Clone>(&self, items: &[T], page: usize) -> Vec<T> {
        paginate(items, page, self.page_size)
    }

    pub fn page_count(&self, len: usize) -> usize {
        page_count(len, self.page_size)
    }

    pub fn has_more(&self, len: usize, page: usize) -> bool {
        page < self.page_count(len)
    }

    /// Page of a lazy source; earlier items are skipped, later ones never pulled.
    pub fn page_stream<S>(&self, source: S, page: usize) -> impl Stream<Item = S::Item>
    where
        S: Stream,
    {
        let (skip, take) = match page_bounds(page, self.page_size) {
            Some((start, _)) => (start, self.page_size),
            None => (0, 0),
        };
        source.skip(skip).take(take)
    }
}
