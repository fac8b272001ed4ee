use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Stable identifier of a site adapter, e.g. `manhuafast`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AdapterId(pub String);

impl AdapterId {
    pub fn new(id: impl Into<String>) -> Self {
        AdapterId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a search or listing page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TitleCard {
    pub source: AdapterId,
    pub title: String,
    pub url: String,
    pub cover_image_url: String,
}

impl TitleCard {
    pub fn new(
        source: AdapterId,
        title: impl Into<String>,
        url: impl Into<String>,
        cover_image_url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            title: title.into(),
            url: url.into(),
            cover_image_url: cover_image_url.into(),
        }
    }
}

impl std::hash::Hash for TitleCard {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.url.hash(state);
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChapterEntry {
    pub title: String,
    pub url: String,
    pub parent: TitleCard,
    // Filled by the image resolution step, empty straight out of a listing parse.
    #[serde(default)]
    pub assets: Vec<String>,
}

impl ChapterEntry {
    pub fn new(title: impl Into<String>, url: impl Into<String>, parent: TitleCard) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            parent,
            assets: Vec::new(),
        }
    }
}

/// Last chapter recorded for a tracked title.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LastKnownChapter {
    pub title_url: String,
    pub chapter_url: String,
}

impl LastKnownChapter {
    pub fn new(title_url: impl Into<String>, chapter_url: impl Into<String>) -> Self {
        Self {
            title_url: title_url.into(),
            chapter_url: chapter_url.into(),
        }
    }
}

/// Newest visible chapter per title on a site's updates page.
pub type Listing = HashMap<String, String>;

/// Outcome of one detection pass. `updated` and `unchanged` never overlap.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub updated: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
}

impl UpdateResult {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.unchanged.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub title_url: String,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TitleName {
    pub title_url: String,
    pub name: String,
}

/// Handed to the notification layer for every title with a new chapter.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Notification {
    pub source: AdapterId,
    pub title_url: String,
    pub chapter_url: String,
    pub subscribers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}
