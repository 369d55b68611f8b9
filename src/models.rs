use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentRating {
    #[default]
    Everyone,
    Mature,
    Adult,
}

impl ContentRating {
    /// Map the rating vocabulary used by MangaDex-style APIs
    pub fn from_api(rating: &str) -> Self {
        match rating {
            "suggestive" => ContentRating::Mature,
            "erotica" | "pornographic" => ContentRating::Adult,
            _ => ContentRating::Everyone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TagSection {
    pub id: String,
    pub title: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MangaInfo {
    pub primary_title: String,
    pub secondary_titles: Vec<String>,
    pub thumbnail_url: String,
    pub synopsis: String,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub status: String,
    pub content_rating: ContentRating,
    pub rating: Option<f64>,
    pub tag_groups: Vec<TagSection>,
    /// Source specific values needed by later calls (post ids, slugs)
    pub additional_info: BTreeMap<String, String>,
    pub share_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceManga {
    pub manga_id: String,
    pub manga_info: MangaInfo,
}

impl SourceManga {
    /// A manga known only by id, before its details are fetched
    pub fn bare(manga_id: impl Into<String>) -> Self {
        Self {
            manga_id: manga_id.into(),
            manga_info: MangaInfo::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Chapter {
    pub chapter_id: String,
    pub manga_id: String,
    pub title: String,
    pub chap_num: f64,
    pub volume: f64,
    pub lang_code: String,
    pub version: Option<String>,
    pub sorting_index: Option<i64>,
    pub publish_date: Option<DateTime<Utc>>,
}

impl Chapter {
    pub fn new(chapter_id: impl Into<String>, manga_id: impl Into<String>) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            manga_id: manga_id.into(),
            title: String::new(),
            chap_num: 0.0,
            volume: 0.0,
            lang_code: "en".to_string(),
            version: None,
            sorting_index: None,
            publish_date: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChapterDetails {
    pub id: String,
    pub manga_id: String,
    pub pages: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchResultItem {
    pub manga_id: String,
    pub title: String,
    pub image_url: String,
    pub subtitle: Option<String>,
    pub content_rating: ContentRating,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Included,
    Excluded,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Multi(BTreeMap<String, FilterMode>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub id: String,
    pub value: FilterValue,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub title: String,
    pub filters: Vec<SearchFilter>,
    /// Sorting option id chosen by the user
    pub sort: Option<String>,
}

impl SearchQuery {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, id: impl Into<String>, value: FilterValue) -> Self {
        self.filters.push(SearchFilter {
            id: id.into(),
            value,
        });
        self
    }

    pub fn filter(&self, id: &str) -> Option<&FilterValue> {
        self.filters.iter().find(|f| f.id == id).map(|f| &f.value)
    }

    /// Single-valued filter, ignoring the `all` placeholder
    pub fn single(&self, id: &str) -> Option<&str> {
        match self.filter(id) {
            Some(FilterValue::Single(v)) if !v.is_empty() && v != "all" => Some(v.as_str()),
            _ => None,
        }
    }

    /// Ids of a multi-select filter with the given mode
    pub fn multi(&self, id: &str, mode: FilterMode) -> Vec<String> {
        match self.filter(id) {
            Some(FilterValue::Multi(map)) => map
                .iter()
                .filter(|(_, m)| **m == mode)
                .map(|(k, _)| k.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether any multi-select filter has a selection
    pub fn has_selections(&self) -> bool {
        self.filters
            .iter()
            .any(|f| matches!(&f.value, FilterValue::Multi(m) if !m.is_empty()))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverSectionType {
    Featured,
    ProminentCarousel,
    SimpleCarousel,
    ChapterUpdates,
    Genres,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DiscoverSection {
    pub id: String,
    pub title: String,
    pub section_type: DiscoverSectionType,
}

impl DiscoverSection {
    pub fn new(id: &str, title: &str, section_type: DiscoverSectionType) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            section_type,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoverSectionItem {
    SimpleCarousel {
        manga_id: String,
        title: String,
        image_url: String,
        subtitle: Option<String>,
        content_rating: Option<ContentRating>,
    },
    Featured {
        manga_id: String,
        title: String,
        image_url: String,
        supertitle: Option<String>,
    },
    ChapterUpdates {
        manga_id: String,
        chapter_id: String,
        title: String,
        image_url: String,
        subtitle: Option<String>,
    },
    Genres {
        name: String,
        search_query: SearchQuery,
    },
}

impl DiscoverSectionItem {
    pub fn simple(manga_id: String, title: String, image_url: String, subtitle: Option<String>) -> Self {
        DiscoverSectionItem::SimpleCarousel {
            manga_id,
            title,
            image_url,
            subtitle,
            content_rating: None,
        }
    }

    pub fn manga_id(&self) -> Option<&str> {
        match self {
            DiscoverSectionItem::SimpleCarousel { manga_id, .. }
            | DiscoverSectionItem::Featured { manga_id, .. }
            | DiscoverSectionItem::ChapterUpdates { manga_id, .. } => Some(manga_id),
            DiscoverSectionItem::Genres { .. } => None,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            DiscoverSectionItem::SimpleCarousel { title, .. }
            | DiscoverSectionItem::Featured { title, .. }
            | DiscoverSectionItem::ChapterUpdates { title, .. } => title,
            DiscoverSectionItem::Genres { name, .. } => name,
        }
    }
}

/// Position in a paged listing
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct PageCursor {
    pub page: u32,
    /// Manga ids already returned, for listings that repeat entries across pages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collected_ids: Vec<String>,
}

impl PageCursor {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            collected_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PagedResults<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

impl<T> PagedResults<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    pub fn with_next(items: Vec<T>, has_more: bool, next_page: u32) -> Self {
        Self {
            items,
            next: has_more.then(|| PageCursor::page(next_page)),
        }
    }

    pub fn empty() -> Self {
        Self::last(Vec::new())
    }
}
