use crate::config::WeebDexConfig;
use crate::error::{Result, SourceError};
use crate::helpers::{capitalize, parse_leading_f64};
use crate::models::{
    Chapter, ChapterDetails, ContentRating, DiscoverSection, DiscoverSectionItem,
    DiscoverSectionType, FilterMode, FilterValue, MangaInfo, PageCursor, PagedResults,
    SearchQuery, SearchResultItem, SourceManga, Tag, TagSection,
};
use crate::network::{decode_json, fetch_text};
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://weebdex.org";
pub const API_BASE: &str = "https://api.weebdex.org";
pub const COVER_BASE: &str = "https://srv.weebdex.net";
const REFERER: &str = "https://weebdex.org/";
const CHAPTER_PAGE_SIZE: usize = 100;
const DEFAULT_RATINGS: [&str; 3] = ["safe", "suggestive", "erotica"];

#[derive(Deserialize)]
struct MangaList {
    #[serde(default)]
    data: Vec<Manga>,
}

#[derive(Deserialize)]
struct Manga {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    alt_titles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    demographic: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    content_rating: Option<String>,
    #[serde(default)]
    relationships: MangaRelationships,
}

#[derive(Deserialize, Default)]
struct MangaRelationships {
    #[serde(default)]
    cover: Option<Cover>,
    #[serde(default)]
    tags: Vec<Named>,
    #[serde(default)]
    authors: Vec<Named>,
    #[serde(default)]
    artists: Vec<Named>,
}

#[derive(Deserialize)]
struct Cover {
    #[serde(default)]
    id: String,
    #[serde(default)]
    ext: String,
}

#[derive(Deserialize)]
struct Named {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct ChapterFeed {
    #[serde(default)]
    data: Vec<ApiChapter>,
}

#[derive(Deserialize)]
struct ApiChapter {
    id: String,
    #[serde(default)]
    chapter: Option<String>,
    #[serde(default)]
    volume: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    is_unavailable: bool,
    #[serde(default)]
    node: Option<String>,
    #[serde(default)]
    data: Option<Vec<PageData>>,
    #[serde(default)]
    data_optimized: Option<Vec<PageData>>,
    #[serde(default)]
    relationships: Option<ChapterRelationships>,
}

#[derive(Deserialize)]
struct PageData {
    name: String,
}

#[derive(Deserialize)]
struct ChapterRelationships {
    #[serde(default)]
    manga: Option<Manga>,
    #[serde(default)]
    groups: Vec<Named>,
}

/// Search filters pulled out of a query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedFilters {
    pub status: Vec<String>,
    pub demographic: Vec<String>,
    pub content_rating: Vec<String>,
    pub included_tags: Vec<String>,
    pub excluded_tags: Vec<String>,
    pub tag_mode: String,
}

impl Manga {
    fn cover_url(&self) -> String {
        self.cover_url_for(&self.id)
    }

    fn cover_url_for(&self, manga_id: &str) -> String {
        match &self.relationships.cover {
            Some(cover) if !cover.id.is_empty() && !cover.ext.is_empty() => format!(
                "{}/covers/{}/{}.{}",
                COVER_BASE,
                manga_id,
                cover.id,
                cover.ext.trim_start_matches('.')
            ),
            _ => String::new(),
        }
    }

    fn rating(&self) -> ContentRating {
        ContentRating::from_api(self.content_rating.as_deref().unwrap_or_default())
    }

    fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Subtitle for discover carousels, chosen by configuration
    fn discover_subtitle(&self, config: &WeebDexConfig) -> String {
        match config.discover_subtitle.as_str() {
            "year" => self.year.map(|y| y.to_string()).unwrap_or_default(),
            "content_rating" => capitalize(self.content_rating.as_deref().unwrap_or_default()),
            _ => capitalize(self.status.as_deref().unwrap_or_default()),
        }
    }
}

fn join_names(people: &[Named]) -> Option<String> {
    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
    let joined = names.join(", ");
    (!joined.is_empty()).then_some(joined)
}

fn parse_date(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.filter(|s| !s.is_empty())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn url_with_params(path: &str, params: &[(&str, String)]) -> Result<Url> {
    Url::parse_with_params(&format!("{}{}", API_BASE, path), params)
        .map_err(|e| SourceError::Parse(e.to_string()))
}

pub fn extract_filters(query: &SearchQuery) -> ExtractedFilters {
    let tag_mode = match query.filter("tagMode") {
        Some(FilterValue::Single(mode)) if !mode.is_empty() => mode.clone(),
        Some(FilterValue::Multi(_)) => query
            .multi("tagMode", FilterMode::Included)
            .into_iter()
            .next()
            .unwrap_or_else(|| "AND".to_string()),
        _ => "AND".to_string(),
    };

    ExtractedFilters {
        status: query.multi("status", FilterMode::Included),
        demographic: query.multi("demographic", FilterMode::Included),
        content_rating: query.multi("contentRating", FilterMode::Included),
        included_tags: query.multi("tags", FilterMode::Included),
        excluded_tags: query.multi("tags", FilterMode::Excluded),
        tag_mode,
    }
}

/// Content ratings sent with a search, honouring the adult toggle
pub fn content_ratings(selected: &[String], hide_adult: bool) -> Vec<String> {
    let ratings: Vec<String> = if selected.is_empty() {
        DEFAULT_RATINGS.iter().map(|r| r.to_string()).collect()
    } else {
        selected.to_vec()
    };
    if hide_adult {
        ratings
            .into_iter()
            .filter(|r| r != "erotica" && r != "pornographic")
            .collect()
    } else {
        ratings
    }
}

pub fn search_url(query: &SearchQuery, page: u32, config: &WeebDexConfig) -> Result<Url> {
    let mut params: Vec<(&str, String)> = vec![
        ("limit", config.items_per_page.to_string()),
        ("page", page.to_string()),
    ];

    let term = query.title.trim();
    if !term.is_empty() {
        params.push(("title", term.to_string()));
    }

    let filters = extract_filters(query);
    params.extend(filters.status.iter().map(|s| ("status", s.clone())));
    params.extend(filters.demographic.iter().map(|d| ("demographic", d.clone())));
    params.extend(
        content_ratings(&filters.content_rating, config.hide_adult_results)
            .into_iter()
            .map(|r| ("contentRating", r)),
    );
    params.extend(filters.included_tags.iter().map(|t| ("tag", t.clone())));

    let mut excluded = filters.excluded_tags.clone();
    for tag in &config.excluded_tags {
        if !excluded.contains(tag) {
            excluded.push(tag.clone());
        }
    }
    params.extend(excluded.into_iter().map(|t| ("tagx", t)));

    params.push(("tmod", filters.tag_mode));
    params.extend(config.original_languages.iter().map(|l| ("lang", l.clone())));

    let sort = query
        .sort
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(config.default_sort.as_str());
    if sort != "none" {
        params.push(("sort", sort.to_string()));
        params.push(("order", "desc".to_string()));
    }

    url_with_params("/manga", &params)
}

pub fn parse_search_results(body: &str) -> Result<Vec<SearchResultItem>> {
    let json: MangaList = decode_json("weebdex search", body)?;
    Ok(json
        .data
        .iter()
        .filter(|m| m.has_title())
        .map(|m| SearchResultItem {
            manga_id: m.id.clone(),
            title: m.title.clone(),
            image_url: m.cover_url(),
            subtitle: Some(m.status.clone().unwrap_or_default()),
            content_rating: m.rating(),
        })
        .collect())
}

pub async fn search(
    client: &Client,
    config: &WeebDexConfig,
    query: &SearchQuery,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<SearchResultItem>> {
    let page = cursor.map_or(1, |c| c.page.max(1));
    let url = search_url(query, page, config)?;
    let body = fetch_text(client, url.as_str(), REFERER).await?;
    let items = parse_search_results(&body)?;
    let has_more = items.len() >= config.items_per_page as usize;
    Ok(PagedResults::with_next(items, has_more, page + 1))
}

pub fn parse_manga_details(body: &str, manga_id: &str) -> Result<SourceManga> {
    let manga: Manga = decode_json("weebdex manga", body)?;

    let mut info_tags = Vec::new();
    if let Some(demographic) = manga.demographic.as_deref().filter(|d| !d.is_empty()) {
        info_tags.push(Tag {
            id: format!("demographic-{}", demographic),
            title: capitalize(demographic),
        });
    }
    if let Some(status) = manga.status.as_deref().filter(|s| !s.is_empty()) {
        info_tags.push(Tag {
            id: format!("status-{}", status),
            title: capitalize(status),
        });
    }

    let mut tag_groups = Vec::new();
    if !info_tags.is_empty() {
        tag_groups.push(TagSection {
            id: "info".to_string(),
            title: "Info".to_string(),
            tags: info_tags,
        });
    }
    if !manga.relationships.tags.is_empty() {
        tag_groups.push(TagSection {
            id: "tags".to_string(),
            title: "Tags".to_string(),
            tags: manga
                .relationships
                .tags
                .iter()
                .map(|t| Tag {
                    id: t.id.clone(),
                    title: t.name.clone(),
                })
                .collect(),
        });
    }

    let info = MangaInfo {
        primary_title: manga.title.clone(),
        secondary_titles: manga.alt_titles.values().flatten().cloned().collect(),
        thumbnail_url: manga.cover_url_for(manga_id),
        synopsis: manga
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "No description available.".to_string()),
        author: join_names(&manga.relationships.authors),
        artist: join_names(&manga.relationships.artists),
        status: manga
            .status
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        content_rating: manga.rating(),
        tag_groups,
        share_url: Some(format!("{}/title/{}", BASE_URL, manga_id)),
        ..Default::default()
    };

    Ok(SourceManga {
        manga_id: manga_id.to_string(),
        manga_info: info,
    })
}

pub async fn get_manga_details(client: &Client, manga_id: &str) -> Result<SourceManga> {
    let url = format!("{}/manga/{}", API_BASE, manga_id);
    let body = fetch_text(client, &url, REFERER).await?;
    parse_manga_details(&body, manga_id)
}

/// One page of the chapter feed and the raw entry count used for paging
pub fn parse_chapter_page(body: &str, manga_id: &str) -> Result<(Vec<Chapter>, usize)> {
    let json: ChapterFeed = decode_json("weebdex chapters", body)?;
    let raw_len = json.data.len();
    let chapters = json
        .data
        .into_iter()
        .filter(|c| !c.is_unavailable)
        .map(|c| {
            let mut chapter = Chapter::new(c.id, manga_id);
            chapter.title = c.title.unwrap_or_default();
            chapter.chap_num = c.chapter.as_deref().and_then(parse_leading_f64).unwrap_or(0.0);
            chapter.volume = c.volume.as_deref().and_then(parse_leading_f64).unwrap_or(0.0);
            chapter.lang_code = c
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "en".to_string());
            chapter.version = Some(
                c.relationships
                    .as_ref()
                    .and_then(|r| r.groups.first())
                    .map(|g| g.name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "No Group".to_string()),
            );
            chapter.publish_date =
                parse_date(c.published_at.as_deref()).or_else(|| parse_date(c.created_at.as_deref()));
            chapter
        })
        .collect();
    Ok((chapters, raw_len))
}

/// Keep the configured languages and number the result newest-first
pub fn filter_and_index(chapters: Vec<Chapter>, config: &WeebDexConfig) -> Vec<Chapter> {
    let mut kept: Vec<Chapter> = chapters
        .into_iter()
        .filter(|c| config.accepts_chapter_language(&c.lang_code))
        .collect();
    let max_index = kept.len() as i64 - 1;
    for (index, chapter) in kept.iter_mut().enumerate() {
        chapter.sorting_index = Some(max_index - index as i64);
    }
    kept
}

pub async fn get_chapters(
    client: &Client,
    config: &WeebDexConfig,
    manga: &SourceManga,
) -> Result<Vec<Chapter>> {
    let mut all = Vec::new();
    let mut page = 1u32;
    loop {
        let url = url_with_params(
            &format!("/manga/{}/chapters", manga.manga_id),
            &[("limit", CHAPTER_PAGE_SIZE.to_string()), ("page", page.to_string())],
        )?;
        let body = fetch_text(client, url.as_str(), REFERER).await?;
        let (chapters, raw_len) = parse_chapter_page(&body, &manga.manga_id)?;
        all.extend(chapters);
        if raw_len < CHAPTER_PAGE_SIZE {
            break;
        }
        page += 1;
    }

    let chapters = filter_and_index(all, config);
    log::debug!("WeebDex: {} chapters for {}", chapters.len(), manga.manga_id);
    Ok(chapters)
}

pub fn parse_chapter_pages(body: &str, data_saver: bool) -> Result<Vec<String>> {
    let chapter: ApiChapter = decode_json("weebdex chapter", body)?;
    let node = chapter
        .node
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(API_BASE);

    let (preferred, fallback) = if data_saver {
        (chapter.data_optimized.as_ref(), chapter.data.as_ref())
    } else {
        (chapter.data.as_ref(), chapter.data_optimized.as_ref())
    };
    let pages: Vec<String> = preferred
        .or(fallback)
        .map(|data| {
            data.iter()
                .map(|p| format!("{}/data/{}/{}", node, chapter.id, p.name))
                .collect()
        })
        .unwrap_or_default();

    if pages.is_empty() {
        return Err(SourceError::PagesNotFound);
    }
    Ok(pages)
}

pub async fn get_chapter_details(
    client: &Client,
    config: &WeebDexConfig,
    manga: &SourceManga,
    chapter: &Chapter,
) -> Result<ChapterDetails> {
    let url = format!("{}/chapter/{}", API_BASE, chapter.chapter_id);
    let body = fetch_text(client, &url, REFERER).await?;
    let pages = parse_chapter_pages(&body, config.data_saver)?;
    log::debug!("WeebDex: {} pages for chapter {}", pages.len(), chapter.chapter_id);
    Ok(ChapterDetails {
        id: chapter.chapter_id.clone(),
        manga_id: manga.manga_id.clone(),
        pages,
    })
}

pub fn discover_sections() -> Vec<DiscoverSection> {
    vec![
        DiscoverSection::new("top-views-24h", "Top Views (24 Hours)", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("top-views-7d", "Top Views (7 Days)", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("top-views-30d", "Top Views (30 Days)", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("latest-updates", "Latest Updates", DiscoverSectionType::ChapterUpdates),
    ]
}

pub fn section_url(section_id: &str, page: u32, config: &WeebDexConfig) -> Result<Url> {
    let mut params: Vec<(&str, String)> = vec![
        ("limit", config.items_per_page.to_string()),
        ("page", page.to_string()),
    ];
    params.extend(DEFAULT_RATINGS.iter().map(|r| ("contentRating", r.to_string())));

    if section_id == "latest-updates" {
        if !config.original_languages.iter().any(|l| l == "all") {
            params.extend(config.original_languages.iter().map(|l| ("lang", l.clone())));
        }
        params.extend(config.excluded_tags.iter().map(|t| ("tagx", t.clone())));
        return url_with_params("/chapter/updates", &params);
    }

    let time = match section_id {
        "top-views-24h" => "24h",
        "top-views-7d" => "7d",
        "top-views-30d" => "30d",
        other => return Err(SourceError::UnknownSection(other.to_string())),
    };
    params.push(("rank", "read".to_string()));
    params.push(("time", time.to_string()));
    url_with_params("/manga/top", &params)
}

pub fn parse_top_items(body: &str, config: &WeebDexConfig) -> Result<Vec<DiscoverSectionItem>> {
    let json: MangaList = decode_json("weebdex top", body)?;
    Ok(json
        .data
        .iter()
        .filter(|m| m.has_title())
        .map(|m| DiscoverSectionItem::simple(m.id.clone(), m.title.clone(), m.cover_url(), Some(m.discover_subtitle(config))))
        .collect())
}

pub fn parse_latest_updates(body: &str, config: &WeebDexConfig) -> Result<Vec<DiscoverSectionItem>> {
    let json: ChapterFeed = decode_json("weebdex updates", body)?;
    Ok(json
        .data
        .into_iter()
        .filter_map(|c| {
            let manga = c.relationships?.manga.filter(|m| m.has_title())?;
            let subtitle = if config.force_discover_subtitle {
                manga.discover_subtitle(config)
            } else {
                let parts: Vec<String> = [
                    c.volume.filter(|v| !v.is_empty()).map(|v| format!("Vol. {}", v)),
                    c.chapter.filter(|ch| !ch.is_empty()).map(|ch| format!("Ch. {}", ch)),
                ]
                .into_iter()
                .flatten()
                .collect();
                if parts.is_empty() {
                    "New Chapter".to_string()
                } else {
                    parts.join(" ")
                }
            };
            Some(DiscoverSectionItem::ChapterUpdates {
                image_url: manga.cover_url(),
                manga_id: manga.id,
                chapter_id: c.id,
                title: manga.title,
                subtitle: Some(subtitle),
            })
        })
        .collect())
}

pub async fn discover_section_items(
    client: &Client,
    config: &WeebDexConfig,
    section_id: &str,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<DiscoverSectionItem>> {
    let page = cursor.map_or(1, |c| c.page.max(1));
    let url = section_url(section_id, page, config)?;
    let body = fetch_text(client, url.as_str(), REFERER).await?;
    let items = if section_id == "latest-updates" {
        parse_latest_updates(&body, config)?
    } else {
        parse_top_items(&body, config)?
    };
    let has_more = items.len() >= config.items_per_page as usize;
    Ok(PagedResults::with_next(items, has_more, page + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
    }

    fn values(url: &Url, key: &str) -> Vec<String> {
        query_pairs(url)
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }

    #[test]
    fn test_search_url_defaults() {
        let config = WeebDexConfig::default();
        let url = search_url(&SearchQuery::titled(" Berserk "), 1, &config).unwrap();
        assert!(url.as_str().starts_with("https://api.weebdex.org/manga?"));
        assert_eq!(values(&url, "title"), vec!["Berserk"]);
        assert_eq!(values(&url, "limit"), vec!["42"]);
        assert_eq!(values(&url, "contentRating"), vec!["safe", "suggestive", "erotica"]);
        assert_eq!(values(&url, "tmod"), vec!["AND"]);
        assert!(values(&url, "sort").is_empty());
    }

    #[test]
    fn test_search_url_merges_excluded_tags_and_hides_adult() {
        let config = WeebDexConfig {
            excluded_tags: vec!["gore".into(), "ecchi".into()],
            hide_adult_results: true,
            original_languages: vec!["ja".into()],
            ..Default::default()
        };
        let mut tags = BTreeMap::new();
        tags.insert("action".to_string(), FilterMode::Included);
        tags.insert("gore".to_string(), FilterMode::Excluded);
        let mut ratings = BTreeMap::new();
        ratings.insert("pornographic".to_string(), FilterMode::Included);
        ratings.insert("safe".to_string(), FilterMode::Included);
        let mut query = SearchQuery::titled("")
            .with_filter("tags", FilterValue::Multi(tags))
            .with_filter("contentRating", FilterValue::Multi(ratings))
            .with_filter("tagMode", FilterValue::Single("OR".into()));
        query.sort = Some("views".into());

        let url = search_url(&query, 3, &config).unwrap();
        assert!(values(&url, "title").is_empty());
        assert_eq!(values(&url, "tag"), vec!["action"]);
        assert_eq!(values(&url, "tagx"), vec!["gore", "ecchi"]);
        assert_eq!(values(&url, "contentRating"), vec!["safe"]);
        assert_eq!(values(&url, "tmod"), vec!["OR"]);
        assert_eq!(values(&url, "lang"), vec!["ja"]);
        assert_eq!(values(&url, "sort"), vec!["views"]);
        assert_eq!(values(&url, "order"), vec!["desc"]);
        assert_eq!(values(&url, "page"), vec!["3"]);
    }

    #[test]
    fn test_parse_search_results() {
        let body = r#"{"total":2,"limit":42,"page":1,"data":[
            {"id":"m1","title":"Frieren","status":"ongoing","content_rating":"suggestive",
             "relationships":{"cover":{"id":"c1","ext":".webp"}}},
            {"id":"m2","title":"  ","status":"completed"}
        ]}"#;
        let items = parse_search_results(body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].image_url, "https://srv.weebdex.net/covers/m1/c1.webp");
        assert_eq!(items[0].content_rating, ContentRating::Mature);
        assert_eq!(items[0].subtitle.as_deref(), Some("ongoing"));
    }

    #[test]
    fn test_parse_manga_details() {
        let body = r#"{"id":"m1","title":"Frieren","alt_titles":{"ja":["葬送のフリーレン"],"en":["Frieren: Beyond Journey's End"]},
            "description":"","demographic":"shounen","status":"ongoing","content_rating":"safe",
            "relationships":{"cover":{"id":"c1","ext":"jpg"},
              "authors":[{"id":"a","name":"Yamada"}],"artists":[{"id":"b","name":"Abe"}],
              "tags":[{"id":"t1","group":"genre","name":"Fantasy"}]}}"#;
        let manga = parse_manga_details(body, "m1").unwrap();
        let info = &manga.manga_info;
        assert_eq!(info.synopsis, "No description available.");
        assert_eq!(info.secondary_titles.len(), 2);
        assert_eq!(info.author.as_deref(), Some("Yamada"));
        assert_eq!(info.thumbnail_url, "https://srv.weebdex.net/covers/m1/c1.jpg");
        assert_eq!(info.tag_groups[0].tags[0].title, "Shounen");
        assert_eq!(info.tag_groups[0].tags[1].id, "status-ongoing");
        assert_eq!(info.tag_groups[1].tags[0].title, "Fantasy");
        assert_eq!(info.share_url.as_deref(), Some("https://weebdex.org/title/m1"));
    }

    #[test]
    fn test_parse_chapter_page_and_index() {
        let body = r#"{"data":[
            {"id":"c3","chapter":"3","volume":"1","language":"en","published_at":"2024-05-01T10:00:00Z",
             "relationships":{"groups":[{"id":"g","name":"Team"}]}},
            {"id":"c2","chapter":"2.5","language":"ja","created_at":"2024-04-01T10:00:00Z"},
            {"id":"c1","chapter":"1","language":"en","is_unavailable":true}
        ]}"#;
        let (chapters, raw_len) = parse_chapter_page(body, "m1").unwrap();
        assert_eq!(raw_len, 3);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].version.as_deref(), Some("Team"));
        assert_eq!(chapters[1].version.as_deref(), Some("No Group"));
        assert_eq!(chapters[1].chap_num, 2.5);
        assert!(chapters[1].publish_date.is_some());

        let config = WeebDexConfig {
            chapter_languages: vec!["en".into()],
            ..Default::default()
        };
        let kept = filter_and_index(chapters.clone(), &config);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].sorting_index, Some(0));

        let all = filter_and_index(chapters, &WeebDexConfig::default());
        assert_eq!(all[0].sorting_index, Some(1));
        assert_eq!(all[1].sorting_index, Some(0));
    }

    #[test]
    fn test_parse_chapter_pages_data_saver() {
        let body = r#"{"id":"c1","node":"https://node.weebdex.net",
            "data":[{"name":"1.png","dimensions":[1,1]}],
            "data_optimized":[{"name":"1.webp","dimensions":[1,1]}]}"#;
        assert_eq!(
            parse_chapter_pages(body, false).unwrap(),
            vec!["https://node.weebdex.net/data/c1/1.png"]
        );
        assert_eq!(
            parse_chapter_pages(body, true).unwrap(),
            vec!["https://node.weebdex.net/data/c1/1.webp"]
        );

        let no_node = r#"{"id":"c2","data_optimized":[{"name":"a.webp"}]}"#;
        assert_eq!(
            parse_chapter_pages(no_node, false).unwrap(),
            vec!["https://api.weebdex.org/data/c2/a.webp"]
        );
    }

    #[test]
    fn test_empty_chapter_is_pages_not_found() {
        let body = r#"{"id":"c1","data":[]}"#;
        assert!(matches!(parse_chapter_pages(body, false), Err(SourceError::PagesNotFound)));
    }

    #[test]
    fn test_section_urls() {
        let config = WeebDexConfig {
            excluded_tags: vec!["gore".into()],
            ..Default::default()
        };
        let top = section_url("top-views-7d", 2, &config).unwrap();
        assert!(top.as_str().starts_with("https://api.weebdex.org/manga/top?"));
        assert_eq!(values(&top, "time"), vec!["7d"]);
        assert_eq!(values(&top, "rank"), vec!["read"]);

        let latest = section_url("latest-updates", 1, &config).unwrap();
        assert!(latest.as_str().starts_with("https://api.weebdex.org/chapter/updates?"));
        assert_eq!(values(&latest, "tagx"), vec!["gore"]);

        assert!(matches!(
            section_url("nope", 1, &config),
            Err(SourceError::UnknownSection(_))
        ));
    }

    #[test]
    fn test_parse_latest_updates_subtitles() {
        let body = r#"{"data":[
            {"id":"c1","chapter":"12","volume":"2","relationships":{"manga":{"id":"m1","title":"A","status":"ongoing"}}},
            {"id":"c2","relationships":{"manga":{"id":"m2","title":"B","status":"completed"}}},
            {"id":"c3","chapter":"1","relationships":{}}
        ]}"#;
        let config = WeebDexConfig::default();
        let items = parse_latest_updates(body, &config).unwrap();
        assert_eq!(items.len(), 2);
        match &items[0] {
            DiscoverSectionItem::ChapterUpdates { subtitle, chapter_id, .. } => {
                assert_eq!(subtitle.as_deref(), Some("Vol. 2 Ch. 12"));
                assert_eq!(chapter_id, "c1");
            }
            other => panic!("unexpected item {:?}", other),
        }

        let forced = WeebDexConfig {
            force_discover_subtitle: true,
            ..Default::default()
        };
        let items = parse_latest_updates(body, &forced).unwrap();
        match &items[1] {
            DiscoverSectionItem::ChapterUpdates { subtitle, .. } => {
                assert_eq!(subtitle.as_deref(), Some("Completed"));
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_parse_top_items_year_subtitle() {
        let body = r#"{"data":[{"id":"m1","title":"A","year":2019}]}"#;
        let config = WeebDexConfig {
            discover_subtitle: "year".into(),
            ..Default::default()
        };
        let items = parse_top_items(body, &config).unwrap();
        assert_eq!(
            items[0],
            DiscoverSectionItem::simple("m1".into(), "A".into(), String::new(), Some("2019".into()))
        );
    }
}
