use crate::error::{Result, SourceError};
use crate::models::{
    Chapter, ChapterDetails, ContentRating, DiscoverSection, DiscoverSectionItem,
    DiscoverSectionType, FilterMode, MangaInfo, PageCursor, PagedResults, SearchQuery,
    SearchResultItem, SourceManga, Tag, TagSection,
};
use crate::network::{decode_json, fetch_json, fetch_text, post_json};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const BASE_URL: &str = "https://atsu.moe";
pub const API_BASE: &str = "https://atsu.moe/api";
const PAGE_SIZE: u32 = 20;

static MANGA_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window\.mangaPage\s*=\s*(\{[\s\S]*?\});").unwrap());

#[derive(Deserialize)]
struct HomePageResponse {
    #[serde(rename = "homePage")]
    home_page: HomePage,
}

#[derive(Deserialize)]
struct HomePage {
    #[serde(default)]
    sections: Vec<HomeSection>,
}

#[derive(Deserialize)]
struct HomeSection {
    key: String,
    #[serde(rename = "type")]
    section_type: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    items: Option<Vec<MangaItem>>,
}

#[derive(Deserialize)]
struct MangaItem {
    id: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    item_type: Option<String>,
}

#[derive(Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<MangaItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MangaPageResponse {
    manga_page: MangaDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MangaDetails {
    title: String,
    #[serde(default)]
    english_title: Option<String>,
    #[serde(default)]
    other_names: Vec<String>,
    #[serde(default)]
    poster: Option<Poster>,
    #[serde(default)]
    synopsis: Option<String>,
    #[serde(default)]
    authors: Vec<Named>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tags: Vec<Named>,
}

#[derive(Deserialize)]
struct Poster {
    image: String,
}

#[derive(Deserialize)]
struct Named {
    #[serde(default)]
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChaptersResponse {
    #[serde(default)]
    chapters: Vec<ChapterEntry>,
    #[serde(default)]
    pages: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterEntry {
    id: String,
    #[serde(default)]
    number: f64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    created_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadChapterResponse {
    read_chapter: ReadChapter,
}

#[derive(Deserialize)]
struct ReadChapter {
    #[serde(default)]
    pages: Vec<PageEntry>,
}

#[derive(Deserialize)]
struct PageEntry {
    image: String,
    #[serde(default)]
    number: i64,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    found: u64,
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    document: SearchDocument,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchDocument {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    english_title: Option<String>,
    #[serde(default)]
    poster: String,
    #[serde(rename = "type", default)]
    doc_type: Option<String>,
}

#[derive(Deserialize)]
struct AvailableFiltersResponse {
    #[serde(default)]
    tags: Vec<Named>,
    #[serde(default)]
    types: Vec<Named>,
}

/// Body of `POST /api/explore/filteredView`
#[derive(Debug, Serialize, PartialEq)]
pub struct FilteredViewRequest {
    pub filter: ExploreFilter,
    pub page: u32,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExploreFilter {
    pub search: String,
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub types: Vec<String>,
    pub status: Vec<String>,
    pub years: Vec<u32>,
    pub min_chapters: Option<u32>,
    pub hide_bookmarked: bool,
    pub official_translation: bool,
    pub show_adult: bool,
    pub sort_by: String,
}

/// Tag and type options accepted by filtered search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableFilters {
    pub tags: Vec<Tag>,
    pub types: Vec<Tag>,
}

fn static_image(image: &str) -> String {
    format!("{}/static/{}", BASE_URL, image)
}

fn simple_item(item: MangaItem) -> DiscoverSectionItem {
    DiscoverSectionItem::simple(item.id, item.title, static_image(&item.image), item.item_type)
}

/// Status chosen through the sort option, `none` meaning any
fn status_sort(query: &SearchQuery) -> Option<&str> {
    query.sort.as_deref().filter(|s| !s.is_empty() && *s != "none")
}

pub fn filtered_view_request(query: &SearchQuery, page: u32) -> FilteredViewRequest {
    FilteredViewRequest {
        filter: ExploreFilter {
            search: query.title.trim().to_string(),
            tags: query.multi("tags", FilterMode::Included),
            exclude_tags: query.multi("tags", FilterMode::Excluded),
            types: query.multi("types", FilterMode::Included),
            status: status_sort(query).map(|s| vec![s.to_string()]).unwrap_or_default(),
            years: Vec::new(),
            min_chapters: None,
            hide_bookmarked: false,
            official_translation: false,
            show_adult: false,
            sort_by: "popularity".to_string(),
        },
        page,
    }
}

pub fn search_url(term: &str, page: u32) -> Result<Url> {
    Url::parse_with_params(
        &format!("{}/collections/manga/documents/search", BASE_URL),
        &[
            ("q", term.to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("query_by", "title,englishTitle,otherNames".to_string()),
            ("query_by_weights", "3,2,1".to_string()),
            ("include_fields", "id,title,englishTitle,poster,type".to_string()),
            ("num_typos", "4,3,2".to_string()),
            ("page", (page + 1).to_string()),
        ],
    )
    .map_err(|e| SourceError::Parse(e.to_string()))
}

/// Typesense hits and whether more pages exist after the 0-based `page`
pub fn parse_search_results(body: &str, page: u32) -> Result<(Vec<SearchResultItem>, bool)> {
    let json: SearchResponse = decode_json("atsumaru search", body)?;
    let items = json
        .hits
        .into_iter()
        .map(|hit| {
            let doc = hit.document;
            SearchResultItem {
                manga_id: doc.id,
                title: doc
                    .title
                    .filter(|t| !t.is_empty())
                    .or(doc.english_title)
                    .unwrap_or_default(),
                image_url: format!("{}{}", BASE_URL, doc.poster),
                subtitle: doc.doc_type,
                content_rating: ContentRating::Everyone,
            }
        })
        .collect();
    let has_more = json.found > u64::from(page + 1) * u64::from(PAGE_SIZE);
    Ok((items, has_more))
}

fn filtered_items(json: ItemsResponse) -> Vec<SearchResultItem> {
    json.items
        .into_iter()
        .map(|item| SearchResultItem {
            image_url: static_image(&item.image),
            manga_id: item.id,
            title: item.title,
            subtitle: item.item_type,
            content_rating: ContentRating::Everyone,
        })
        .collect()
}

pub fn parse_filtered_results(body: &str) -> Result<Vec<SearchResultItem>> {
    let json: ItemsResponse = decode_json("atsumaru filteredView", body)?;
    Ok(filtered_items(json))
}

/// Search with 0-based pages; filters or a status sort switch to the explore API
pub async fn search(
    client: &Client,
    query: &SearchQuery,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<SearchResultItem>> {
    let page = cursor.map_or(0, |c| c.page);

    if query.has_selections() || status_sort(query).is_some() {
        let url = format!("{}/explore/filteredView", API_BASE);
        let json: ItemsResponse = post_json(client, &url, BASE_URL, &filtered_view_request(query, page)).await?;
        let items = filtered_items(json);
        let has_more = items.len() >= PAGE_SIZE as usize;
        return Ok(PagedResults::with_next(items, has_more, page + 1));
    }

    let term = query.title.trim();
    if term.is_empty() {
        return Ok(PagedResults::empty());
    }

    let url = search_url(term, page)?;
    let body = fetch_text(client, url.as_str(), BASE_URL).await?;
    let (items, has_more) = parse_search_results(&body, page)?;
    log::debug!("Atsumaru: {} search results on page {}", items.len(), page);
    Ok(PagedResults::with_next(items, has_more, page + 1))
}

pub fn parse_available_filters(body: &str) -> Result<AvailableFilters> {
    let json: AvailableFiltersResponse = decode_json("atsumaru availableFilters", body)?;
    let to_tags = |list: Vec<Named>| {
        list.into_iter()
            .map(|n| Tag { id: n.id, title: n.name })
            .collect()
    };
    Ok(AvailableFilters {
        tags: to_tags(json.tags),
        types: to_tags(json.types),
    })
}

pub async fn get_search_filters(client: &Client) -> Result<AvailableFilters> {
    let url = format!("{}/explore/availableFilters", API_BASE);
    let body = fetch_text(client, &url, BASE_URL).await?;
    parse_available_filters(&body)
}

pub fn parse_manga_details(html: &str, manga_id: &str) -> Result<SourceManga> {
    let caps = MANGA_PAGE_RE
        .captures(html)
        .ok_or_else(|| SourceError::Parse(format!("no manga data in page for {}", manga_id)))?;
    let json: MangaPageResponse = decode_json(&format!("{}/manga/{}", BASE_URL, manga_id), &caps[1])?;
    let manga = json.manga_page;

    let tag_groups = if manga.tags.is_empty() {
        Vec::new()
    } else {
        vec![TagSection {
            id: "tags".to_string(),
            title: "Tags".to_string(),
            tags: manga
                .tags
                .into_iter()
                .map(|t| Tag { id: t.id, title: t.name })
                .collect(),
        }]
    };

    let mut secondary_titles = manga.other_names;
    if let Some(english) = manga.english_title.filter(|e| !e.is_empty() && *e != manga.title) {
        if !secondary_titles.contains(&english) {
            secondary_titles.insert(0, english);
        }
    }

    Ok(SourceManga {
        manga_id: manga_id.to_string(),
        manga_info: MangaInfo {
            primary_title: manga.title,
            secondary_titles,
            thumbnail_url: manga.poster.map(|p| static_image(&p.image)).unwrap_or_default(),
            synopsis: manga.synopsis.unwrap_or_default(),
            author: (!manga.authors.is_empty()).then(|| {
                manga
                    .authors
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }),
            status: manga.status.unwrap_or_default(),
            content_rating: ContentRating::Everyone,
            tag_groups,
            share_url: Some(format!("{}/manga/{}", BASE_URL, manga_id)),
            ..Default::default()
        },
    })
}

pub async fn get_manga_details(client: &Client, manga_id: &str) -> Result<SourceManga> {
    let url = format!("{}/manga/{}", BASE_URL, manga_id);
    let html = fetch_text(client, &url, BASE_URL).await?;
    parse_manga_details(&html, manga_id)
}

/// One page of the chapter listing and the total page count
pub fn parse_chapter_page(body: &str, manga_id: &str) -> Result<(Vec<Chapter>, u32)> {
    let json: ChaptersResponse = decode_json("atsumaru chapters", body)?;
    let chapters = json
        .chapters
        .into_iter()
        .map(|c| {
            let mut chapter = Chapter::new(c.id, manga_id);
            chapter.title = c.title.unwrap_or_default();
            chapter.chap_num = c.number;
            chapter.sorting_index = c.index;
            chapter.publish_date = c
                .created_at
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc));
            chapter
        })
        .collect();
    Ok((chapters, json.pages))
}

pub async fn get_chapters(client: &Client, manga: &SourceManga) -> Result<Vec<Chapter>> {
    let mut chapters = Vec::new();
    let mut page = 0;
    let mut total_pages = 1;

    while page < total_pages {
        let page_param = page.to_string();
        let url = Url::parse_with_params(
            &format!("{}/manga/chapters", API_BASE),
            &[
                ("id", manga.manga_id.as_str()),
                ("filter", "all"),
                ("sort", "desc"),
                ("page", page_param.as_str()),
            ],
        )
        .map_err(|e| SourceError::Parse(e.to_string()))?;
        let body = fetch_text(client, url.as_str(), BASE_URL).await?;
        let (batch, pages) = parse_chapter_page(&body, &manga.manga_id)?;
        chapters.extend(batch);
        total_pages = pages;
        page += 1;
    }

    log::debug!("Atsumaru: {} chapters over {} pages", chapters.len(), total_pages);
    Ok(chapters)
}

pub fn parse_chapter_pages(body: &str) -> Result<Vec<String>> {
    let json: ReadChapterResponse = decode_json("atsumaru read chapter", body)?;
    let mut pages = json.read_chapter.pages;
    pages.sort_by_key(|p| p.number);
    Ok(pages.into_iter().map(|p| format!("{}{}", BASE_URL, p.image)).collect())
}

pub async fn get_chapter_details(
    client: &Client,
    manga: &SourceManga,
    chapter: &Chapter,
) -> Result<ChapterDetails> {
    let url = Url::parse_with_params(
        &format!("{}/read/chapter", API_BASE),
        &[
            ("mangaId", manga.manga_id.as_str()),
            ("chapterId", chapter.chapter_id.as_str()),
        ],
    )
    .map_err(|e| SourceError::Parse(e.to_string()))?;
    let body = fetch_text(client, url.as_str(), BASE_URL).await?;
    Ok(ChapterDetails {
        id: chapter.chapter_id.clone(),
        manga_id: manga.manga_id.clone(),
        pages: parse_chapter_pages(&body)?,
    })
}

/// Carousel sections of the home page, without the hot updates strip
pub fn parse_discover_sections(body: &str) -> Result<Vec<DiscoverSection>> {
    let json: HomePageResponse = decode_json("atsumaru home", body)?;
    Ok(json
        .home_page
        .sections
        .into_iter()
        .filter(|s| s.section_type == "carousel" && s.key != "hot-updates")
        .map(|s| DiscoverSection {
            title: s.title.filter(|t| !t.is_empty()).unwrap_or_else(|| "Unknown".to_string()),
            id: s.key,
            section_type: DiscoverSectionType::SimpleCarousel,
        })
        .collect())
}

pub async fn discover_sections(client: &Client) -> Result<Vec<DiscoverSection>> {
    let body = fetch_text(client, &format!("{}/home/page", API_BASE), BASE_URL).await?;
    parse_discover_sections(&body)
}

/// Items of one home page section
pub fn parse_home_section_items(body: &str, section_id: &str) -> Result<Vec<DiscoverSectionItem>> {
    let json: HomePageResponse = decode_json("atsumaru home", body)?;
    Ok(json
        .home_page
        .sections
        .into_iter()
        .find(|s| s.key == section_id)
        .and_then(|s| s.items)
        .unwrap_or_default()
        .into_iter()
        .map(simple_item)
        .collect())
}

fn infinite_endpoint(section_id: &str) -> Option<&'static str> {
    match section_id {
        "trending-carousel" => Some("trending"),
        "most-bookmarked" => Some("mostBookmarked"),
        "recently-updated" => Some("recentlyUpdated"),
        "popular" => Some("popular"),
        "recently-added" => Some("recentlyAdded"),
        _ => None,
    }
}

pub async fn discover_section_items(
    client: &Client,
    section_id: &str,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<DiscoverSectionItem>> {
    if section_id == "top-rated" {
        let body = fetch_text(client, &format!("{}/home/page", API_BASE), BASE_URL).await?;
        return Ok(PagedResults::last(parse_home_section_items(&body, section_id)?));
    }

    let endpoint = infinite_endpoint(section_id)
        .ok_or_else(|| SourceError::UnknownSection(section_id.to_string()))?;
    let page = cursor.map_or(0, |c| c.page);
    let url = format!(
        "{}/infinite/{}?page={}&types=Manga,Manwha,Manhua",
        API_BASE, endpoint, page
    );
    let json: ItemsResponse = fetch_json(client, &url, BASE_URL).await?;
    let items: Vec<DiscoverSectionItem> = json.items.into_iter().map(simple_item).collect();
    let has_more = !items.is_empty();
    Ok(PagedResults::with_next(items, has_more, page + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterValue;
    use std::collections::BTreeMap;

    #[test]
    fn test_search_url_uses_one_based_page() {
        let url = search_url("solo leveling", 0).unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://atsu.moe/collections/manga/documents/search?q=solo+leveling"));
        assert!(s.contains("query_by=title%2CenglishTitle%2CotherNames"));
        assert!(s.ends_with("&page=1"));
    }

    #[test]
    fn test_parse_search_results() {
        let body = r#"{"found":45,"hits":[
            {"document":{"id":"abc","title":"","englishTitle":"Solo Leveling","poster":"/static/p.webp","type":"Manwha"}}]}"#;
        let (items, has_more) = parse_search_results(body, 1).unwrap();
        assert_eq!(items[0].title, "Solo Leveling");
        assert_eq!(items[0].image_url, "https://atsu.moe/static/p.webp");
        assert_eq!(items[0].subtitle.as_deref(), Some("Manwha"));
        assert!(has_more);
        let (_, has_more) = parse_search_results(body, 2).unwrap();
        assert!(!has_more);
    }

    #[test]
    fn test_filtered_view_request_body() {
        let tags = BTreeMap::from([
            ("action".to_string(), FilterMode::Included),
            ("gore".to_string(), FilterMode::Excluded),
        ]);
        let mut query = SearchQuery::titled(" x ").with_filter("tags", FilterValue::Multi(tags));
        query.sort = Some("Ongoing".to_string());
        let body = serde_json::to_value(filtered_view_request(&query, 2)).unwrap();
        assert_eq!(body["page"], 2);
        assert_eq!(body["filter"]["search"], "x");
        assert_eq!(body["filter"]["tags"], serde_json::json!(["action"]));
        assert_eq!(body["filter"]["excludeTags"], serde_json::json!(["gore"]));
        assert_eq!(body["filter"]["status"], serde_json::json!(["Ongoing"]));
        assert_eq!(body["filter"]["minChapters"], serde_json::Value::Null);
        assert_eq!(body["filter"]["sortBy"], "popularity");
    }

    #[test]
    fn test_status_sort_none_is_ignored() {
        let mut query = SearchQuery::titled("x");
        query.sort = Some("none".to_string());
        assert_eq!(status_sort(&query), None);
    }

    #[test]
    fn test_parse_manga_details() {
        let html = r#"<script>window.mangaPage = {"mangaPage":{"id":"abc","title":"Solo Leveling",
            "englishTitle":"Solo Leveling","otherNames":["나 혼자만 레벨업"],"poster":{"id":"p","image":"posters/abc.webp"},
            "synopsis":"Hunters.","authors":[{"id":"1","name":"Chugong"},{"id":"2","name":"Dubu"}],
            "status":"Completed","tags":[{"id":"action","name":"Action"}]}};</script>"#;
        let manga = parse_manga_details(html, "abc").unwrap();
        let info = &manga.manga_info;
        assert_eq!(info.thumbnail_url, "https://atsu.moe/static/posters/abc.webp");
        assert_eq!(info.author.as_deref(), Some("Chugong, Dubu"));
        assert_eq!(info.secondary_titles, vec!["나 혼자만 레벨업"]);
        assert_eq!(info.tag_groups[0].tags[0].id, "action");
        assert!(parse_manga_details("<html></html>", "abc").is_err());
    }

    #[test]
    fn test_parse_chapter_page() {
        let body = r#"{"chapters":[{"id":"c2","number":2,"title":"Two","createdAt":"2024-05-01T10:00:00.000Z","index":1,"pageCount":20}],"pages":3,"page":0}"#;
        let (chapters, pages) = parse_chapter_page(body, "abc").unwrap();
        assert_eq!(pages, 3);
        assert_eq!(chapters[0].chapter_id, "c2");
        assert_eq!(chapters[0].sorting_index, Some(1));
        assert!(chapters[0].publish_date.is_some());
    }

    #[test]
    fn test_parse_chapter_pages_sorted() {
        let body = r#"{"readChapter":{"id":"c","title":"t","pages":[
            {"id":"b","image":"/static/2.webp","number":2},{"id":"a","image":"/static/1.webp","number":1}]}}"#;
        assert_eq!(
            parse_chapter_pages(body).unwrap(),
            vec!["https://atsu.moe/static/1.webp", "https://atsu.moe/static/2.webp"]
        );
    }

    #[test]
    fn test_parse_discover_sections() {
        let body = r#"{"homePage":{"sections":[
            {"key":"hot-updates","type":"carousel","title":"Hot"},
            {"key":"top-rated","type":"carousel","title":"Top Rated","items":[{"id":"a","image":"i.webp","title":"A","type":"Manga"}]},
            {"key":"banner","type":"hero"},
            {"key":"popular","type":"carousel"}]}}"#;
        let sections = parse_discover_sections(body).unwrap();
        let ids: Vec<&str> = sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["top-rated", "popular"]);
        assert_eq!(sections[1].title, "Unknown");

        let items = parse_home_section_items(body, "top-rated").unwrap();
        assert_eq!(items[0].manga_id(), Some("a"));
        assert!(parse_home_section_items(body, "popular").unwrap().is_empty());
    }

    #[test]
    fn test_infinite_endpoints() {
        assert_eq!(infinite_endpoint("most-bookmarked"), Some("mostBookmarked"));
        assert_eq!(infinite_endpoint("hot-updates"), None);
    }
}
