use crate::error::{Result, SourceError};
use crate::helpers::{collapse_whitespace, decode_html_entities, strip_tags};
use crate::models::{
    Chapter, ChapterDetails, ContentRating, DiscoverSection, DiscoverSectionItem,
    DiscoverSectionType, MangaInfo, PageCursor, PagedResults, SearchQuery, SearchResultItem,
    SourceManga, Tag, TagSection,
};
use crate::network::{decode_json, fetch_text};
use crate::pages::reconstruct_pages;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::LazyLock;

pub const BASE_URL: &str = "https://qiscans.org";
pub const API_BASE: &str = "https://api.qiscans.org/api";
const REFERER: &str = "https://qiscans.org/";
const PAGE_SIZE: u32 = 20;
const DEFAULT_COVER: &str = "https://qiscans.org/wp-content/uploads/2023/05/qiscans-logo.png";
const PROXY_SEGMENT: &str = "/file/qiscans/";

static EMBEDDED_IMAGES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""images":\s*\[([^\]]+)\]"#).unwrap());
static ALT_TITLE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r", ?").unwrap());

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    posts: Vec<Post>,
    #[serde(default)]
    total_count: Option<u64>,
}

#[derive(Deserialize)]
struct PostList {
    #[serde(default)]
    data: Vec<Post>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Post {
    id: u64,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    post_title: Option<String>,
    #[serde(default)]
    post_content: Option<String>,
    #[serde(default)]
    featured_image: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    series_status: Option<String>,
    #[serde(default)]
    alternative_titles: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    chapters: Vec<ChapterEntry>,
    #[serde(rename = "_count", default)]
    count: Option<PostCount>,
}

#[derive(Deserialize)]
struct Genre {
    id: u64,
    name: String,
}

#[derive(Deserialize)]
struct PostCount {
    #[serde(default)]
    chapters: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterEntry {
    #[serde(default)]
    number: f64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    is_locked: bool,
}

#[derive(Deserialize)]
struct ChaptersResponse {
    post: Option<ChaptersPost>,
}

#[derive(Deserialize)]
struct ChaptersPost {
    #[serde(default)]
    chapters: Vec<ChapterEntry>,
}

#[derive(Deserialize)]
struct EmbeddedImage {
    url: String,
    #[serde(default)]
    order: i64,
}

impl Post {
    /// Listing entries with blank titles or URLs as titles are placeholders
    fn has_usable_title(&self) -> bool {
        match self.post_title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => !t.starts_with("http://") && !t.starts_with("https://"),
            _ => false,
        }
    }

    fn title(&self) -> String {
        decode_html_entities(self.post_title.as_deref().unwrap_or_default())
    }

    fn chapter_count_label(&self) -> String {
        format!("{} Chapters", self.count.as_ref().map_or(0, |c| c.chapters))
    }
}

fn parse_date(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn remove_proxy_segment(url: &str) -> String {
    url.replacen(PROXY_SEGMENT, "/", 1)
}

/// Normalize typographic quotes and whitespace in a search term
pub fn normalize_search_term(title: &str) -> String {
    let replaced: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            c => c,
        })
        .collect();
    collapse_whitespace(&replaced)
}

pub fn search_url(term: &str, page: u32, query: &SearchQuery) -> Result<Url> {
    let mut params: Vec<(&str, String)> = vec![
        ("perPage", PAGE_SIZE.to_string()),
        ("page", page.to_string()),
    ];
    if !term.is_empty() {
        params.push(("searchTerm", term.to_string()));
    }
    params.push(("orderBy", query.single("sort").unwrap_or("createdAt").to_string()));
    if let Some(status) = query.sort.as_deref().filter(|s| !s.is_empty()) {
        params.push(("seriesStatus", status.to_string()));
    }
    Url::parse_with_params(&format!("{}/query", API_BASE), &params)
        .map_err(|e| SourceError::Parse(e.to_string()))
}

/// Search results and the reported total count
pub fn parse_search_results(body: &str) -> Result<(Vec<SearchResultItem>, Option<u64>)> {
    let json: QueryResponse = decode_json("qiscans search", body)?;
    let items = json
        .posts
        .iter()
        .filter(|p| p.has_usable_title())
        .map(|p| SearchResultItem {
            manga_id: p.id.to_string(),
            title: p.title(),
            image_url: p.featured_image.clone().unwrap_or_default(),
            subtitle: Some(p.chapter_count_label()),
            content_rating: ContentRating::Everyone,
        })
        .collect();
    Ok((items, json.total_count))
}

pub async fn search(
    client: &Client,
    query: &SearchQuery,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<SearchResultItem>> {
    let page = cursor.map_or(1, |c| c.page.max(1));
    let term = normalize_search_term(&query.title);

    let url = search_url(&term, page, query)?;
    let body = fetch_text(client, url.as_str(), REFERER).await?;
    let (mut items, mut total) = parse_search_results(&body)?;

    if items.is_empty() && term.contains('\'') {
        let curly = term.replace('\'', "\u{2019}");
        log::debug!("QiScans: retrying search with curly apostrophes: {}", curly);
        let url = search_url(&curly, page, query)?;
        let body = fetch_text(client, url.as_str(), REFERER).await?;
        (items, total) = parse_search_results(&body)?;
    }

    let has_next = match total.filter(|t| *t > 0) {
        Some(total) => u64::from(page) * u64::from(PAGE_SIZE) < total,
        None => items.len() >= PAGE_SIZE as usize,
    };
    Ok(PagedResults::with_next(items, has_next, page + 1))
}

pub fn parse_manga_details(body: &str) -> Result<SourceManga> {
    let post: Post = decode_json("qiscans post", body)?;

    let secondary_titles = post
        .alternative_titles
        .as_deref()
        .map(|alt| {
            ALT_TITLE_SPLIT_RE
                .split(alt)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let thumbnail = post
        .featured_image
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_COVER);

    let tag_groups = if post.genres.is_empty() {
        Vec::new()
    } else {
        vec![TagSection {
            id: "genres".to_string(),
            title: "Genres".to_string(),
            tags: post
                .genres
                .iter()
                .map(|g| Tag {
                    id: g.id.to_string(),
                    title: g.name.clone(),
                })
                .collect(),
        }]
    };

    let mut info = MangaInfo {
        primary_title: post.title(),
        secondary_titles,
        thumbnail_url: remove_proxy_segment(thumbnail),
        synopsis: decode_html_entities(&strip_tags(post.post_content.as_deref().unwrap_or_default())),
        author: post.author.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from),
        artist: post.artist.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from),
        status: post.series_status.clone().unwrap_or_else(|| "UNKNOWN".to_string()),
        content_rating: ContentRating::Everyone,
        tag_groups,
        share_url: Some(format!("{}/series/{}", BASE_URL, post.slug)),
        ..Default::default()
    };
    info.additional_info.insert("postId".to_string(), post.id.to_string());
    info.additional_info.insert("slug".to_string(), post.slug.clone());

    Ok(SourceManga {
        manga_id: post.id.to_string(),
        manga_info: info,
    })
}

pub async fn get_manga_details(client: &Client, manga_id: &str) -> Result<SourceManga> {
    let url = format!("{}/v2/posts/{}", API_BASE, manga_id);
    let body = fetch_text(client, &url, REFERER).await?;
    parse_manga_details(&body)
}

/// Unlocked chapters, oldest first
pub fn parse_chapter_list(body: &str, manga_id: &str) -> Result<Vec<Chapter>> {
    let json: ChaptersResponse = decode_json("qiscans chapters", body)?;
    let mut entries = json.post.map(|p| p.chapters).unwrap_or_default();

    entries.sort_by(|a, b| {
        a.number
            .total_cmp(&b.number)
            .then_with(|| parse_date(a.created_at.as_deref()).cmp(&parse_date(b.created_at.as_deref())))
    });

    Ok(entries
        .into_iter()
        .filter(|c| !c.is_locked)
        .enumerate()
        .map(|(index, c)| {
            let mut chapter = Chapter::new(c.slug.clone(), manga_id);
            chapter.title = c.title.clone().unwrap_or_default();
            chapter.chap_num = c.number;
            chapter.sorting_index = Some(index as i64);
            chapter.publish_date = parse_date(c.created_at.as_deref());
            chapter
        })
        .collect())
}

pub async fn get_chapters(client: &Client, manga: &SourceManga) -> Result<Vec<Chapter>> {
    let post_id = match manga.manga_info.additional_info.get("postId") {
        Some(id) => id.clone(),
        None => {
            let details = get_manga_details(client, &manga.manga_id).await?;
            details
                .manga_info
                .additional_info
                .get("postId")
                .cloned()
                .ok_or_else(|| SourceError::Parse(format!("missing postId for {}", manga.manga_id)))?
        }
    };

    let url = Url::parse_with_params(
        &format!("{}/chapters", API_BASE),
        &[
            ("postId", post_id.as_str()),
            ("skip", "0"),
            ("take", "500"),
            ("order", "desc"),
            ("search", ""),
        ],
    )
    .map_err(|e| SourceError::Parse(e.to_string()))?;
    let body = fetch_text(client, url.as_str(), REFERER).await?;
    let chapters = parse_chapter_list(&body, &manga.manga_id)?;
    log::debug!("QiScans: {} chapters for {}", chapters.len(), manga.manga_id);
    Ok(chapters)
}

/// Pages from the embedded `"images"` array, if it is present and valid
pub fn parse_embedded_images(html: &str) -> Option<Vec<String>> {
    let caps = EMBEDDED_IMAGES_RE.captures(html)?;
    let json = format!("[{}]", &caps[1]);
    match serde_json::from_str::<Vec<EmbeddedImage>>(&json) {
        Ok(mut images) if !images.is_empty() => {
            images.sort_by_key(|img| img.order);
            Some(images.iter().map(|img| remove_proxy_segment(&img.url)).collect())
        }
        Ok(_) => None,
        Err(e) => {
            log::warn!("QiScans: embedded images array unparseable, falling back: {}", e);
            None
        }
    }
}

/// Reader pages of a chapter document
pub fn parse_chapter_pages(html: &str) -> Result<Vec<String>> {
    match parse_embedded_images(html) {
        Some(pages) => Ok(pages),
        None => reconstruct_pages(html),
    }
}

pub async fn get_chapter_details(
    client: &Client,
    manga: &SourceManga,
    chapter: &Chapter,
) -> Result<ChapterDetails> {
    if chapter.title.trim().to_lowercase().contains("(locked)") {
        return Err(SourceError::Locked(
            "premium chapter, coins are required to read it".to_string(),
        ));
    }

    let share_url = manga
        .manga_info
        .share_url
        .as_deref()
        .ok_or_else(|| SourceError::Parse(format!("missing share url for {}", manga.manga_id)))?;
    let series_slug = share_url
        .split('/')
        .filter(|s| !s.is_empty())
        .last()
        .ok_or_else(|| SourceError::Parse(format!("bad share url {}", share_url)))?;

    let url = format!("{}/series/{}/{}", BASE_URL, series_slug, chapter.chapter_id);
    let html = fetch_text(client, &url, REFERER).await?;
    let pages = parse_chapter_pages(&html)?;
    log::debug!("QiScans: {} pages for {}", pages.len(), url);

    Ok(ChapterDetails {
        id: chapter.chapter_id.clone(),
        manga_id: manga.manga_id.clone(),
        pages,
    })
}

pub fn discover_sections() -> Vec<DiscoverSection> {
    vec![
        DiscoverSection::new("featured", "Featured", DiscoverSectionType::ProminentCarousel),
        DiscoverSection::new("popular", "Popular Today", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("pinned", "Pinned", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("latest", "Latest Updates", DiscoverSectionType::ChapterUpdates),
        DiscoverSection::new("editors-pick", "Editor's Pick", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("new", "New Fresh Series", DiscoverSectionType::SimpleCarousel),
    ]
}

/// Request parameters and number of leading items to drop for a section
fn section_request(section_id: &str, page: u32) -> Result<(Url, usize)> {
    let (per_page, skip, extra): (u32, usize, &[(&str, &str)]) = match section_id {
        "featured" => (25, 10, &[("featured", "true")]),
        "popular" => (15, 0, &[("sortBy", "totalViews"), ("sortOrder", "desc")]),
        "pinned" => (15, 0, &[("pinned", "true")]),
        "latest" => (15, 0, &[("sortBy", "lastChapterAddedAt"), ("sortOrder", "desc")]),
        "editors-pick" => (40, 25, &[("editorsPick", "true")]),
        "new" => (15, 0, &[("sortBy", "createdAt"), ("sortOrder", "desc")]),
        other => return Err(SourceError::UnknownSection(other.to_string())),
    };
    let mut params = vec![("perPage", per_page.to_string()), ("page", page.to_string())];
    params.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
    let url = Url::parse_with_params(&format!("{}/v2/posts", API_BASE), &params)
        .map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok((url, skip))
}

pub fn parse_discover_items(body: &str, section_id: &str) -> Result<Vec<DiscoverSectionItem>> {
    let json: PostList = decode_json("qiscans posts", body)?;
    Ok(json
        .data
        .iter()
        .filter(|p| p.has_usable_title())
        .map(|p| {
            let manga_id = p.id.to_string();
            let image_url = p.featured_image.clone().unwrap_or_default();
            if section_id == "latest" {
                let latest = p.chapters.first();
                DiscoverSectionItem::ChapterUpdates {
                    manga_id,
                    chapter_id: latest.map(|c| c.slug.clone()).unwrap_or_default(),
                    title: p.title(),
                    image_url,
                    subtitle: Some(match latest {
                        Some(c) => format!("Ch. {}", c.number),
                        None => p.chapter_count_label(),
                    }),
                }
            } else {
                DiscoverSectionItem::simple(manga_id, p.title(), image_url, Some(p.chapter_count_label()))
            }
        })
        .collect())
}

pub async fn discover_section_items(
    client: &Client,
    section_id: &str,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<DiscoverSectionItem>> {
    let page = cursor.map_or(1, |c| c.page.max(1));
    let (url, skip) = section_request(section_id, page)?;
    let body = fetch_text(client, url.as_str(), REFERER).await?;
    let mut items = parse_discover_items(&body, section_id)?;

    if skip > 0 && items.len() > skip {
        items.drain(..skip);
    }

    let paginates = section_id == "pinned" || section_id == "latest";
    let has_more = paginates && items.len() >= 15;
    Ok(PagedResults::with_next(items, has_more, page + 1))
}
