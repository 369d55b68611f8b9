use crate::config::MangaFireConfig;
use crate::error::{Result, SourceError};
use crate::helpers::{element_text, encode_uri_component, last_path_segment, parse_listing_date, slugify};
use crate::models::{
    Chapter, ChapterDetails, ContentRating, DiscoverSection, DiscoverSectionItem,
    DiscoverSectionType, FilterMode, FilterValue, MangaInfo, PageCursor, PagedResults,
    SearchQuery, SearchResultItem, SourceManga, Tag, TagSection,
};
use crate::network::{decode_json, fetch_text, send_text};
use crate::vrf::{compute_signature, VrfEncoding};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

pub const BASE_URL: &str = "https://mangafire.to";

static CHAP_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Chap (\d+)").unwrap());

#[derive(Deserialize)]
struct AjaxResponse {
    #[serde(default)]
    result: Option<AjaxResult>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AjaxResult {
    Html(String),
    Object {
        #[serde(default)]
        html: Option<String>,
    },
}

impl AjaxResponse {
    fn into_html(self) -> Option<String> {
        match self.result? {
            AjaxResult::Html(html) => Some(html),
            AjaxResult::Object { html } => html,
        }
        .filter(|h| !h.is_empty())
    }
}

#[derive(Deserialize)]
struct PageResponse {
    result: PageResult,
}

#[derive(Deserialize)]
struct PageResult {
    #[serde(default)]
    images: Vec<(String, serde_json::Value, serde_json::Value)>,
}

/// One option of a search filter scraped from `/filter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub id: String,
    pub label: String,
}

/// Filter options offered by the site's search form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub types: Vec<FilterOption>,
    pub genres: Vec<FilterOption>,
    pub statuses: Vec<FilterOption>,
    pub languages: Vec<FilterOption>,
    pub years: Vec<FilterOption>,
    pub lengths: Vec<FilterOption>,
    pub sorts: Vec<FilterOption>,
}

/// The code after the last `.` of a manga id, or the whole id
pub fn short_id(manga_id: &str) -> &str {
    manga_id.rsplit('.').next().unwrap_or(manga_id)
}

/// Version label shown for a chapter language
pub fn language_version(lang: &str) -> &'static str {
    match lang {
        "fr" => "FR",
        "es" => "ES",
        "es-la" => "ESLA",
        "pt" => "PT",
        "pt-br" => "PTBR",
        "ja" => "JP",
        _ => "EN",
    }
}

pub fn language_flag(lang: &str) -> &'static str {
    match lang {
        "fr" => "🇫🇷",
        "es" => "🇪🇸",
        "es-la" => "🇲🇽",
        "pt" => "🇵🇹",
        "pt-br" => "🇧🇷",
        "ja" => "🇯🇵",
        _ => "🇬🇧",
    }
}

/// Keyword as the site signs it: NFC composed, trimmed, single spaced, lower case
pub fn normalize_keyword(title: &str) -> String {
    let composed: String = title.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

pub fn search_url(query: &SearchQuery, page: u32) -> String {
    let keyword = normalize_keyword(&query.title);
    let mut params = vec![format!("page={}", page)];

    if keyword.is_empty() {
        params.push("keyword=".to_string());
    } else {
        params.push(format!("keyword={}", encode_uri_component(&keyword).replace("%20", "+")));
        params.push(format!("vrf={}", compute_signature(&keyword, VrfEncoding::Url)));
    }

    if let Some(t) = query.single("type") {
        params.push(format!("type[]={}", encode_uri_component(t)));
    }
    if let Some(FilterValue::Multi(genres)) = query.filter("genres") {
        for (id, mode) in genres {
            let value = match mode {
                FilterMode::Excluded => format!("-{}", id),
                FilterMode::Included => id.clone(),
            };
            params.push(format!("genre[]={}", encode_uri_component(&value)));
        }
    }
    for (filter, key) in [("status", "status[]"), ("language", "language[]"), ("year", "year[]"), ("length", "length[]")] {
        if let Some(v) = query.single(filter) {
            params.push(format!("{}={}", key, encode_uri_component(v)));
        }
    }
    if let Some(sort) = query.sort.as_deref().filter(|s| !s.is_empty()) {
        params.push(format!("sort={}", encode_uri_component(sort)));
    }

    format!("{}/ajax/manga/search?{}", BASE_URL, params.join("&"))
}

/// HTML fragment carried in an AJAX envelope
pub fn parse_ajax_html(url: &str, body: &str) -> Result<Option<String>> {
    let envelope: AjaxResponse = decode_json(url, body)?;
    Ok(envelope.into_html())
}

pub fn parse_search_results(html: &str) -> (Vec<SearchResultItem>, bool) {
    let document = Html::parse_fragment(html);
    let card_selector = Selector::parse(".original.card-sm.body a.unit").unwrap();
    let title_selector = Selector::parse(".info h6").unwrap();
    let span_selector = Selector::parse(".info span").unwrap();
    let img_selector = Selector::parse("img").unwrap();

    let mut items = Vec::new();
    for card in document.select(&card_selector) {
        let title = card.select(&title_selector).next().map(|e| element_text(&e)).unwrap_or_default();
        let href = card.value().attr("href").unwrap_or_default();
        let manga_id = href.strip_prefix("/manga/").unwrap_or(href).to_string();
        let image_url = card
            .select(&img_selector)
            .next()
            .and_then(|e| e.value().attr("src"))
            .unwrap_or_default()
            .to_string();
        let chap: String = card
            .select(&span_selector)
            .map(|s| element_text(&s))
            .filter(|t| t.contains("Chap"))
            .collect();
        let subtitle = (!chap.is_empty()).then(|| chap.replace("Chap", "Ch."));

        if !title.is_empty() && !manga_id.is_empty() {
            items.push(SearchResultItem {
                manga_id,
                title,
                image_url,
                subtitle,
                content_rating: ContentRating::Everyone,
            });
        }
    }

    (items, has_next_page(&document))
}

fn has_next_page(document: &Html) -> bool {
    let next_link = Selector::parse(".page-item.active + .page-item .page-link").unwrap();
    let next_enabled = Selector::parse(".page-item.next:not(.disabled)").unwrap();
    document.select(&next_link).next().is_some() || document.select(&next_enabled).next().is_some()
}

fn looks_like_html(content_type: &str, body: &str) -> bool {
    content_type.contains("text/html") || body.trim_start().starts_with('<')
}

pub async fn search(
    client: &Client,
    query: &SearchQuery,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<SearchResultItem>> {
    let page = cursor.map_or(1, |c| c.page.max(1));
    let url = search_url(query, page);

    let request = client
        .get(&url)
        .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
        .header("x-requested-with", "XMLHttpRequest")
        .header(REFERER, format!("{}/filter", BASE_URL));
    let (headers, body) = send_text(&url, request).await?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if looks_like_html(content_type, &body) {
        log::warn!("MangaFire: expected JSON from search, got HTML: {:.200}", body);
        return Err(SourceError::Cloudflare { url });
    }

    let Some(html) = parse_ajax_html(&url, &body)? else {
        log::warn!("MangaFire: empty search result envelope");
        return Ok(PagedResults::empty());
    };
    let (items, has_next) = parse_search_results(&html);
    log::debug!("MangaFire: {} search results on page {}", items.len(), page);
    Ok(PagedResults::with_next(items, has_next, page + 1))
}

fn meta_row_links(document: &Html, label: &str) -> Vec<String> {
    let row_selector = Selector::parse("#info-rating .meta div").unwrap();
    let span_selector = Selector::parse("span").unwrap();
    let a_selector = Selector::parse("a").unwrap();
    document
        .select(&row_selector)
        .filter(|row| row.select(&span_selector).next().map(|s| element_text(&s)).as_deref() == Some(label))
        .flat_map(|row| row.select(&a_selector).map(|a| element_text(&a)).collect::<Vec<_>>())
        .collect()
}

/// Map the status line of the details page
pub fn parse_status(text: &str) -> String {
    if text.contains("Releasing") {
        "ONGOING".to_string()
    } else if text.contains("Completed") {
        "COMPLETED".to_string()
    } else if ["hiatus", "discontinued", "not yet published", "completed"]
        .iter()
        .any(|k| text.contains(k))
    {
        text.to_uppercase().split_whitespace().collect::<Vec<_>>().join("_")
    } else {
        "UNKNOWN".to_string()
    }
}

pub fn parse_manga_details(html: &str, manga_id: &str) -> SourceManga {
    let document = Html::parse_document(html);
    let text_of = |css: &str| {
        Selector::parse(css)
            .ok()
            .and_then(|s| document.select(&s).next().map(|e| element_text(&e)))
            .unwrap_or_default()
    };

    let title = text_of(".manga-detail .info h1");
    let alt_title = text_of(".manga-detail .info h6");
    let image_selector = Selector::parse(".manga-detail .poster img").unwrap();
    let thumbnail_url = document
        .select(&image_selector)
        .next()
        .and_then(|e| e.value().attr("src"))
        .unwrap_or_default()
        .to_string();

    let synopsis = Some(text_of("#synopsis .modal-content"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| text_of(".manga-detail .info .description"));

    let status_selector = Selector::parse(".manga-detail .info p").unwrap();
    let status_text = document
        .select(&status_selector)
        .last()
        .map(|e| element_text(&e))
        .unwrap_or_else(|| "Unknown".to_string());

    let authors = meta_row_links(&document, "Author:");
    let genres = meta_row_links(&document, "Genres:");
    let tag_groups = if genres.is_empty() {
        Vec::new()
    } else {
        vec![TagSection {
            id: "genres".to_string(),
            title: "Genres".to_string(),
            tags: genres
                .into_iter()
                .map(|g| Tag { id: slugify(&g), title: g })
                .collect(),
        }]
    };

    let rating = text_of("#info-rating .score .live-score").parse::<f64>().ok();

    SourceManga {
        manga_id: manga_id.to_string(),
        manga_info: MangaInfo {
            primary_title: title,
            secondary_titles: vec![alt_title].into_iter().filter(|t| !t.is_empty()).collect(),
            thumbnail_url,
            synopsis,
            author: (!authors.is_empty()).then(|| authors.join(", ")),
            status: parse_status(&status_text),
            content_rating: ContentRating::Everyone,
            rating: rating.or(Some(1.0)),
            tag_groups,
            share_url: Some(format!("{}/manga/{}", BASE_URL, manga_id)),
            ..Default::default()
        },
    }
}

pub async fn get_manga_details(client: &Client, manga_id: &str) -> Result<SourceManga> {
    let url = format!("{}/manga/{}", BASE_URL, manga_id);
    let html = fetch_text(client, &url, BASE_URL).await?;
    Ok(parse_manga_details(&html, manga_id))
}

fn listing_date(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    parse_listing_date(text, now).unwrap_or(now)
}

/// Chapters rendered directly in the manga page
pub fn parse_static_chapters(html: &str, manga_id: &str, now: DateTime<Utc>) -> Vec<Chapter> {
    let document = Html::parse_document(html);
    let item_selector = Selector::parse("ul.scroll-sm li.item, ul.list-body li.item").unwrap();
    let a_selector = Selector::parse("a").unwrap();
    let span_selector = Selector::parse("span").unwrap();

    document
        .select(&item_selector)
        .filter_map(|li| {
            let a = li.select(&a_selector).next()?;
            let spans: Vec<ElementRef> = a.select(&span_selector).collect();
            let mut chapter = Chapter::new(last_path_segment(a.value().attr("href").unwrap_or_default()), manga_id);
            chapter.title = spans.first().map(element_text).unwrap_or_default();
            chapter.chap_num = li.value().attr("data-number").and_then(|n| n.parse().ok()).unwrap_or(0.0);
            chapter.publish_date = Some(listing_date(&spans.last().map(element_text).unwrap_or_default(), now));
            chapter.version = Some("EN".to_string());
            Some(chapter)
        })
        .collect()
}

/// Upload dates keyed by chapter number, from the `/ajax/manga/...` listing
pub fn parse_chapter_dates(html: &str) -> HashMap<String, String> {
    let fragment = Html::parse_fragment(html);
    let li_selector = Selector::parse("li").unwrap();
    let span_selector = Selector::parse("span").unwrap();
    fragment
        .select(&li_selector)
        .map(|li| {
            let number = li.value().attr("data-number").unwrap_or("0").to_string();
            let date = li.select(&span_selector).last().map(|s| element_text(&s)).unwrap_or_default();
            (number, date)
        })
        .collect()
}

/// Chapters from the `/ajax/read/...` listing of one language
pub fn parse_ajax_chapters(
    html: &str,
    manga_id: &str,
    lang: &str,
    dates: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Vec<Chapter> {
    let fragment = Html::parse_fragment(html);
    let li_selector = Selector::parse("li").unwrap();
    let a_selector = Selector::parse("a").unwrap();
    let span_selector = Selector::parse("span").unwrap();

    fragment
        .select(&li_selector)
        .filter_map(|li| {
            let link = li.select(&a_selector).next()?;
            let number = link.value().attr("data-number").unwrap_or("0");
            let mut chapter = Chapter::new(link.value().attr("data-id").unwrap_or("0"), manga_id);
            chapter.title = link.select(&span_selector).next().map(|s| element_text(&s)).unwrap_or_default();
            chapter.chap_num = number.parse().unwrap_or(0.0);
            chapter.publish_date = dates.get(number).map(|d| listing_date(d, now));
            chapter.lang_code = lang.to_string();
            chapter.version = Some(language_version(lang).to_string());
            Some(chapter)
        })
        .collect()
}

async fn fetch_ajax_html(client: &Client, url: &str) -> Result<Option<String>> {
    let body = fetch_text(client, url, BASE_URL).await?;
    parse_ajax_html(url, &body)
}

pub async fn get_chapters(
    client: &Client,
    config: &MangaFireConfig,
    manga: &SourceManga,
) -> Result<Vec<Chapter>> {
    let now = Utc::now();
    let page_url = format!("{}/manga/{}", BASE_URL, manga.manga_id);
    match fetch_text(client, &page_url, BASE_URL).await {
        Ok(html) => {
            let chapters = parse_static_chapters(&html, &manga.manga_id, now);
            if !chapters.is_empty() {
                log::debug!("MangaFire: {} chapters from static HTML", chapters.len());
                return Ok(chapters);
            }
        }
        Err(e) => log::warn!("MangaFire: static chapter list failed, trying AJAX: {}", e),
    }

    let short = short_id(&manga.manga_id);
    let mut chapters = Vec::new();
    for lang in &config.languages {
        let vrf = compute_signature(&format!("{}@chapter@{}", short, lang.to_lowercase()), VrfEncoding::Url);
        let read_url = format!("{}/ajax/read/{}/chapter/{}?vrf={}", BASE_URL, short, lang, vrf);
        let manga_url = format!("{}/ajax/manga/{}/chapter/{}?vrf={}", BASE_URL, short, lang, vrf);

        let (read, dated) = tokio::join!(fetch_ajax_html(client, &read_url), fetch_ajax_html(client, &manga_url));

        let dates = match dated {
            Ok(Some(html)) => parse_chapter_dates(&html),
            Ok(None) => HashMap::new(),
            Err(e) => {
                log::warn!("MangaFire: chapter dates for {} unavailable: {}", lang, e);
                HashMap::new()
            }
        };
        match read {
            Ok(Some(html)) => chapters.extend(parse_ajax_chapters(&html, &manga.manga_id, lang, &dates, now)),
            Ok(None) => {}
            Err(e) => log::warn!("MangaFire: chapter list for {} unavailable: {}", lang, e),
        }
    }
    log::debug!("MangaFire: {} chapters from AJAX", chapters.len());
    Ok(chapters)
}

pub fn chapter_pages_url(chapter_id: &str) -> String {
    let vrf = compute_signature(&format!("chapter_id@{}", chapter_id), VrfEncoding::Url);
    format!("{}/ajax/read/chapter/{}?vrf={}", BASE_URL, chapter_id, vrf)
}

pub fn parse_chapter_pages(url: &str, body: &str) -> Result<Vec<String>> {
    let json: PageResponse = decode_json(url, body)?;
    let pages: Vec<String> = json.result.images.into_iter().map(|(url, _, _)| url).collect();
    if pages.is_empty() {
        return Err(SourceError::PagesNotFound);
    }
    Ok(pages)
}

pub async fn get_chapter_details(
    client: &Client,
    manga: &SourceManga,
    chapter: &Chapter,
) -> Result<ChapterDetails> {
    let url = chapter_pages_url(&chapter.chapter_id);
    let body = fetch_text(client, &url, BASE_URL).await?;
    let pages = parse_chapter_pages(&url, &body)?;
    Ok(ChapterDetails {
        id: chapter.chapter_id.clone(),
        manga_id: manga.manga_id.clone(),
        pages,
    })
}

pub fn discover_sections() -> Vec<DiscoverSection> {
    vec![
        DiscoverSection::new("popular_section", "Popular", DiscoverSectionType::Featured),
        DiscoverSection::new("updated_section", "Recently Updated", DiscoverSectionType::ChapterUpdates),
        DiscoverSection::new("new_manga_section", "New Manga", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("languages_section", "Languages", DiscoverSectionType::Genres),
        DiscoverSection::new("types_section", "Types", DiscoverSectionType::Genres),
        DiscoverSection::new("genres_section", "Genres", DiscoverSectionType::Genres),
    ]
}

fn chapter_label(text: &str) -> Option<String> {
    CHAP_NUMBER_RE.captures(text).map(|c| format!("Ch. {}", &c[1]))
}

/// Listing cards of `/filter` and `/added`, skipping ids already collected
pub fn parse_listing(html: &str, section_id: &str, collected_ids: &mut Vec<String>) -> Vec<DiscoverSectionItem> {
    let document = Html::parse_document(html);
    let unit_selector = Selector::parse(".unit .inner").unwrap();
    let info_selector = Selector::parse(".info > a").unwrap();
    let poster_selector = Selector::parse(".poster img").unwrap();
    let chap_selector = Selector::parse(".content[data-name='chap'] a").unwrap();
    let span_selector = Selector::parse("span").unwrap();
    let b_selector = Selector::parse("b").unwrap();

    let mut items = Vec::new();
    for unit in document.select(&unit_selector) {
        let Some(info) = unit.select(&info_selector).last() else { continue };
        let title = element_text(&info);
        let manga_id = info.value().attr("href").unwrap_or_default().replacen("/manga/", "", 1);
        if title.is_empty() || manga_id.is_empty() || collected_ids.contains(&manga_id) {
            continue;
        }
        let image_url = unit
            .select(&poster_selector)
            .next()
            .and_then(|e| e.value().attr("src"))
            .unwrap_or_default()
            .to_string();
        let first_chapter = unit.select(&chap_selector).next();
        let first_span = |a: ElementRef| a.select(&span_selector).next().map(|s| element_text(&s)).unwrap_or_default();

        let item = match section_id {
            "updated_section" => DiscoverSectionItem::ChapterUpdates {
                manga_id: manga_id.clone(),
                chapter_id: first_chapter
                    .and_then(|a| a.value().attr("href"))
                    .map(|h| last_path_segment(h).to_string())
                    .unwrap_or_default(),
                title,
                image_url,
                subtitle: first_chapter.and_then(|a| chapter_label(&element_text(&a))),
            },
            "popular_section" => {
                let english = unit.select(&chap_selector).find(|a| {
                    a.select(&b_selector).next().map(|b| element_text(&b)).as_deref() == Some("EN")
                });
                DiscoverSectionItem::Featured {
                    manga_id: manga_id.clone(),
                    title,
                    image_url,
                    supertitle: Some(english.map(first_span).and_then(|t| chapter_label(&t)).unwrap_or_default()),
                }
            }
            _ => DiscoverSectionItem::simple(
                manga_id.clone(),
                title,
                image_url,
                first_chapter.map(first_span).and_then(|t| chapter_label(&t)),
            ),
        };
        collected_ids.push(manga_id);
        items.push(item);
    }
    items
}

/// Filter options from the `/filter` page
pub fn parse_search_options(html: &str) -> SearchOptions {
    let document = Html::parse_document(html);
    let dropdown_selector = Selector::parse(".dropdown").unwrap();
    let placeholder_selector = Selector::parse("button .value").unwrap();
    let option_selector = Selector::parse(".dropdown-menu li").unwrap();
    let genre_selector = Selector::parse(".genres li").unwrap();
    let input_selector = Selector::parse("input").unwrap();
    let label_selector = Selector::parse("label").unwrap();

    let option = |li: ElementRef| -> Option<FilterOption> {
        let id = li.select(&input_selector).next()?.value().attr("value")?.to_string();
        let label = li.select(&label_selector).next().map(|l| element_text(&l))?;
        (!id.is_empty() && !label.is_empty()).then_some(FilterOption { id, label })
    };

    let mut options = SearchOptions {
        genres: document.select(&genre_selector).filter_map(option).collect(),
        ..Default::default()
    };
    for dropdown in document.select(&dropdown_selector) {
        let placeholder = dropdown
            .select(&placeholder_selector)
            .next()
            .and_then(|v| v.value().attr("data-placeholder"))
            .unwrap_or_default();
        let target = match placeholder {
            "Type" => &mut options.types,
            "Status" => &mut options.statuses,
            "Language" => &mut options.languages,
            "Year" => &mut options.years,
            "Length" => &mut options.lengths,
            "Sort" => &mut options.sorts,
            _ => continue,
        };
        target.extend(dropdown.select(&option_selector).filter_map(option));
    }
    options
}

pub async fn get_search_options(client: &Client) -> Result<SearchOptions> {
    let html = fetch_text(client, &format!("{}/filter", BASE_URL), BASE_URL).await?;
    Ok(parse_search_options(&html))
}

const GENRES: &[(&str, &str)] = &[
    ("1", "Action"), ("78", "Adventure"), ("3", "Avant Garde"), ("4", "Boys Love"),
    ("5", "Comedy"), ("77", "Demons"), ("6", "Drama"), ("7", "Ecchi"), ("79", "Fantasy"),
    ("9", "Girls Love"), ("10", "Gourmet"), ("11", "Harem"), ("530", "Horror"),
    ("13", "Isekai"), ("531", "Iyashikei"), ("15", "Josei"), ("532", "Kids"),
    ("539", "Magic"), ("533", "Mahou Shoujo"), ("534", "Martial Arts"), ("19", "Mecha"),
    ("535", "Military"), ("21", "Music"), ("22", "Mystery"), ("23", "Parody"),
    ("536", "Psychological"), ("25", "Reverse Harem"), ("26", "Romance"), ("73", "School"),
    ("28", "Sci-Fi"), ("537", "Seinen"), ("30", "Shoujo"), ("31", "Shounen"),
    ("538", "Slice of Life"), ("33", "Space"), ("34", "Sports"), ("75", "Super Power"),
    ("76", "Supernatural"), ("37", "Suspense"), ("38", "Thriller"), ("39", "Vampire"),
];

/// Type and genre shortcuts, each opening a pre-filled search
pub fn genre_items() -> Vec<DiscoverSectionItem> {
    let types = [("manhua", "Manhua"), ("manhwa", "Manhwa"), ("manga", "Manga")]
        .iter()
        .map(|(id, name)| DiscoverSectionItem::Genres {
            name: name.to_string(),
            search_query: SearchQuery::default().with_filter("type", FilterValue::Single(id.to_string())),
        });
    let genres = GENRES.iter().map(|(id, name)| {
        let selection = BTreeMap::from([(id.to_string(), FilterMode::Included)]);
        DiscoverSectionItem::Genres {
            name: name.to_string(),
            search_query: SearchQuery::default().with_filter("genres", FilterValue::Multi(selection)),
        }
    });
    types.chain(genres).collect()
}

fn option_items(options: &[FilterOption], filter_id: &str, with_flag: bool) -> Vec<DiscoverSectionItem> {
    options
        .iter()
        .map(|o| DiscoverSectionItem::Genres {
            name: if with_flag { format!("{} {}", language_flag(&o.id), o.label) } else { o.label.clone() },
            search_query: SearchQuery::default().with_filter(filter_id, FilterValue::Single(o.id.clone())),
        })
        .collect()
}

pub async fn discover_section_items(
    client: &Client,
    section_id: &str,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<DiscoverSectionItem>> {
    let page = cursor.map_or(1, |c| c.page.max(1));
    let mut collected_ids = cursor.map(|c| c.collected_ids.clone()).unwrap_or_default();

    let url = match section_id {
        "popular_section" => format!("{}/filter?keyword=&language[]=en&sort=most_viewed&page={}", BASE_URL, page),
        "updated_section" => format!("{}/filter?keyword=&language[]=en&sort=recently_updated&page={}", BASE_URL, page),
        "new_manga_section" => format!("{}/added", BASE_URL),
        "genres_section" => return Ok(PagedResults::last(genre_items())),
        "types_section" => {
            let options = get_search_options(client).await?;
            return Ok(PagedResults::last(option_items(&options.types, "type", false)));
        }
        "languages_section" => {
            let options = get_search_options(client).await?;
            return Ok(PagedResults::last(option_items(&options.languages, "language", true)));
        }
        other => return Err(SourceError::UnknownSection(other.to_string())),
    };

    let html = fetch_text(client, &url, BASE_URL).await?;
    let items = parse_listing(&html, section_id, &mut collected_ids);

    let document = Html::parse_document(&html);
    let has_next = if section_id == "popular_section" {
        let more = Selector::parse(".hpage .r").unwrap();
        document.select(&more).next().is_some()
    } else {
        let next = Selector::parse(".page-item.active + .page-item .page-link").unwrap();
        document.select(&next).next().is_some()
    };

    Ok(PagedResults {
        items,
        next: has_next.then(|| PageCursor {
            page: page + 1,
            collected_ids,
        }),
    })
}
