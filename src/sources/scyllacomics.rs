use crate::error::{Result, SourceError};
use crate::helpers::{element_text, last_path_segment, parse_listing_date};
use crate::models::{
    Chapter, ChapterDetails, ContentRating, DiscoverSection, DiscoverSectionItem,
    DiscoverSectionType, FilterMode, FilterValue, MangaInfo, PageCursor, PagedResults,
    SearchQuery, SearchResultItem, SourceManga, Tag, TagSection,
};
use crate::network::fetch_text;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, Url};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

pub const BASE_URL: &str = "https://scyllacomics.xyz";
const REFERER: &str = "https://scyllacomics.xyz/";

static CHAPTER_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:chapter|ch.*?)(\d+\.?\d?(?:[-_]\d+)?)|(\d+\.?\d?(?:[-_]\d+)?)$").unwrap()
});
static PAGE_OF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Page\s+(\d+)\s+of\s+(\d+)").unwrap());

fn absolute_image(src: &str) -> String {
    let src = src.trim();
    if src.starts_with('/') {
        format!("{}{}", BASE_URL, src)
    } else {
        src.to_string()
    }
}

fn attr_of(scope: ElementRef, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    scope
        .select(&selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(str::to_string)
}

fn first_text(scope: ElementRef, css: &str) -> String {
    Selector::parse(css)
        .ok()
        .and_then(|s| scope.select(&s).next().map(|e| element_text(&e)))
        .unwrap_or_default()
}

/// Nearest ancestor matching `css`
fn closest<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| selector.matches(e))
}

/// Elements matching `css` whose first `span` mentions `label`
fn labelled<'a>(document: &'a Html, css: &str, label: &str) -> Vec<ElementRef<'a>> {
    let Ok(selector) = Selector::parse(css) else { return Vec::new() };
    let span_selector = Selector::parse("span").unwrap();
    document
        .select(&selector)
        .filter(|e| e.select(&span_selector).any(|s| element_text(&s).contains(label)))
        .collect()
}

pub fn search_url(query: &SearchQuery, page: u32) -> Result<Url> {
    let mut params: Vec<(&str, String)> = vec![
        ("title", query.title.trim().to_string()),
        ("type", String::new()),
        ("status", String::new()),
        ("page", page.to_string()),
    ];
    for genre in query.multi("genres", FilterMode::Included) {
        params.push(("genre[]", genre));
    }
    let strict = query
        .single("strict")
        .is_some_and(|v| v.eq_ignore_ascii_case("on") || v.eq_ignore_ascii_case("true"));
    if strict {
        params.push(("strict", "on".to_string()));
    }
    Url::parse_with_params(&format!("{}/manga", BASE_URL), &params)
        .map_err(|e| SourceError::Parse(e.to_string()))
}

pub fn parse_search_results(html: &str) -> Vec<SearchResultItem> {
    let document = Html::parse_document(html);
    let card_selector = Selector::parse("div#card-real").unwrap();

    document
        .select(&card_selector)
        .filter_map(|card| {
            let image_url = absolute_image(&attr_of(card, "img.lazyload", "data-src").unwrap_or_default());
            let title = attr_of(card, "img.lazyload", "alt")
                .unwrap_or_else(|| first_text(card, "h2.text-sm.font-semibold"));
            let href = attr_of(card, "a", "href").unwrap_or_default();
            let manga_id = last_path_segment(&href).to_string();
            if manga_id.is_empty() || title.trim().is_empty() {
                return None;
            }
            Some(SearchResultItem {
                manga_id,
                title: title.trim().to_string(),
                image_url,
                subtitle: None,
                content_rating: ContentRating::Adult,
            })
        })
        .collect()
}

/// Whether the "Page X of Y" indicator says this is the last page
pub fn is_last_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    let nav_selector = Selector::parse("nav h3").unwrap();
    let text: String = document.select(&nav_selector).map(|e| element_text(&e)).collect();
    match PAGE_OF_RE.captures(&text) {
        Some(caps) => {
            let current: u32 = caps[1].parse().unwrap_or(0);
            let last: u32 = caps[2].parse().unwrap_or(0);
            current >= last
        }
        None => true,
    }
}

pub async fn search(
    client: &Client,
    query: &SearchQuery,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<SearchResultItem>> {
    let page = cursor.map_or(1, |c| c.page.max(1));
    let url = search_url(query, page)?;
    let html = fetch_text(client, url.as_str(), REFERER).await?;
    let items = parse_search_results(&html);
    log::debug!("ScyllaComics: {} search results on page {}", items.len(), page);
    Ok(PagedResults::with_next(items, !is_last_page(&html), page + 1))
}

/// Heading text without the badges nested in `span` children
fn heading_without_spans(heading: ElementRef) -> String {
    let mut text = String::new();
    for child in heading.children() {
        match child.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() != "span" => {
                if let Some(el) = ElementRef::wrap(child) {
                    text.extend(el.text());
                }
            }
            _ => {}
        }
    }
    text.trim().to_string()
}

pub fn parse_manga_details(html: &str, manga_id: &str) -> SourceManga {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let heading_selector = Selector::parse("h2.text-2xl.font-bold").unwrap();
    let primary_title = document
        .select(&heading_selector)
        .next()
        .map(heading_without_spans)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| first_text(root, "h1.post-title, h1"));

    let mut secondary_titles = Vec::new();
    if let Some(alt) = attr_of(root, "img.lazyload", "alt").map(|a| a.trim().to_string()) {
        if !alt.is_empty() {
            secondary_titles.push(alt);
        }
    }
    let span_selector = Selector::parse("span").unwrap();
    if let Some(block) = labelled(&document, "div.flex.gap-1", "Alternative Titles").first() {
        if let Some(alt) = block.select(&span_selector).last().map(|s| element_text(&s)) {
            if !alt.is_empty() {
                secondary_titles.push(alt);
            }
        }
    }

    let image = attr_of(root, "div.fixed-img img.lazyload", "data-src")
        .or_else(|| attr_of(root, "section img", "src"))
        .unwrap_or_default();
    let thumbnail_url = absolute_image(&image).replace(' ', "%20");

    let capitalize_selector = Selector::parse("span.capitalize").unwrap();
    let a_selector = Selector::parse("a").unwrap();
    let author = labelled(&document, "p", "Author")
        .first()
        .and_then(|p| p.select(&capitalize_selector).next())
        .map(|s| element_text(&s))
        .filter(|a| !a.is_empty())
        .or_else(|| {
            labelled(&document, "div", "Author")
                .last()
                .and_then(|d| d.select(&a_selector).next())
                .map(|a| element_text(&a))
                .filter(|a| !a.is_empty())
        });

    let description_selector = Selector::parse("div.flex.flex-col.gap-1 > p").unwrap();
    let synopsis = document
        .select(&description_selector)
        .map(|p| element_text(&p))
        .collect::<Vec<_>>()
        .join("\n\n");

    let tag_selector = Selector::parse("div.flex.flex-wrap.gap-1 a").unwrap();
    let mut seen = HashSet::new();
    let tags: Vec<Tag> = document
        .select(&tag_selector)
        .map(|a| element_text(&a))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .map(|t| Tag { id: t.replace(' ', "_"), title: t })
        .collect();

    let raw_status = labelled(&document, "p", "Status")
        .first()
        .and_then(|p| p.select(&capitalize_selector).last())
        .map(|s| element_text(&s))
        .unwrap_or_default();
    let status = if raw_status.to_uppercase().contains("COMPLETE") { "Completed" } else { "Ongoing" };

    SourceManga {
        manga_id: manga_id.to_string(),
        manga_info: MangaInfo {
            primary_title,
            secondary_titles,
            thumbnail_url,
            synopsis,
            author,
            status: status.to_string(),
            content_rating: ContentRating::Adult,
            tag_groups: vec![TagSection {
                id: "0".to_string(),
                title: "genres".to_string(),
                tags,
            }],
            share_url: Some(format!("{}/manga/{}", BASE_URL, manga_id)),
            ..Default::default()
        },
    }
}

pub async fn get_manga_details(client: &Client, manga_id: &str) -> Result<SourceManga> {
    let url = format!("{}/manga/{}", BASE_URL, manga_id);
    let html = fetch_text(client, &url, REFERER).await?;
    Ok(parse_manga_details(&html, manga_id))
}

/// Chapter number encoded in a chapter URL, e.g. `chapter-12-5` is 12.5
pub fn chapter_number(href: &str) -> f64 {
    let Some(caps) = CHAPTER_NUMBER_RE.captures(href) else { return 0.0 };
    let raw = match (caps.get(1), caps.get(2)) {
        (Some(m), _) => m.as_str().replace(['-', '_'], "."),
        (None, Some(m)) => m.as_str().to_string(),
        _ => return 0.0,
    };
    crate::helpers::parse_leading_f64(&raw).unwrap_or(0.0)
}

pub fn parse_chapters(html: &str, manga_id: &str, now: DateTime<Utc>) -> Result<Vec<Chapter>> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("#chapters-list a").unwrap();
    let name_selector = Selector::parse("div.flex > span").unwrap();
    let date_selector = Selector::parse("div.flex.justify-between.gap-3 > span.text-gray-500").unwrap();

    let links: Vec<ElementRef> = document.select(&link_selector).collect();
    let total = links.len();
    let mut chapters = Vec::with_capacity(total);

    for (i, link) in links.into_iter().enumerate() {
        let href = link.value().attr("href").unwrap_or_default();
        let chapter_id = last_path_segment(href);
        if chapter_id.is_empty() || chapter_id == "#" {
            return Err(SourceError::Parse(format!(
                "could not parse a chapter id for {} from {:?}",
                manga_id, href
            )));
        }

        let mut chapter = Chapter::new(chapter_id, manga_id);
        chapter.title = link.select(&name_selector).next().map(|s| element_text(&s)).unwrap_or_default();
        chapter.chap_num = chapter_number(href);
        chapter.sorting_index = Some((total - i) as i64);
        chapter.publish_date = link
            .select(&date_selector)
            .last()
            .and_then(|s| parse_listing_date(&element_text(&s), now));
        chapters.push(chapter);
    }

    if chapters.is_empty() {
        return Err(SourceError::Parse(format!("no chapters found for {}", manga_id)));
    }
    Ok(chapters)
}

pub async fn get_chapters(client: &Client, manga: &SourceManga) -> Result<Vec<Chapter>> {
    let url = format!("{}/manga/{}", BASE_URL, manga.manga_id);
    let html = fetch_text(client, &url, REFERER).await?;
    let chapters = parse_chapters(&html, &manga.manga_id, Utc::now())?;
    log::debug!("ScyllaComics: {} chapters for {}", chapters.len(), manga.manga_id);
    Ok(chapters)
}

pub fn parse_chapter_pages(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let img_selector = Selector::parse("div#chapter-container img").unwrap();
    document
        .select(&img_selector)
        .filter_map(|img| {
            let src = img
                .value()
                .attr("src")
                .filter(|s| !s.is_empty())
                .or_else(|| img.value().attr("data-src"))?;
            (!src.is_empty()).then(|| src.to_string())
        })
        .collect()
}

pub async fn get_chapter_details(
    client: &Client,
    manga: &SourceManga,
    chapter: &Chapter,
) -> Result<ChapterDetails> {
    let url = format!("{}/manga/{}/{}", BASE_URL, manga.manga_id, chapter.chapter_id);
    let html = fetch_text(client, &url, REFERER).await?;
    Ok(ChapterDetails {
        id: chapter.chapter_id.clone(),
        manga_id: manga.manga_id.clone(),
        pages: parse_chapter_pages(&html),
    })
}

pub fn discover_sections() -> Vec<DiscoverSection> {
    vec![
        DiscoverSection::new("featured", "Featured", DiscoverSectionType::ProminentCarousel),
        DiscoverSection::new("most_popular", "Most Popular", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("recently_added", "Recently Added", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("recent_chapters", "Recent Chapters", DiscoverSectionType::SimpleCarousel),
        DiscoverSection::new("genres", "Genres", DiscoverSectionType::Genres),
    ]
}

fn card_image(scope: ElementRef) -> String {
    attr_of(scope, "img[data-src]", "data-src")
        .or_else(|| attr_of(scope, "img", "src"))
        .unwrap_or_default()
}

fn recent_chapter_subtitle(link: ElementRef) -> Option<String> {
    let card = closest(link, "div.flex.flex-col.gap-2")?;
    let block_selector = Selector::parse("div.flex.flex-col").ok()?;
    let block = card
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| block_selector.matches(c))
        .last()?;
    let chapter = first_text(block, "a b");
    if chapter.is_empty() {
        return None;
    }
    let ago = first_text(block, "span.text-xs");
    Some(if ago.is_empty() {
        format!("Chp {}", chapter)
    } else {
        format!("Chp {} • {}", chapter, ago)
    })
}

/// Manga cards inside `container_css`, with a slider fallback
pub fn parse_cards(html: &str, container_css: &str, section_id: &str) -> Vec<DiscoverSectionItem> {
    let document = Html::parse_document(html);
    let Ok(container_selector) = Selector::parse(container_css) else { return Vec::new() };
    let link_selector = Selector::parse("a[href*='/manga/']").unwrap();
    let slide_selector = Selector::parse("swiper-slide").unwrap();

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    let mut push = |manga_id: &str, title: String, image: String, subtitle: Option<String>| {
        items.push(DiscoverSectionItem::SimpleCarousel {
            manga_id: manga_id.to_string(),
            title: title.trim().to_string(),
            image_url: absolute_image(&image),
            subtitle,
            content_rating: Some(ContentRating::Adult),
        });
    };

    for container in document.select(&container_selector) {
        for link in container.select(&link_selector) {
            let manga_id = last_path_segment(link.value().attr("href").unwrap_or_default());
            if manga_id.is_empty() || seen.contains(manga_id) {
                continue;
            }
            let slide = closest(link, "swiper-slide");

            let mut image = card_image(link);
            if image.is_empty() {
                if let Some(slide) = slide {
                    image = card_image(slide);
                }
            }
            let mut title = attr_of(link, "img", "alt").unwrap_or_else(|| first_text(link, "h2"));
            if title.trim().is_empty() {
                if let Some(slide) = slide {
                    title = Some(first_text(slide, "h2"))
                        .filter(|t| !t.is_empty())
                        .or_else(|| attr_of(slide, "img", "alt"))
                        .unwrap_or_default();
                }
            }
            if title.trim().is_empty() {
                continue;
            }

            let subtitle = if section_id == "recent_chapters" { recent_chapter_subtitle(link) } else { None };
            seen.insert(manga_id.to_string());
            push(manga_id, title, image, subtitle);
        }
    }

    if seen.is_empty() {
        for slide in document.select(&container_selector).flat_map(|c| c.select(&slide_selector)) {
            let href = attr_of(slide, "a[href*='/manga/']", "href").unwrap_or_default();
            let manga_id = last_path_segment(&href).to_string();
            if manga_id.is_empty() || seen.contains(&manga_id) {
                continue;
            }
            let title = Some(first_text(slide, "h2"))
                .filter(|t| !t.is_empty())
                .or_else(|| attr_of(slide, "img", "alt"))
                .unwrap_or_default();
            if title.trim().is_empty() {
                continue;
            }
            push(&manga_id, title, card_image(slide), None);
            seen.insert(manga_id);
        }
    }
    items
}

/// Whether the pagination bar links to the page after the active one
pub fn has_next_pagination(html: &str, fallback_page: u32) -> (bool, u32) {
    let document = Html::parse_document(html);
    let active_selector = Selector::parse("li.pagination-link.pagination-active span").unwrap();
    let link_selector = Selector::parse("li.pagination-link").unwrap();

    let current = document
        .select(&active_selector)
        .next()
        .and_then(|s| element_text(&s).parse::<u32>().ok())
        .unwrap_or(fallback_page);
    let has_next = document
        .select(&link_selector)
        .any(|li| element_text(&li).parse::<u32>().ok() == Some(current + 1));
    (has_next, current)
}

/// Genre checkboxes of the `/manga` filter form
pub fn parse_genre_tags(html: &str) -> TagSection {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("div.flex.items-center.gap-2").unwrap();

    let tags = document
        .select(&row_selector)
        .filter_map(|row| {
            let title = first_text(row, "label");
            let raw_id = attr_of(row, "input", "id").unwrap_or_else(|| title.clone());
            if title.is_empty() || raw_id.is_empty() {
                return None;
            }
            let id = raw_id
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
                .collect();
            Some(Tag { id, title })
        })
        .collect();

    TagSection {
        id: "genres".to_string(),
        title: "Genres".to_string(),
        tags,
    }
}

pub async fn discover_section_items(
    client: &Client,
    section_id: &str,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<DiscoverSectionItem>> {
    let page = cursor.map_or(1, |c| c.page.max(1));

    match section_id {
        "featured" => {
            let html = fetch_text(client, BASE_URL, REFERER).await?;
            Ok(PagedResults::last(parse_cards(&html, "#home-slider", section_id)))
        }
        "most_popular" if page == 1 => {
            let html = fetch_text(client, BASE_URL, REFERER).await?;
            Ok(PagedResults::with_next(parse_cards(&html, "#popular-cards", section_id), true, 2))
        }
        "most_popular" => {
            let url = format!("{}/manga?page={}", BASE_URL, page - 1);
            let html = fetch_text(client, &url, REFERER).await?;
            let items = parse_cards(&html, "div#card-real", section_id);
            let (has_next, _) = has_next_pagination(&html, page - 1);
            Ok(PagedResults::with_next(items, has_next, page + 1))
        }
        "recently_added" | "recent_chapters" => {
            let (url, container) = if section_id == "recently_added" {
                (format!("{}/manga?page={}", BASE_URL, page), "div#card-real")
            } else if page > 1 {
                (format!("{}/?page={}", BASE_URL, page), "section:last-of-type")
            } else {
                (BASE_URL.to_string(), "section:last-of-type")
            };
            let html = fetch_text(client, &url, REFERER).await?;
            let items = parse_cards(&html, container, section_id);
            let (has_next, current) = has_next_pagination(&html, page);
            Ok(PagedResults::with_next(items, has_next, current + 1))
        }
        "genres" => {
            let html = fetch_text(client, &format!("{}/manga", BASE_URL), REFERER).await?;
            let items = parse_genre_tags(&html)
                .tags
                .into_iter()
                .map(|tag| DiscoverSectionItem::Genres {
                    name: tag.title,
                    search_query: SearchQuery::default().with_filter(
                        "genres",
                        FilterValue::Multi(BTreeMap::from([(tag.id, FilterMode::Included)])),
                    ),
                })
                .collect();
            Ok(PagedResults::last(items))
        }
        other => Err(SourceError::UnknownSection(other.to_string())),
    }
}
