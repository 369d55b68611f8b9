pub mod atsumaru;
pub mod mangafire;
pub mod qiscans;
pub mod scyllacomics;
pub mod weebdex;

use crate::config::Config;
use crate::error::{Result, SourceError};
use crate::models::{
    Chapter, ChapterDetails, DiscoverSection, DiscoverSectionItem, PageCursor, PagedResults,
    SearchQuery, SearchResultItem, SourceManga,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Atsumaru = 1,
    MangaFire = 2,
    QiScans = 3,
    ScyllaComics = 4,
    WeebDex = 5,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Atsumaru,
        Source::MangaFire,
        Source::QiScans,
        Source::ScyllaComics,
        Source::WeebDex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Source::Atsumaru => "Atsumaru",
            Source::MangaFire => "MangaFire",
            Source::QiScans => "QiScans",
            Source::ScyllaComics => "ScyllaComics",
            Source::WeebDex => "WeebDex",
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Source::Atsumaru => atsumaru::BASE_URL,
            Source::MangaFire => mangafire::BASE_URL,
            Source::QiScans => qiscans::BASE_URL,
            Source::ScyllaComics => scyllacomics::BASE_URL,
            Source::WeebDex => weebdex::BASE_URL,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self> {
        parse_source(s).ok_or_else(|| SourceError::UnknownSource(s.to_string()))
    }
}

/// Resolve a source from its name or numeric id, case-insensitively
pub fn parse_source(s: &str) -> Option<Source> {
    let k = s.trim().to_lowercase();
    if let Ok(n) = k.parse::<i32>() {
        return Source::ALL.into_iter().find(|src| *src as i32 == n);
    }
    match k.as_str() {
        "atsumaru" | "atsu" | "atsu.moe" => Some(Source::Atsumaru),
        "mangafire" | "mangafire.to" => Some(Source::MangaFire),
        "qiscans" | "qi" | "qiscans.org" => Some(Source::QiScans),
        "scyllacomics" | "scylla" | "scyllacomics.xyz" => Some(Source::ScyllaComics),
        "weebdex" | "weebdex.org" => Some(Source::WeebDex),
        _ => None,
    }
}

pub async fn search(
    client: &Client,
    config: &Config,
    source: Source,
    query: &SearchQuery,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<SearchResultItem>> {
    log::debug!("{}: search {:?}", source, query.title);
    match source {
        Source::Atsumaru => atsumaru::search(client, query, cursor).await,
        Source::MangaFire => mangafire::search(client, query, cursor).await,
        Source::QiScans => qiscans::search(client, query, cursor).await,
        Source::ScyllaComics => scyllacomics::search(client, query, cursor).await,
        Source::WeebDex => weebdex::search(client, &config.weebdex, query, cursor).await,
    }
}

pub async fn get_manga_details(client: &Client, source: Source, manga_id: &str) -> Result<SourceManga> {
    match source {
        Source::Atsumaru => atsumaru::get_manga_details(client, manga_id).await,
        Source::MangaFire => mangafire::get_manga_details(client, manga_id).await,
        Source::QiScans => qiscans::get_manga_details(client, manga_id).await,
        Source::ScyllaComics => scyllacomics::get_manga_details(client, manga_id).await,
        Source::WeebDex => weebdex::get_manga_details(client, manga_id).await,
    }
}

pub async fn get_chapters(
    client: &Client,
    config: &Config,
    source: Source,
    manga: &SourceManga,
) -> Result<Vec<Chapter>> {
    match source {
        Source::Atsumaru => atsumaru::get_chapters(client, manga).await,
        Source::MangaFire => mangafire::get_chapters(client, &config.mangafire, manga).await,
        Source::QiScans => qiscans::get_chapters(client, manga).await,
        Source::ScyllaComics => scyllacomics::get_chapters(client, manga).await,
        Source::WeebDex => weebdex::get_chapters(client, &config.weebdex, manga).await,
    }
}

pub async fn get_chapter_details(
    client: &Client,
    config: &Config,
    source: Source,
    manga: &SourceManga,
    chapter: &Chapter,
) -> Result<ChapterDetails> {
    match source {
        Source::Atsumaru => atsumaru::get_chapter_details(client, manga, chapter).await,
        Source::MangaFire => mangafire::get_chapter_details(client, manga, chapter).await,
        Source::QiScans => qiscans::get_chapter_details(client, manga, chapter).await,
        Source::ScyllaComics => scyllacomics::get_chapter_details(client, manga, chapter).await,
        Source::WeebDex => weebdex::get_chapter_details(client, &config.weebdex, manga, chapter).await,
    }
}

pub async fn discover_sections(client: &Client, source: Source) -> Result<Vec<DiscoverSection>> {
    match source {
        Source::Atsumaru => atsumaru::discover_sections(client).await,
        Source::MangaFire => Ok(mangafire::discover_sections()),
        Source::QiScans => Ok(qiscans::discover_sections()),
        Source::ScyllaComics => Ok(scyllacomics::discover_sections()),
        Source::WeebDex => Ok(weebdex::discover_sections()),
    }
}

pub async fn discover_section_items(
    client: &Client,
    config: &Config,
    source: Source,
    section_id: &str,
    cursor: Option<&PageCursor>,
) -> Result<PagedResults<DiscoverSectionItem>> {
    log::debug!("{}: discover section {}", source, section_id);
    match source {
        Source::Atsumaru => atsumaru::discover_section_items(client, section_id, cursor).await,
        Source::MangaFire => mangafire::discover_section_items(client, section_id, cursor).await,
        Source::QiScans => qiscans::discover_section_items(client, section_id, cursor).await,
        Source::ScyllaComics => scyllacomics::discover_section_items(client, section_id, cursor).await,
        Source::WeebDex => {
            weebdex::discover_section_items(client, &config.weebdex, section_id, cursor).await
        }
    }
}
