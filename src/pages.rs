//! Recovering the ordered page list of a chapter from raw markup
//!
//! Reader pages are embedded in the chapter document together with
//! thumbnails, banners and images of other chapters. The reconstruction
//! keeps the largest set of candidate images that share a directory, orders
//! it by explicit `order` metadata when the document carries any, and falls
//! back to document order otherwise.
//!
//! ```
//! use rust_manga_sources::pages::reconstruct_pages;
//!
//! let html = r#"<img src="https://cdn.example/uploads/series/x/ch1/01.webp">
//!               <img src="https://cdn.example/uploads/series/x/ch1/02.webp">"#;
//! let pages = reconstruct_pages(html).unwrap();
//! assert_eq!(pages.len(), 2);
//! ```

use crate::error::{Result, SourceError};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static DOUBLE_SLASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^:])//+").unwrap());
static FILE_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/[^/?#]+(\?.*)?$").unwrap());
static ORDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""?order"?\s*:\s*(\d+)"#).unwrap());
static FILE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.[A-Za-z0-9]+(?:\?.*)?$").unwrap());

static QISCANS: LazyLock<PageReconstructor> = LazyLock::new(|| {
    PageReconstructor::new(PageRules::qiscans()).expect("built-in page pattern compiles")
});

/// What counts as a reader image for one site
#[derive(Debug, Clone)]
pub struct PageRules {
    /// Pattern matching a complete reader image URL
    pub image_pattern: String,
    /// Path segment replaced by `/` in the final URLs
    pub redundant_segment: Option<String>,
    /// Characters after a URL searched for its `order` value
    pub order_window: usize,
}

impl PageRules {
    pub fn qiscans() -> Self {
        Self {
            image_pattern: r#"(?i)https?://[^"'\\]*?/uploads?/series/[^"'\\]+?\.(?:webp|jpe?g|png)"#
                .to_string(),
            redundant_segment: Some("/file/qiscans/".to_string()),
            order_window: 150,
        }
    }
}

/// A normalized candidate URL and where its first match ends in the raw text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    url: String,
    raw_end: usize,
}

/// Candidate URLs sharing everything but the file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub directory: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PageReconstructor {
    image_re: Regex,
    rules: PageRules,
}

impl PageReconstructor {
    pub fn new(rules: PageRules) -> Result<Self> {
        let image_re = Regex::new(&rules.image_pattern)
            .map_err(|e| SourceError::config("image_pattern", e.to_string()))?;
        Ok(Self { image_re, rules })
    }

    pub fn rules(&self) -> &PageRules {
        &self.rules
    }

    /// Matching URLs, normalized and deduplicated in document order
    pub fn extract_candidates(&self, raw: &str) -> Vec<String> {
        self.locate_candidates(raw).into_iter().map(|c| c.url).collect()
    }

    fn locate_candidates(&self, raw: &str) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        self.image_re
            .find_iter(raw)
            .map(|m| Candidate {
                url: normalize_url(m.as_str()),
                raw_end: m.end(),
            })
            .filter(|c| seen.insert(c.url.clone()))
            .collect()
    }

    pub fn reconstruct(&self, raw: &str) -> Result<Vec<String>> {
        let located = self.locate_candidates(raw);
        let raw_ends: HashMap<&str, usize> =
            located.iter().map(|c| (c.url.as_str(), c.raw_end)).collect();
        let candidates: Vec<String> = located.iter().map(|c| c.url.clone()).collect();
        let groups = group_by_directory(&candidates);
        let group_count = groups.len();

        let best = groups
            .into_iter()
            .fold(None::<DirectoryGroup>, |best, group| match best {
                Some(b) if group.urls.len() <= b.urls.len() => Some(b),
                _ => Some(group),
            })
            .filter(|g| !g.urls.is_empty())
            .ok_or(SourceError::PagesNotFound)?;

        let mut pages = best.urls;
        let orders: HashMap<String, u64> = pages
            .iter()
            .filter_map(|u| {
                let end = *raw_ends.get(u.as_str())?;
                order_after(raw, end, self.rules.order_window).map(|o| (u.clone(), o))
            })
            .collect();

        if !orders.is_empty() {
            let mut keyed: Vec<(u64, String)> = pages
                .iter()
                .map(|u| {
                    let key = orders
                        .get(u.as_str())
                        .copied()
                        .or_else(|| filename_number(u))
                        .unwrap_or(0);
                    (key, u.clone())
                })
                .collect();
            keyed.sort();
            pages = keyed.into_iter().map(|(_, u)| u).collect();
        }

        log::debug!(
            "page reconstruction: {} candidates, {} groups, {} pages, {} with order",
            candidates.len(),
            group_count,
            pages.len(),
            orders.len()
        );

        if let Some(segment) = &self.rules.redundant_segment {
            for page in pages.iter_mut() {
                if page.contains(segment.as_str()) {
                    *page = page.replacen(segment.as_str(), "/", 1);
                }
            }
        }
        Ok(pages)
    }
}

/// Ordered page URLs using the QiScans rules
pub fn reconstruct_pages(raw: &str) -> Result<Vec<String>> {
    QISCANS.reconstruct(raw)
}

/// Collapse repeated slashes that do not follow the scheme's colon
pub fn normalize_url(url: &str) -> String {
    DOUBLE_SLASH_RE.replace_all(url, "${1}/").into_owned()
}

/// The URL with its final segment and query removed
pub fn directory_of(url: &str) -> String {
    FILE_SEGMENT_RE.replace(url, "").into_owned()
}

/// Group URLs by directory, keeping first-seen order for groups and members
pub fn group_by_directory(urls: &[String]) -> Vec<DirectoryGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<DirectoryGroup> = Vec::new();
    for url in urls {
        let dir = directory_of(url);
        match index.get(&dir) {
            Some(&i) => groups[i].urls.push(url.clone()),
            None => {
                index.insert(dir.clone(), groups.len());
                groups.push(DirectoryGroup {
                    directory: dir,
                    urls: vec![url.clone()],
                });
            }
        }
    }
    groups
}

/// `order` value found shortly after the first occurrence of `url` in `raw`
pub fn explicit_order(raw: &str, url: &str, window: usize) -> Option<u64> {
    let start = raw.find(url)? + url.len();
    order_after(raw, start, window)
}

/// `order` value within `window` characters of byte offset `start`
fn order_after(raw: &str, start: usize, window: usize) -> Option<u64> {
    let tail: String = raw.get(start..)?.chars().take(window).collect();
    let tail = tail.replace("\\\"", "\"");
    ORDER_RE
        .captures(&tail)
        .and_then(|c| c[1].parse::<u64>().ok())
}

/// Trailing number of the file name, e.g. `12` for `.../page-12.webp`
pub fn filename_number(url: &str) -> Option<u64> {
    let name = url.rsplit('/').next().unwrap_or(url);
    FILE_NUMBER_RE
        .captures(name)
        .and_then(|c| c[1].parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_scheme() {
        assert_eq!(
            normalize_url("https://cdn.x//uploads///series/a.webp"),
            "https://cdn.x/uploads/series/a.webp"
        );
    }

    #[test]
    fn test_directory_of() {
        assert_eq!(
            directory_of("https://c/uploads/series/s/1/01.webp?v=2"),
            "https://c/uploads/series/s/1"
        );
    }

    #[test]
    fn test_filename_number() {
        assert_eq!(filename_number("https://c/a/page-012.webp"), Some(12));
        assert_eq!(filename_number("https://c/a/7.jpg?x=1"), Some(7));
        assert_eq!(filename_number("https://c/a/cover.png"), None);
    }

    #[test]
    fn test_explicit_order_reads_after_occurrence() {
        let raw = r#"{"order":9,"url":"https://c/p/a.webp","order":4}"#;
        assert_eq!(explicit_order(raw, "https://c/p/a.webp", 150), Some(4));
    }

    #[test]
    fn test_explicit_order_unescapes_quotes() {
        let raw = r#"{\"url\":\"https://c/p/a.webp\",\"order\":3}"#;
        assert_eq!(explicit_order(raw, "https://c/p/a.webp", 150), Some(3));
    }

    #[test]
    fn test_explicit_order_outside_window() {
        let filler = "x".repeat(200);
        let raw = format!("https://c/p/a.webp{}\"order\":1", filler);
        assert_eq!(explicit_order(&raw, "https://c/p/a.webp", 150), None);
    }

    #[test]
    fn test_group_order_is_first_seen() {
        let urls = vec![
            "https://c/b/1.webp".to_string(),
            "https://c/a/1.webp".to_string(),
            "https://c/b/2.webp".to_string(),
        ];
        let groups = group_by_directory(&urls);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].directory, "https://c/b");
        assert_eq!(groups[0].urls.len(), 2);
    }

    #[test]
    fn test_tie_keeps_first_group() {
        let raw = "https://c/uploads/series/a/1.webp https://c/uploads/series/b/1.webp";
        let pages = reconstruct_pages(raw).unwrap();
        assert_eq!(pages, vec!["https://c/uploads/series/a/1.webp"]);
    }

    #[test]
    fn test_order_found_for_repaired_double_slash_url() {
        let raw = r#"[{"url":"https://c/uploads/series/s/1//b.webp","order":5},{"url":"https://c/uploads/series/s/1/a.webp","order":2}]"#;
        assert_eq!(
            reconstruct_pages(raw).unwrap(),
            vec![
                "https://c/uploads/series/s/1/a.webp",
                "https://c/uploads/series/s/1/b.webp",
            ]
        );
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let rules = PageRules {
            image_pattern: "(".to_string(),
            redundant_segment: None,
            order_window: 10,
        };
        assert!(matches!(
            PageReconstructor::new(rules),
            Err(SourceError::Configuration { .. })
        ));
    }
}
