//! Helper functions shared by the source modules
//!
//! This module provides utility functions used throughout the crate:
//! - URI component encoding identical to the browser's `encodeURIComponent`
//! - HTML entity decoding and tag stripping for scraped text
//! - Relative and absolute date parsing for chapter listings
//! - Identifier and number cleanup
//!
//! # Examples
//!
//! ```
//! use rust_manga_sources::helpers::{encode_uri_component, strip_tags};
//!
//! assert_eq!(encode_uri_component("it's (ok)!"), "it's%20(ok)!");
//! assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());
static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+)\s*(Y|YR|YEAR|YEARS|MO|MOS|MONTH|MONTHS|W|WEEK|WEEKS|D|DAY|DAYS|H|HR|HOUR|HOURS|M|MIN|MINUTE|MINUTES|S|SEC|SECOND|SECONDS)",
    )
    .unwrap()
});
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)").unwrap());

/// Percent-encode a string the way `encodeURIComponent` does
///
/// Unreserved characters are `A-Z a-z 0-9 - _ . ! ~ * ' ( )`; everything
/// else is UTF-8 encoded with uppercase hex escapes.
pub fn encode_uri_component(s: &str) -> String {
    urlencoding::encode(s)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// Decode named and numeric HTML entities
pub fn decode_html_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_RE
        .replace_all(s, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "hellip" => '\u{2026}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        _ => return None,
    };
    Some(c)
}

/// Remove anything that looks like a markup tag
pub fn strip_tags(s: &str) -> String {
    TAG_RE.replace_all(s, "").trim().to_string()
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-case the first character
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parse the leading number of a string, like `parseFloat`
pub fn parse_leading_f64(s: &str) -> Option<f64> {
    NUMBER_RE
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Lower-case, dash-separated identifier for a display label
pub fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

/// Whether a cookie set by a Cloudflare challenge should be kept
pub fn is_cloudflare_cookie(name: &str) -> bool {
    name.starts_with("cf") || name.starts_with("_cf") || name.starts_with("__cf")
}

fn unit_millis(unit: &str) -> i64 {
    match unit {
        "Y" | "YR" | "YEAR" | "YEARS" => 31_556_952_000,
        "MO" | "MOS" | "MONTH" | "MONTHS" => 2_592_000_000,
        "W" | "WEEK" | "WEEKS" => 604_800_000,
        "D" | "DAY" | "DAYS" => 86_400_000,
        "H" | "HR" | "HOUR" | "HOURS" => 3_600_000,
        "M" | "MIN" | "MINUTE" | "MINUTES" => 60_000,
        "S" | "SEC" | "SECOND" | "SECONDS" => 1_000,
        _ => 0,
    }
}

/// Parse listing dates such as "3 days ago", "2h", "yesterday" or "just now"
pub fn parse_relative_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let upper = text.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }
    if upper.contains("JUST NOW") || upper.contains("LESS THAN AN HOUR") {
        return Some(now);
    }
    if upper.contains("YESTERDAY") {
        return Some(now - Duration::days(1));
    }
    let caps = RELATIVE_RE.captures(&upper)?;
    let amount: i64 = caps[1].parse().ok()?;
    Some(now - Duration::milliseconds(amount.saturating_mul(unit_millis(&caps[2]))))
}

/// Parse absolute dates in the formats the sources emit
pub fn parse_absolute_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%b %d, %Y", "%B %d, %Y", "%Y-%m-%d", "%d %b %Y", "%d %B %Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
        }
    }
    None
}

/// Relative date first, then absolute
pub fn parse_listing_date(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    parse_relative_date(text, now).or_else(|| parse_absolute_date(text))
}

/// Trimmed text content of an element
pub fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Last non-empty path segment of a URL or path
pub fn last_path_segment(href: &str) -> &str {
    href.split(['?', '#'])
        .next()
        .unwrap_or(href)
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_encode_uri_component_unreserved() {
        assert_eq!(encode_uri_component("AZaz09-_.!~*'()"), "AZaz09-_.!~*'()");
        assert_eq!(encode_uri_component("a b@c"), "a%20b%40c");
        assert_eq!(encode_uri_component("x/y?z=1&w"), "x%2Fy%3Fz%3D1%26w");
        assert_eq!(encode_uri_component("é"), "%C3%A9");
        assert_eq!(encode_uri_component("%21"), "%2521");
    }

    #[test]
    fn test_decode_html_entities() {
        assert_eq!(decode_html_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_html_entities("it&#39;s"), "it's");
        assert_eq!(decode_html_entities("&#x2019;"), "\u{2019}");
        assert_eq!(decode_html_entities("&unknown; stays"), "&unknown; stays");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>A <i>b</i></p>\n"), "A b");
    }

    #[test]
    fn test_parse_leading_f64() {
        assert_eq!(parse_leading_f64("12.5 extra"), Some(12.5));
        assert_eq!(parse_leading_f64("7"), Some(7.0));
        assert_eq!(parse_leading_f64("abc"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Slice of Life"), "slice-of-life");
        assert_eq!(slugify("Sci-Fi"), "sci-fi");
    }

    #[test]
    fn test_cloudflare_cookie_names() {
        assert!(is_cloudflare_cookie("cf_clearance"));
        assert!(is_cloudflare_cookie("__cf_bm"));
        assert!(!is_cloudflare_cookie("session"));
    }

    #[test]
    fn test_parse_relative_date() {
        let now = fixed_now();
        assert_eq!(parse_relative_date("3 days ago", now), Some(now - Duration::days(3)));
        assert_eq!(parse_relative_date("2 hours ago", now), Some(now - Duration::hours(2)));
        assert_eq!(parse_relative_date("5 minutes ago", now), Some(now - Duration::minutes(5)));
        assert_eq!(parse_relative_date("Yesterday", now), Some(now - Duration::days(1)));
        assert_eq!(parse_relative_date("just now", now), Some(now));
        assert_eq!(parse_relative_date("", now), None);
        assert_eq!(parse_relative_date("Oct 12, 2024", now), None);
    }

    #[test]
    fn test_parse_absolute_date() {
        let d = parse_absolute_date("Oct 12, 2024").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 10, 12, 0, 0, 0).unwrap());
        let d = parse_absolute_date("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        assert!(parse_absolute_date("sometime").is_none());
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(last_path_segment("/manga/one-piece.dkw/"), "one-piece.dkw");
        assert_eq!(last_path_segment("https://x.test/read/abc/en/chapter-1?x=1"), "chapter-1");
        assert_eq!(last_path_segment(""), "");
    }
}
