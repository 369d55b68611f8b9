use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub mangafire: MangaFireConfig,
    #[serde(default)]
    pub weebdex: WeebDexConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Timeout for HTTP requests in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Enable cookie support
    #[serde(default = "default_true")]
    pub enable_cookies: bool,

    /// Enable gzip/brotli compression
    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MangaFireConfig {
    /// Languages requested when the chapter list has to be loaded over AJAX
    #[serde(default = "default_mangafire_languages")]
    pub languages: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeebDexConfig {
    /// Use the compressed page images
    #[serde(default = "default_false")]
    pub data_saver: bool,

    /// Chapter languages to keep; `all` disables filtering
    #[serde(default = "default_all")]
    pub chapter_languages: Vec<String>,

    /// Original languages of the titles returned by search and discover
    #[serde(default)]
    pub original_languages: Vec<String>,

    /// Tag ids removed from every search and from latest updates
    #[serde(default)]
    pub excluded_tags: Vec<String>,

    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,

    /// Drop erotica/pornographic ratings from searches
    #[serde(default = "default_false")]
    pub hide_adult_results: bool,

    /// Sort applied when the caller does not pick one (`none` for API order)
    #[serde(default = "default_sort")]
    pub default_sort: String,

    /// Subtitle shown on discover items: `status`, `year` or `content_rating`
    #[serde(default = "default_discover_subtitle")]
    pub discover_subtitle: String,

    /// Use the discover subtitle on latest updates instead of the chapter number
    #[serde(default = "default_false")]
    pub force_discover_subtitle: bool,
}

fn default_true() -> bool { true }
fn default_false() -> bool { false }
fn default_timeout() -> u64 { 30 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_mangafire_languages() -> Vec<String> { vec!["en".to_string()] }
fn default_all() -> Vec<String> { vec!["all".to_string()] }
fn default_items_per_page() -> u32 { 42 }
fn default_sort() -> String { "none".to_string() }
fn default_discover_subtitle() -> String { "status".to_string() }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            enable_cookies: true,
            enable_compression: true,
        }
    }
}

impl Default for MangaFireConfig {
    fn default() -> Self {
        Self {
            languages: default_mangafire_languages(),
        }
    }
}

impl Default for WeebDexConfig {
    fn default() -> Self {
        Self {
            data_saver: false,
            chapter_languages: default_all(),
            original_languages: Vec::new(),
            excluded_tags: Vec::new(),
            items_per_page: default_items_per_page(),
            hide_adult_results: false,
            default_sort: default_sort(),
            discover_subtitle: default_discover_subtitle(),
            force_discover_subtitle: false,
        }
    }
}

impl Config {
    /// Read `config.toml` from the working directory, falling back to defaults
    pub fn load() -> Self {
        let path = Path::new("config.toml");
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match Self::from_toml_str(&content) {
                    Ok(cfg) => return cfg,
                    Err(e) => log::warn!("Ignoring malformed config.toml: {}", e),
                }
            }
        }
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Config>(content)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Create the shared HTTP client from this configuration
    pub fn create_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        crate::network::build_client(self)
    }
}

impl WeebDexConfig {
    /// Whether a chapter in `lang` passes the chapter language filter
    pub fn accepts_chapter_language(&self, lang: &str) -> bool {
        self.chapter_languages.iter().any(|l| l == "all" || l == lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.http.timeout_secs, 30);
        assert_eq!(cfg.mangafire.languages, vec!["en"]);
        assert_eq!(cfg.weebdex.items_per_page, 42);
        assert_eq!(cfg.weebdex.chapter_languages, vec!["all"]);
        assert!(!cfg.weebdex.data_saver);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = Config::from_toml_str("[weebdex]\ndata_saver = true\n").unwrap();
        assert!(cfg.weebdex.data_saver);
        assert_eq!(cfg.weebdex.items_per_page, 42);
        assert!(cfg.http.enable_cookies);
    }

    #[test]
    fn test_chapter_language_filter() {
        let mut cfg = WeebDexConfig::default();
        assert!(cfg.accepts_chapter_language("ja"));
        cfg.chapter_languages = vec!["en".into()];
        assert!(cfg.accepts_chapter_language("en"));
        assert!(!cfg.accepts_chapter_language("ja"));
    }
}
