use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Movie-Spider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Wait between two consecutive page fetches (milliseconds)
    #[serde(rename = "fetch-gap-ms", default = "default_fetch_gap_ms")]
    pub fetch_gap_ms: u64,

    /// Maximum number of movies fetched in one run, 0 means unlimited
    #[serde(rename = "max-movies", default = "default_max_movies")]
    pub max_movies: usize,
}

impl CrawlerConfig {
    pub fn fetch_gap(&self) -> Duration {
        Duration::from_millis(self.fetch_gap_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            fetch_gap_ms: default_fetch_gap_ms(),
            max_movies: default_max_movies(),
        }
    }
}

/// The site whose movie pages are crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host of the movie site, e.g. `http://movie.douban.com`
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.crawler_name, self.crawler_version, url),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Path to the log file; logs go to stderr when unset
    #[serde(rename = "log-path", default)]
    pub log_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_path: None,
        }
    }
}

fn default_fetch_gap_ms() -> u64 {
    2000
}

fn default_max_movies() -> usize {
    15
}

fn default_base_url() -> String {
    "http://movie.douban.com".to_string()
}

fn default_crawler_name() -> String {
    "movie-spider".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_database_path() -> String {
    "movie_spider.db".to_string()
}
