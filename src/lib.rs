//! Movie-Spider: a resumable movie page crawler
//!
//! This crate walks the graph of movie pages reachable from a seed movie,
//! extracts titles, years, regions and credited people from each page, and
//! persists them to SQLite so an interrupted crawl can pick up where it left off.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Movie-Spider operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Spider already started; seeds must be set before start")]
    AlreadyStarted,

    #[error("Spider worker is no longer available")]
    WorkerUnavailable,

    #[error("No Tokio runtime to run the spider on: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Not a movie page URL: {0}")]
    NotAMoviePage(String),

    #[error("URL belongs to another site: {0}")]
    ForeignHost(String),
}

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Spider, SpiderState};
pub use model::{Celebrity, Entity, Movie, Role};
pub use storage::{SqliteStore, Store};
