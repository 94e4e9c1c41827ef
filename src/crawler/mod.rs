//! Crawler module for movie page fetching and processing
//!
//! This module contains the core crawling logic:
//! - HTTP fetching with charset-aware decoding
//! - Movie page extraction
//! - The depth-first crawl frontier
//! - The spider lifecycle and crawl loop

mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use coordinator::{Completion, Spider, SpiderState};
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use frontier::Frontier;
pub use parser::{extract_page, Credit, PageExtraction};
