//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the spider:
//! - SQLite database initialization and schema management
//! - Complete movies, celebrities and their role mappings
//! - Resumable ids of movies that still need to be crawled

mod schema;
mod sqlite;
mod traits;

pub use schema::PLACEHOLDER;
pub use sqlite::SqliteStore;
pub use traits::{
    CelebrityRecord, MovieRecord, RoleMapping, Store, StorageError, StorageResult, StoreCounts,
};
