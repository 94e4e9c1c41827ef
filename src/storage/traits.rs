//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{Entity, Role};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store has not been opened")]
    NotStarted,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A complete movie as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieRecord {
    pub unique_id: Option<String>,
    pub external_id: String,
    pub title: Option<String>,
    pub year: Option<String>,
    pub region: Option<String>,
}

/// A celebrity as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CelebrityRecord {
    pub unique_id: Option<String>,
    pub external_id: String,
    pub name: Option<String>,
    pub birth_date: Option<String>,
    pub birth_place: Option<String>,
}

/// One credit linking a stored movie to a celebrity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMapping {
    pub movie_id: String,
    pub celebrity_id: String,
    pub role: Role,
}

/// Row counts of every stored shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub movies: u64,
    pub celebrities: u64,
    pub role_mappings: u64,
    pub resumable: u64,
}

/// Durable storage for crawled entities
///
/// Every operation fails with [`StorageError::NotStarted`] until [`Store::open`]
/// has succeeded, and can simply be retried after opening.
///
/// Writes are batched: nothing is durable until a `save` with `commit_now`, a
/// `save_all`, or an explicit `commit`.
pub trait Store: Send {
    /// Opens the backing database and creates missing tables. Opening twice is a no-op.
    fn open(&mut self) -> StorageResult<()>;

    // ===== Writes =====

    /// Saves one entity
    ///
    /// A complete movie is written with one role mapping per credited
    /// celebrity. A partial movie only records its id as resumable; its
    /// celebrities are not written. A celebrity is written on its own.
    fn save(&mut self, entity: Entity<'_>, commit_now: bool) -> StorageResult<()>;

    /// Saves every entity, then commits
    fn save_all(&mut self, entities: &[Entity<'_>]) -> StorageResult<()> {
        for entity in entities {
            self.save(*entity, false)?;
        }
        self.commit()
    }

    /// Makes every batched write durable
    fn commit(&mut self) -> StorageResult<()>;

    /// Returns every resumable movie id and empties the resumable shape, atomically
    fn load_and_clear_resumable_ids(&mut self) -> StorageResult<Vec<String>>;

    // ===== Inspection =====

    fn counts(&self) -> StorageResult<StoreCounts>;

    fn movies(&self) -> StorageResult<Vec<MovieRecord>>;

    fn celebrities(&self) -> StorageResult<Vec<CelebrityRecord>>;

    fn role_mappings(&self) -> StorageResult<Vec<RoleMapping>>;

    /// Resumable ids, without clearing them
    fn resumable_ids(&self) -> StorageResult<Vec<String>>;
}
