//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.

use crate::model::{Celebrity, Entity, Movie, Role};
use crate::storage::schema::{initialize_schema, loaded, stored};
use crate::storage::traits::{
    CelebrityRecord, MovieRecord, RoleMapping, Store, StorageError, StorageResult, StoreCounts,
};
use rusqlite::{params, Connection};
use std::path::PathBuf;

/// SQLite storage backend
///
/// The connection is only opened by [`Store::open`], so a store can be built on
/// one thread and opened on the worker that uses it.
pub struct SqliteStore {
    /// Database file, or None for an in-memory database
    path: Option<PathBuf>,
    conn: Option<Connection>,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            conn: None,
        }
    }

    /// A store backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            path: None,
            conn: None,
        }
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::NotStarted)
    }
}

/// Starts a batch unless one is already open
fn begin_batch(conn: &Connection) -> StorageResult<()> {
    if conn.is_autocommit() {
        conn.execute_batch("BEGIN")?;
    }
    Ok(())
}

fn commit_batch(conn: &Connection) -> StorageResult<()> {
    if !conn.is_autocommit() {
        conn.execute_batch("COMMIT")?;
    }
    Ok(())
}

fn save_movie(conn: &Connection, movie: &Movie) -> StorageResult<()> {
    if movie.is_partial() {
        conn.execute(
            "INSERT OR IGNORE INTO partial_movies (external_id) VALUES (?1)",
            params![movie.id],
        )?;
        return Ok(());
    }

    conn.execute(
        "INSERT OR REPLACE INTO movies (unique_id, external_id, title, year, region)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            stored(&movie.unique_id()),
            movie.id,
            stored(&movie.title),
            stored(&movie.year),
            stored(&movie.region),
        ],
    )?;
    conn.execute(
        "DELETE FROM partial_movies WHERE external_id = ?1",
        params![movie.id],
    )?;

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO movie_roles (movie_external_id, celebrity_external_id, role)
         VALUES (?1, ?2, ?3)",
    )?;
    for celebrity in &movie.celebrities {
        match celebrity.role {
            Some(role) => {
                stmt.execute(params![movie.id, celebrity.id, role.code()])?;
            }
            None => tracing::debug!(
                "Celebrity {} on movie {} has no role, not mapped",
                celebrity.id,
                movie.id
            ),
        }
    }

    Ok(())
}

fn save_celebrity(conn: &Connection, celebrity: &Celebrity) -> StorageResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO celebrities (unique_id, external_id, name, birth_date, birth_place)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            stored(&celebrity.unique_id),
            celebrity.id,
            stored(&celebrity.name),
            stored(&celebrity.birth_date),
            stored(&celebrity.birth_place),
        ],
    )?;
    Ok(())
}

fn count_rows(conn: &Connection, table: &str) -> StorageResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as u64)
}

impl Store for SqliteStore {
    fn open(&mut self) -> StorageResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let conn = match &self.path {
            Some(path) => {
                let conn = Connection::open(path)?;
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA temp_store = MEMORY;
                ",
                )?;
                conn
            }
            None => Connection::open_in_memory()?,
        };

        initialize_schema(&conn)?;
        tracing::debug!(
            "Opened store at {}",
            self.path
                .as_deref()
                .map_or_else(|| ":memory:".into(), |p| p.display().to_string())
        );

        self.conn = Some(conn);
        Ok(())
    }

    fn save(&mut self, entity: Entity<'_>, commit_now: bool) -> StorageResult<()> {
        let conn = self.conn()?;
        begin_batch(conn)?;
        tracing::trace!("Saving {} {}", entity.kind(), entity.external_id());

        match entity {
            Entity::Movie(movie) => save_movie(conn, movie)?,
            Entity::Celebrity(celebrity) => save_celebrity(conn, celebrity)?,
        }

        if commit_now {
            commit_batch(conn)?;
        }
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        commit_batch(self.conn()?)
    }

    fn load_and_clear_resumable_ids(&mut self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        begin_batch(conn)?;

        let ids = {
            let mut stmt = conn.prepare("SELECT external_id FROM partial_movies ORDER BY rowid")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        conn.execute("DELETE FROM partial_movies", [])?;

        commit_batch(conn)?;
        tracing::debug!("Loaded and cleared {} resumable ids", ids.len());
        Ok(ids)
    }

    fn counts(&self) -> StorageResult<StoreCounts> {
        let conn = self.conn()?;
        Ok(StoreCounts {
            movies: count_rows(conn, "movies")?,
            celebrities: count_rows(conn, "celebrities")?,
            role_mappings: count_rows(conn, "movie_roles")?,
            resumable: count_rows(conn, "partial_movies")?,
        })
    }

    fn movies(&self) -> StorageResult<Vec<MovieRecord>> {
        let mut stmt = self.conn()?.prepare(
            "SELECT unique_id, external_id, title, year, region FROM movies ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(MovieRecord {
                unique_id: loaded(row.get(0)?),
                external_id: row.get(1)?,
                title: loaded(row.get(2)?),
                year: loaded(row.get(3)?),
                region: loaded(row.get(4)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn celebrities(&self) -> StorageResult<Vec<CelebrityRecord>> {
        let mut stmt = self.conn()?.prepare(
            "SELECT unique_id, external_id, name, birth_date, birth_place
             FROM celebrities ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CelebrityRecord {
                unique_id: loaded(row.get(0)?),
                external_id: row.get(1)?,
                name: loaded(row.get(2)?),
                birth_date: loaded(row.get(3)?),
                birth_place: loaded(row.get(4)?),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn role_mappings(&self) -> StorageResult<Vec<RoleMapping>> {
        let mut stmt = self.conn()?.prepare(
            "SELECT movie_external_id, celebrity_external_id, role FROM movie_roles ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(movie_id, celebrity_id, code)| {
                let role = Role::from_code(code).ok_or_else(|| StorageError::Corrupt {
                    table: "movie_roles",
                    detail: format!("unknown role code {}", code),
                })?;
                Ok(RoleMapping {
                    movie_id,
                    celebrity_id,
                    role,
                })
            })
            .collect()
    }

    fn resumable_ids(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn()?
            .prepare("SELECT external_id FROM partial_movies ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
