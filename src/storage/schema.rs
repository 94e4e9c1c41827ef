//! Database schema definitions
//!
//! Text columns never hold NULL. Values the crawler doesn't know are written
//! as [`PLACEHOLDER`] instead.

/// Stored in place of an unset text value
pub const PLACEHOLDER: &str = "_NaN_";

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Complete movies
CREATE TABLE IF NOT EXISTS movies (
    unique_id TEXT NOT NULL,
    external_id TEXT NOT NULL PRIMARY KEY,
    title TEXT NOT NULL,
    year TEXT NOT NULL,
    region TEXT NOT NULL
);

-- Celebrities credited on complete movies
CREATE TABLE IF NOT EXISTS celebrities (
    unique_id TEXT NOT NULL,
    external_id TEXT NOT NULL PRIMARY KEY,
    name TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    birth_place TEXT NOT NULL
);

-- Role codes: 1 = director, 2 = scriptwriter, 3 = actor
CREATE TABLE IF NOT EXISTS movie_roles (
    movie_external_id TEXT NOT NULL,
    celebrity_external_id TEXT NOT NULL,
    role INTEGER NOT NULL,
    UNIQUE(movie_external_id, celebrity_external_id, role)
);

CREATE INDEX IF NOT EXISTS idx_movie_roles_movie ON movie_roles(movie_external_id);

-- Movie ids left to crawl by a later run
CREATE TABLE IF NOT EXISTS partial_movies (
    external_id TEXT NOT NULL PRIMARY KEY
);
"#;

/// Initializes the database schema
///
/// Safe to run against an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Value written for an optional text field
pub fn stored(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(PLACEHOLDER)
}

/// Optional text field read back from a stored value
pub fn loaded(value: String) -> Option<String> {
    (value != PLACEHOLDER).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["movies", "celebrities", "movie_roles", "partial_movies"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_placeholder_roundtrip() {
        assert_eq!(stored(&None), PLACEHOLDER);
        assert_eq!(stored(&Some("1999".to_string())), "1999");
        assert_eq!(loaded(PLACEHOLDER.to_string()), None);
        assert_eq!(loaded("1999".to_string()).as_deref(), Some("1999"));
    }
}
