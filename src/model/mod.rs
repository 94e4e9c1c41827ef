//! Entity model for crawled data
//!
//! - `Movie`: the page-level record, one per crawled movie page
//! - `Celebrity`: a person credited on a movie page under a `Role`
//! - `Entity`: borrowed view handed to the store, which dispatches on it

mod celebrity;
mod movie;

pub use celebrity::{Celebrity, Role};
pub use movie::Movie;

/// A record the store knows how to persist
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Movie(&'a Movie),
    Celebrity(&'a Celebrity),
}

impl<'a> Entity<'a> {
    /// The external (site) id of the wrapped record
    pub fn external_id(&self) -> &'a str {
        match self {
            Self::Movie(movie) => &movie.id,
            Self::Celebrity(celebrity) => &celebrity.id,
        }
    }

    /// Short name of the record kind, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Movie(_) => "movie",
            Self::Celebrity(_) => "celebrity",
        }
    }
}

impl<'a> From<&'a Movie> for Entity<'a> {
    fn from(movie: &'a Movie) -> Self {
        Self::Movie(movie)
    }
}

impl<'a> From<&'a Celebrity> for Entity<'a> {
    fn from(celebrity: &'a Celebrity) -> Self {
        Self::Celebrity(celebrity)
    }
}
