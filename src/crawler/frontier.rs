//! Crawl frontier
//!
//! Holds the movie ids still to be fetched together with the run-scoped visited
//! sets. Ids are popped in LIFO order, so the crawl goes depth-first along the
//! most recently discovered related links.
//!
//! The visited sets live only as long as the frontier. They are never persisted,
//! so a movie fetched in one run may be fetched again by the next one.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Frontier {
    /// Pending movie ids, top of the stack last
    pending: Vec<String>,

    visited_movies: HashSet<String>,
    visited_celebrities: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an id onto the stack unless it has already been visited
    ///
    /// Returns true if the id was added.
    pub fn push(&mut self, movie_id: impl Into<String>) -> bool {
        let movie_id = movie_id.into();
        if self.visited_movies.contains(&movie_id) {
            return false;
        }
        self.pending.push(movie_id);
        true
    }

    pub fn extend<I, S>(&mut self, movie_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for movie_id in movie_ids {
            self.push(movie_id);
        }
    }

    /// Pops the most recently pushed id that hasn't been visited yet
    ///
    /// An id can be on the stack several times when several pages link to it;
    /// copies pushed before it was visited are discarded here.
    pub fn pop_unvisited(&mut self) -> Option<String> {
        while let Some(movie_id) = self.pending.pop() {
            if !self.visited_movies.contains(&movie_id) {
                return Some(movie_id);
            }
        }
        None
    }

    pub fn mark_movie_visited(&mut self, movie_id: &str) {
        self.visited_movies.insert(movie_id.to_string());
    }

    /// Marks a celebrity as visited; returns false if it already was
    pub fn visit_celebrity(&mut self, celebrity_id: &str) -> bool {
        self.visited_celebrities.insert(celebrity_id.to_string())
    }

    pub fn visited_movie_count(&self) -> usize {
        self.visited_movies.len()
    }

    pub fn visited_celebrity_count(&self) -> usize {
        self.visited_celebrities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Empties the stack, returning each unvisited id once
    ///
    /// The order of the returned ids is unspecified.
    pub fn drain_unvisited(&mut self) -> Vec<String> {
        let unique: HashSet<String> = self
            .pending
            .drain(..)
            .filter(|movie_id| !self.visited_movies.contains(movie_id))
            .collect();
        unique.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frontier() {
        let frontier = Frontier::new();
        assert!(frontier.is_empty());
        assert_eq!(frontier.len(), 0);
        assert_eq!(frontier.visited_movie_count(), 0);
    }

    #[test]
    fn test_pop_is_lifo() {
        let mut frontier = Frontier::new();
        frontier.extend(["1", "2", "3"]);

        assert_eq!(frontier.pop_unvisited().as_deref(), Some("3"));
        assert_eq!(frontier.pop_unvisited().as_deref(), Some("2"));
        frontier.push("4");
        assert_eq!(frontier.pop_unvisited().as_deref(), Some("4"));
        assert_eq!(frontier.pop_unvisited().as_deref(), Some("1"));
        assert_eq!(frontier.pop_unvisited(), None);
    }

    #[test]
    fn test_visited_ids_are_never_popped() {
        let mut frontier = Frontier::new();
        frontier.extend(["1", "2", "1"]);

        let first = frontier.pop_unvisited().unwrap();
        assert_eq!(first, "1");
        frontier.mark_movie_visited(&first);

        // Rejected outright once visited
        assert!(!frontier.push("1"));

        assert_eq!(frontier.pop_unvisited().as_deref(), Some("2"));
        frontier.mark_movie_visited("2");

        // The stale copy of "1" pushed before the visit is skipped
        assert_eq!(frontier.pop_unvisited(), None);
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_visit_celebrity_once() {
        let mut frontier = Frontier::new();
        assert!(frontier.visit_celebrity("9"));
        assert!(!frontier.visit_celebrity("9"));
        assert_eq!(frontier.visited_celebrity_count(), 1);
    }

    #[test]
    fn test_drain_dedups_and_skips_visited() {
        let mut frontier = Frontier::new();
        frontier.extend(["200", "300", "200", "100"]);
        frontier.mark_movie_visited("100");

        let mut drained = frontier.drain_unvisited();
        drained.sort();

        assert_eq!(drained, vec!["200".to_string(), "300".to_string()]);
        assert!(frontier.is_empty());
        assert!(frontier.drain_unvisited().is_empty());
    }
}
