//! Statistics from the spider database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::model::Role;
use crate::storage::{Store, StoreCounts};
use crate::SpiderError;
use std::collections::HashMap;
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Row counts of every stored shape
    pub counts: StoreCounts,

    /// Number of credits per role
    pub credits_by_role: HashMap<Role, u64>,

    /// Number of complete movies per production region
    pub movies_by_region: HashMap<String, u64>,
}

impl CrawlStatistics {
    /// Share of known movies that are complete, in percent
    pub fn completion_rate(&self) -> f64 {
        let known = self.counts.movies + self.counts.resumable;
        if known == 0 {
            return 0.0;
        }
        (self.counts.movies as f64 / known as f64) * 100.0
    }
}

/// Loads statistics from an opened store
pub fn load_statistics(store: &dyn Store) -> Result<CrawlStatistics, SpiderError> {
    let counts = store.counts()?;

    let mut credits_by_role = HashMap::new();
    for mapping in store.role_mappings()? {
        *credits_by_role.entry(mapping.role).or_insert(0) += 1;
    }

    let mut movies_by_region = HashMap::new();
    for movie in store.movies()? {
        if let Some(region) = movie.region {
            *movies_by_region.entry(region).or_insert(0) += 1;
        }
    }

    Ok(CrawlStatistics {
        counts,
        credits_by_role,
        movies_by_region,
    })
}

/// Formats statistics as the text printed by `--stats`
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Complete movies: {}", stats.counts.movies);
    let _ = writeln!(out, "  Celebrities: {}", stats.counts.celebrities);
    let _ = writeln!(out, "  Credits: {}", stats.counts.role_mappings);
    let _ = writeln!(out, "  Movies left to crawl: {}", stats.counts.resumable);
    let _ = writeln!(out);

    if !stats.credits_by_role.is_empty() {
        let _ = writeln!(out, "Credits by Role:");
        for role in [Role::Director, Role::Scriptwriter, Role::Actor] {
            if let Some(count) = stats.credits_by_role.get(&role) {
                let _ = writeln!(out, "  {}: {}", role, count);
            }
        }
        let _ = writeln!(out);
    }

    if !stats.movies_by_region.is_empty() {
        let _ = writeln!(out, "Movies by Region:");
        let mut regions: Vec<_> = stats.movies_by_region.iter().collect();
        regions.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (region, count) in regions {
            let _ = writeln!(out, "  {}: {}", region, count);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Completion: {:.1}% ({} complete / {} known movies)",
        stats.completion_rate(),
        stats.counts.movies,
        stats.counts.movies + stats.counts.resumable
    );
    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
