use super::Celebrity;
use crate::crawler::PageExtraction;
use crate::url::MovieSite;

/// A crawled movie page
///
/// A movie is complete once its id, title and year are all known. Anything
/// less is partial: the store only keeps its id so a later run can retry it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Movie {
    pub id: String,
    pub title: Option<String>,
    pub year: Option<String>,
    pub region: Option<String>,

    /// People credited on the page, each tagged with its role
    pub celebrities: Vec<Celebrity>,

    /// Ids of other movies linked from the page, in page order
    pub related_ids: Vec<String>,
}

impl Movie {
    /// Creates a movie that only knows its id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builds a movie from what the extractor found on its page
    ///
    /// Related links that don't point to a movie page on `site` are skipped.
    pub fn from_page(id: impl Into<String>, page: PageExtraction, site: &MovieSite) -> Self {
        let id = id.into();

        let celebrities = page
            .credits
            .into_iter()
            .map(|credit| Celebrity::credited(credit.id, credit.name, credit.role))
            .collect();

        let mut related_ids = Vec::with_capacity(page.related_urls.len());
        for href in &page.related_urls {
            match site.parse_movie_id(href) {
                Ok(related) => related_ids.push(related),
                Err(e) => tracing::debug!("Skipping related link on movie {}: {}", id, e),
            }
        }

        Self {
            id,
            title: page.title,
            year: page.year,
            region: page.region,
            celebrities,
            related_ids,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && self.title.is_some() && self.year.is_some()
    }

    pub fn is_partial(&self) -> bool {
        !self.is_complete()
    }

    /// Derived key `<title>_<year>`, available once both are known
    pub fn unique_id(&self) -> Option<String> {
        match (&self.title, &self.year) {
            (Some(title), Some(year)) => Some(format!("{}_{}", title, year)),
            _ => None,
        }
    }
}
