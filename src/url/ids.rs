use crate::{UrlError, UrlResult};
use url::Url;

const MOVIE_SEGMENT: &str = "subject";
const CELEBRITY_SEGMENT: &str = "celebrity";

/// The movie site being crawled
///
/// Knows how to turn a movie id into its page URL and how to recognize
/// movie page URLs on the same host.
#[derive(Debug, Clone)]
pub struct MovieSite {
    base: Url,
}

impl MovieSite {
    /// Creates a site from its base URL (scheme and host, e.g. `http://movie.douban.com`)
    pub fn new(base_url: &str) -> UrlResult<Self> {
        let base = Url::parse(base_url).map_err(|e| UrlError::Parse(format!("{base_url}: {e}")))?;
        if base.host_str().is_none() {
            return Err(UrlError::Parse(format!("{base_url}: missing host")));
        }
        Ok(Self { base })
    }

    /// Builds the page URL of a movie: `<base>/subject/<id>/`
    pub fn movie_url(&self, movie_id: &str) -> String {
        let mut url = self.base.clone();
        url.set_path(&format!("/{MOVIE_SEGMENT}/{movie_id}/"));
        url.set_query(None);
        url.set_fragment(None);
        url.to_string()
    }

    /// Extracts the movie id from a movie page URL
    ///
    /// Relative links are resolved against the site base. Query parameters and
    /// fragments are ignored, so `/subject/123/?from=showing` yields `123`.
    /// The scheme is not compared: `http` and `https` links to the same host
    /// are both accepted.
    ///
    /// # Errors
    ///
    /// * `UrlError::Parse` - The string is not a URL
    /// * `UrlError::ForeignHost` - The URL points to another host
    /// * `UrlError::NotAMoviePage` - The path is not `/subject/<digits>/`
    pub fn parse_movie_id(&self, url: &str) -> UrlResult<String> {
        let parsed = self
            .base
            .join(url.trim())
            .map_err(|e| UrlError::Parse(format!("{url}: {e}")))?;

        if parsed.host_str() != self.base.host_str() || parsed.port() != self.base.port() {
            return Err(UrlError::ForeignHost(url.to_string()));
        }

        id_after_segment(&parsed, MOVIE_SEGMENT)
            .ok_or_else(|| UrlError::NotAMoviePage(url.to_string()))
    }
}

/// Extracts a celebrity id from a link such as `/celebrity/1054424/`
///
/// Returns `None` when the link does not have the celebrity shape; callers
/// fall back to the raw href in that case.
pub fn celebrity_id_from_href(href: &str) -> Option<String> {
    let placeholder = Url::parse("http://localhost/").ok()?;
    let parsed = placeholder.join(href.trim()).ok()?;
    id_after_segment(&parsed, CELEBRITY_SEGMENT)
}

/// Returns `<digits>` when the path is exactly `/<segment>/<digits>/`
fn id_after_segment(url: &Url, segment: &str) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next()? != segment {
        return None;
    }
    let id = segments.next()?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if segments.next() != Some("") || segments.next().is_some() {
        return None;
    }
    Some(id.to_string())
}
