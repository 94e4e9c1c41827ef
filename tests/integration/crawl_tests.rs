//! Integration tests for the spider
//!
//! These tests use wiremock to serve movie pages and run the full
//! fetch, extract and persist cycle end-to-end against a real SQLite file.

use movie_spider::config::{CrawlerConfig, UserAgentConfig};
use movie_spider::crawler::{FetchError, HttpFetcher, PageFetcher};
use movie_spider::storage::{SqliteStore, Store, StoreCounts};
use movie_spider::url::MovieSite;
use movie_spider::{Role, Spider, SpiderState};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HTML_UTF8: &str = "text/html; charset=utf-8";

fn credit_links(people: &[(&str, &str)]) -> String {
    people
        .iter()
        .map(|(id, name)| format!(r#"<a href="/celebrity/{}/">{}</a>"#, id, name))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Renders a movie page in the site's markup
fn movie_page(
    title: &str,
    year: &str,
    directors: &[(&str, &str)],
    actors: &[(&str, &str)],
    related: &[String],
) -> String {
    let related: String = related
        .iter()
        .map(|href| format!(r#"<dl><dt><a href="{}"><img src="/poster.jpg"/></a></dt></dl>"#, href))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html><head><title>{title} (豆瓣)</title></head>
<body>
<h1><span property="v:itemreviewed">{title}</span> <span class="year">({year})</span></h1>
<div id="info">
    <span><span class='pl'>导演</span>: <span class='attrs'>{directors}</span></span><br/>
    <span class="actor"><span class='pl'>主演</span>: <span class='attrs'>{actors}</span></span><br/>
    <span class="pl">制片国家/地区:</span> 美国<br/>
    <span class="pl">上映日期:</span> <span property="v:initialReleaseDate" content="{year}-05-01(美国)">{year}-05-01(美国)</span><br/>
</div>
<div class="recommendations-bd">{related}</div>
</body></html>"#,
        title = title,
        year = year,
        directors = credit_links(directors),
        actors = credit_links(actors),
        related = related,
    )
}

async fn serve(server: &MockServer, movie_id: &str, body: String, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/subject/{}/", movie_id)))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, content_type))
        .expect(1)
        .mount(server)
        .await;
}

fn create_spider(
    server: &MockServer,
    db_path: &Path,
    max_movies: usize,
) -> Spider<HttpFetcher, SqliteStore> {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: Some("https://example.com/contact".to_string()),
    };
    let crawler = CrawlerConfig {
        fetch_gap_ms: 10,
        max_movies,
    };

    Spider::new(
        HttpFetcher::from_config(&user_agent).expect("Failed to build HTTP client"),
        SqliteStore::new(db_path),
        MovieSite::new(&server.uri()).expect("Failed to parse server URI"),
        &crawler,
    )
}

async fn run_to_end(spider: &Spider<HttpFetcher, SqliteStore>) {
    spider.start().expect("Failed to start spider");
    tokio::time::timeout(Duration::from_secs(30), spider.completion().wait())
        .await
        .expect("Spider did not finish in time");
    assert_eq!(spider.state(), SpiderState::Stopped);
}

fn open_store(db_path: &Path) -> SqliteStore {
    let mut store = SqliteStore::new(db_path);
    store.open().expect("Failed to open database");
    store
}

#[tokio::test]
async fn test_budget_of_one_movie() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    serve(
        &server,
        "100",
        movie_page(
            "Seed",
            "1999",
            &[("9", "D")],
            &[],
            &[
                format!("{}/subject/200/?from=subject-page", base),
                format!("{}/subject/100/?from=subject-page", base),
            ],
        ),
        HTML_UTF8,
    )
    .await;

    let spider = create_spider(&server, &db_path, 1);
    spider.set_seed("100").unwrap();
    run_to_end(&spider).await;

    let store = open_store(&db_path);
    assert_eq!(
        store.counts().unwrap(),
        StoreCounts {
            movies: 1,
            celebrities: 1,
            role_mappings: 1,
            resumable: 1,
        }
    );

    let movie = &store.movies().unwrap()[0];
    assert_eq!(movie.external_id, "100");
    assert_eq!(movie.title.as_deref(), Some("Seed"));
    assert_eq!(movie.year.as_deref(), Some("1999"));
    assert_eq!(movie.region.as_deref(), Some("美国"));
    assert_eq!(movie.unique_id.as_deref(), Some("Seed_1999"));

    let celebrity = &store.celebrities().unwrap()[0];
    assert_eq!(celebrity.external_id, "9");
    assert_eq!(celebrity.name.as_deref(), Some("D"));

    let mapping = &store.role_mappings().unwrap()[0];
    assert_eq!(mapping.movie_id, "100");
    assert_eq!(mapping.celebrity_id, "9");
    assert_eq!(mapping.role, Role::Director);

    assert_eq!(store.resumable_ids().unwrap(), vec!["200".to_string()]);
}

#[tokio::test]
async fn test_follows_related_movies() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    serve(
        &server,
        "100",
        movie_page(
            "First",
            "1999",
            &[("9", "D")],
            &[("10", "A")],
            &[format!("{}/subject/200/", base), "https://elsewhere.example/subject/300/".to_string()],
        ),
        HTML_UTF8,
    )
    .await;
    serve(
        &server,
        "200",
        movie_page(
            "Second",
            "2003",
            &[("9", "D")],
            &[("11", "B")],
            &[format!("{}/subject/100/", base)],
        ),
        HTML_UTF8,
    )
    .await;

    let spider = create_spider(&server, &db_path, 0);
    spider.set_seed("100").unwrap();
    run_to_end(&spider).await;

    let store = open_store(&db_path);
    let counts = store.counts().unwrap();
    assert_eq!(counts.movies, 2);
    assert_eq!(counts.celebrities, 3);
    assert_eq!(counts.role_mappings, 4);
    assert_eq!(counts.resumable, 0);

    // Each page was fetched exactly once
    server.verify().await;
}

#[tokio::test]
async fn test_missing_charset_keeps_movie_resumable() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    serve(
        &server,
        "100",
        movie_page("Seed", "1999", &[("9", "D")], &[], &[]),
        "text/html",
    )
    .await;

    let spider = create_spider(&server, &db_path, 0);
    spider.set_seed("100").unwrap();
    run_to_end(&spider).await;

    let store = open_store(&db_path);
    let counts = store.counts().unwrap();
    assert_eq!(counts.movies, 0);
    assert_eq!(counts.celebrities, 0);
    assert_eq!(store.resumable_ids().unwrap(), vec!["100".to_string()]);
}

#[tokio::test]
async fn test_error_status_keeps_movie_resumable() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    serve(
        &server,
        "100",
        movie_page("Seed", "1999", &[], &[], &[format!("{}/subject/200/", base)]),
        HTML_UTF8,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/subject/200/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let spider = create_spider(&server, &db_path, 0);
    spider.set_seed("100").unwrap();
    run_to_end(&spider).await;

    let store = open_store(&db_path);
    assert_eq!(store.counts().unwrap().movies, 1);
    assert_eq!(store.resumable_ids().unwrap(), vec!["200".to_string()]);
}

#[tokio::test]
async fn test_second_run_resumes_first() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    serve(
        &server,
        "100",
        movie_page("First", "1999", &[], &[], &[format!("{}/subject/200/", base)]),
        HTML_UTF8,
    )
    .await;
    serve(
        &server,
        "200",
        movie_page("Second", "2003", &[], &[], &[]),
        HTML_UTF8,
    )
    .await;

    let first = create_spider(&server, &db_path, 1);
    first.set_seed("100").unwrap();
    run_to_end(&first).await;
    assert_eq!(
        open_store(&db_path).resumable_ids().unwrap(),
        vec!["200".to_string()]
    );

    // No seed: the frontier comes entirely from the resumable ids
    let second = create_spider(&server, &db_path, 0);
    run_to_end(&second).await;

    let store = open_store(&db_path);
    let counts = store.counts().unwrap();
    assert_eq!(counts.movies, 2);
    assert_eq!(counts.resumable, 0);
}

#[tokio::test]
async fn test_fetcher_decodes_declared_charset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(vec![b'C', b'a', b'f', 0xE9], "text/html; charset=ISO-8859-1"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("Cafe", "text/html"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::from_config(&UserAgentConfig::default()).unwrap();

    let text = fetcher
        .fetch_page(&format!("{}/latin1", server.uri()))
        .await
        .unwrap();
    assert_eq!(text, "Café");

    let err = fetcher
        .fetch_page(&format!("{}/plain", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::MissingCharset { .. }));

    let err = fetcher
        .fetch_page(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}
