//! Integration tests for paginated fetching against a mock API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::time::Instant;
use webz_fetcher::config::Config;
use webz_fetcher::db::{count_posts, Database, PostRepository, SqlitePostRepository};
use webz_fetcher::webz::{FetchSummary, Post, WebzService};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup_repo() -> (SqlitePostRepository, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db.repository(), temp_dir)
}

fn create_test_config(server: &MockServer) -> Config {
    Config {
        api_base_url: format!("{}/newsApiLite", server.uri()),
        ..Config::for_testing()
    }
}

fn post_json(uuid: &str) -> Value {
    json!({
        "uuid": uuid,
        "url": format!("https://news.example.com/{uuid}"),
        "author": "Reporter",
        "published": "2025-04-09T05:30:00.000+03:00",
        "title": format!("Story {uuid}"),
        "text": "Body",
        "language": "english",
        "sentiment": "neutral",
        "categories": ["Technology"],
        "entities": {
            "persons": [{"name": "ada lovelace", "sentiment": "positive"}],
            "organizations": [],
            "locations": []
        },
        "thread": {
            "uuid": format!("thread-{uuid}"),
            "url": format!("https://news.example.com/{uuid}"),
            "site": "example.com",
            "domain_rank": 500
        }
    })
}

fn page_json(uuids: &[&str], total: u64, more: u64, next: &str) -> Value {
    json!({
        "posts": uuids.iter().map(|u| post_json(u)).collect::<Vec<_>>(),
        "totalResults": total,
        "moreResultsAvailable": more,
        "next": next,
        "requestsLeft": 998,
        "warnings": null
    })
}

const NEXT_PAGE: &str = "/newsApiLite?token=test-token&ts=1744180361252&q=technology&from=2";

/// Mount a two-page result set: the first page links to the second.
async fn mount_two_pages(server: &MockServer, second_page: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .and(query_param("from", "2"))
        .respond_with(second_page)
        .with_priority(1)
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .and(query_param("token", "test-token"))
        .and(query_param("q", "technology"))
        .and(query_param("size", "10"))
        .and(query_param("highlight", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(&["a", "b"], 3, 1, NEXT_PAGE)),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_two_pages_are_fetched_and_saved() {
    let (repo, _temp_dir) = setup_repo().await;
    let server = MockServer::start().await;
    mount_two_pages(
        &server,
        ResponseTemplate::new(200).set_body_json(page_json(&["c"], 3, 0, "")),
    )
    .await;

    let service = WebzService::new(&create_test_config(&server), repo).unwrap();

    let mut reported = None;
    let summary = service
        .fetch_posts("technology", |retrieved, total| {
            reported = Some((retrieved, total));
        })
        .await
        .expect("fetch_posts failed");

    assert_eq!(
        summary,
        FetchSummary {
            retrieved: 3,
            total: 3
        }
    );
    assert_eq!(reported, Some((3, 3)));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert_eq!(count_posts(service.repository().pool()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_retrieved_counts_only_new_posts() {
    let (repo, _temp_dir) = setup_repo().await;
    repo.create_tables_if_not_exist().await.unwrap();

    // "a" is already stored, so only "b" and "c" are new.
    let existing: Post = serde_json::from_value(post_json("a")).unwrap();
    repo.save_posts(&[existing]).await.unwrap();

    let server = MockServer::start().await;
    mount_two_pages(
        &server,
        ResponseTemplate::new(200).set_body_json(page_json(&["c"], 40, 0, "")),
    )
    .await;

    let service = WebzService::new(&create_test_config(&server), repo).unwrap();
    let summary = service
        .fetch_posts("technology", |_, _| {})
        .await
        .expect("fetch_posts failed");

    assert_eq!(summary.retrieved, 2);
    assert_eq!(summary.total, 40);
    assert_eq!(count_posts(service.repository().pool()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_error_on_first_request_propagates() {
    let (repo, _temp_dir) = setup_repo().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let service = WebzService::new(&create_test_config(&server), repo).unwrap();

    let mut called = false;
    let result = service
        .fetch_posts("technology", |_, _| called = true)
        .await;

    assert!(result.is_err());
    assert!(!called, "callback must not run when the first page fails");
}

#[tokio::test]
async fn test_invalid_json_on_first_request_propagates() {
    let (repo, _temp_dir) = setup_repo().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let service = WebzService::new(&create_test_config(&server), repo).unwrap();
    let result = service.fetch_posts("technology", |_, _| {}).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_error_after_saved_posts_returns_partial_counts() {
    let (repo, _temp_dir) = setup_repo().await;
    let server = MockServer::start().await;
    mount_two_pages(&server, ResponseTemplate::new(503)).await;

    let service = WebzService::new(&create_test_config(&server), repo).unwrap();

    let mut reported = None;
    let summary = service
        .fetch_posts("technology", |retrieved, total| {
            reported = Some((retrieved, total));
        })
        .await
        .expect("partial fetch should succeed");

    assert_eq!(
        summary,
        FetchSummary {
            retrieved: 2,
            total: 2
        }
    );
    assert_eq!(reported, Some((2, 2)));
    assert_eq!(count_posts(service.repository().pool()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_empty_first_page() {
    let (repo, _temp_dir) = setup_repo().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[], 0, 0, "")))
        .expect(1)
        .mount(&server)
        .await;

    let service = WebzService::new(&create_test_config(&server), repo).unwrap();
    let summary = service
        .fetch_posts("nothing matches", |_, _| {})
        .await
        .expect("fetch_posts failed");

    assert_eq!(
        summary,
        FetchSummary {
            retrieved: 0,
            total: 0
        }
    );
}

/// Repository that records what it was asked to save and can be told to fail.
#[derive(Default)]
struct RecordingRepository {
    /// Save calls from this one on (1-based) fail.
    fail_from_call: Option<usize>,
    save_calls: AtomicUsize,
    saved_uuids: Mutex<Vec<String>>,
    save_times: Mutex<Vec<Instant>>,
}

impl RecordingRepository {
    fn failing_from(call: usize) -> Self {
        Self {
            fail_from_call: Some(call),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PostRepository for RecordingRepository {
    async fn create_tables_if_not_exist(&self) -> Result<()> {
        Ok(())
    }

    async fn save_posts(&self, posts: &[Post]) -> Result<u64> {
        let call = self.save_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.save_times.lock().unwrap().push(Instant::now());
        if self.fail_from_call.is_some_and(|n| call >= n) {
            anyhow::bail!("disk full");
        }
        let mut saved = self.saved_uuids.lock().unwrap();
        saved.extend(posts.iter().map(|p| p.uuid.clone()));
        Ok(posts.len() as u64)
    }
}

#[tokio::test]
async fn test_save_failure_on_first_page_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(&["a"], 5, 4, NEXT_PAGE)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let repo = RecordingRepository::failing_from(1);
    let service = WebzService::new(&create_test_config(&server), repo).unwrap();

    let mut called = false;
    let result = service
        .fetch_posts("technology", |_, _| called = true)
        .await;

    assert!(result.is_err());
    assert!(!called);
    assert_eq!(service.repository().save_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_save_failure_on_second_page_keeps_first_page() {
    let server = MockServer::start().await;
    mount_two_pages(
        &server,
        ResponseTemplate::new(200).set_body_json(page_json(&["c"], 3, 0, "")),
    )
    .await;

    let repo = RecordingRepository::failing_from(2);
    let service = WebzService::new(&create_test_config(&server), repo).unwrap();

    let mut reported = None;
    let summary = service
        .fetch_posts("technology", |retrieved, total| {
            reported = Some((retrieved, total));
        })
        .await
        .expect("partial fetch should succeed");

    assert_eq!(
        summary,
        FetchSummary {
            retrieved: 2,
            total: 2
        }
    );
    assert_eq!(reported, Some((2, 2)));
    assert_eq!(service.repository().save_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        *service.repository().saved_uuids.lock().unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
}

#[tokio::test]
async fn test_empty_pages_are_not_saved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .and(query_param("from", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[], 2, 0, "")))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(&["a", "b"], 2, 1, NEXT_PAGE)),
        )
        .mount(&server)
        .await;

    let service =
        WebzService::new(&create_test_config(&server), RecordingRepository::default()).unwrap();
    let summary = service
        .fetch_posts("technology", |_, _| {})
        .await
        .expect("fetch_posts failed");

    assert_eq!(summary.retrieved, 2);
    assert_eq!(summary.total, 2);
    assert_eq!(service.repository().save_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *service.repository().saved_uuids.lock().unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
}

const PAGE_DELAY: Duration = Duration::from_secs(1);

/// A service on tokio's paused clock. The client has no timeout, so the only
/// timer the fetch sets is the delay between pages.
fn paused_clock_service(server: &MockServer) -> WebzService<RecordingRepository> {
    let config = Config {
        request_delay: PAGE_DELAY,
        ..create_test_config(server)
    };
    WebzService::with_client(reqwest::Client::new(), &config, RecordingRepository::default())
}

#[tokio::test(start_paused = true)]
async fn test_delay_is_waited_between_pages() {
    let server = MockServer::start().await;
    mount_two_pages(
        &server,
        ResponseTemplate::new(200).set_body_json(page_json(&["c"], 3, 0, "")),
    )
    .await;

    let service = paused_clock_service(&server);
    let summary = service
        .fetch_posts("technology", |_, _| {})
        .await
        .expect("fetch_posts failed");

    assert_eq!(summary.retrieved, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    let times = service.repository().save_times.lock().unwrap().clone();
    assert_eq!(times.len(), 2);
    assert!(
        times[1] - times[0] >= PAGE_DELAY,
        "pages were only {:?} apart",
        times[1] - times[0]
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_page_does_not_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newsApiLite"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["a"], 1, 0, "")))
        .expect(1)
        .mount(&server)
        .await;

    let service = paused_clock_service(&server);
    let started = Instant::now();
    let summary = service
        .fetch_posts("technology", |_, _| {})
        .await
        .expect("fetch_posts failed");

    assert_eq!(summary.retrieved, 1);
    assert!(
        started.elapsed() < PAGE_DELAY,
        "single page took {:?}",
        started.elapsed()
    );
}
