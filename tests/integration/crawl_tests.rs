//! Integration tests for discovery, downloading and supervision
//!
//! These tests use wiremock to create mock HTTP servers and tempfile for
//! download directories, and exercise the pipeline end-to-end.

use paper_trawl::config::Config;
use paper_trawl::crawler::{
    build_http_client, CrawlSession, Crawler, FetchError, FetchOutcome, FetchTask, Fetcher,
    HttpFetcher, PageCollector, RetryPolicy,
};
use paper_trawl::naming::{DefaultNameResolver, MonthYearContextResolver};
use paper_trawl::output::TracingObserver;
use paper_trawl::{Supervisor, SupervisorState, TrawlError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_BODY: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n";

/// Creates a configuration with short delays suitable for tests
fn create_test_config(seed: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.target.seed_url = Some(seed.to_string());
    config.output.download_dir = dir.to_path_buf();
    config.crawler.max_concurrent_downloads = 2;
    config.crawler.retry_delay_secs = 0;
    config.crawler.attempt_timeout_secs = 30;
    config.crawler.page_timeout_secs = 5;
    config.fetcher.base_delay_ms = 10;
    config.fetcher.max_jitter_ms = 0;
    config.fetcher.read_timeout_secs = 5;
    config
}

fn create_crawler(config: &Config) -> Crawler {
    let client = build_http_client(&config.fetcher).expect("client builds");
    let collector = PageCollector::new(Arc::new(DefaultNameResolver::default()), "pdf");
    Crawler::new(
        client,
        collector,
        Arc::new(MonthYearContextResolver::default()),
        Arc::new(TracingObserver::new()),
        config.crawler.page_timeout(),
    )
}

fn create_fetcher(config: &Config) -> HttpFetcher {
    let client = build_http_client(&config.fetcher).expect("client builds");
    HttpFetcher::new(client, &config.fetcher)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><head><title>Papers</title></head><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn pdf() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(PDF_BODY)
        .insert_header("content-type", "application/pdf")
}

#[tokio::test]
async fn test_discovery_dedupes_and_follows_one_hop() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/files/A.pdf">Paper A</a>
               <a href="/files/B.PDF">Paper B</a>
               <a href="/files/A.pdf">Paper A again</a>
               <a href="/papers">More papers</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/papers"))
        .respond_with(html(
            r#"<a href="/files/C.pdf">Paper C</a>
               <a href="/files/A.pdf">Paper A</a>
               <a href="/deeper">Even more</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Two hops away: must never be fetched
    Mock::given(method("GET"))
        .and(path("/deeper"))
        .respond_with(html(r#"<a href="/files/D.pdf">Paper D</a>"#))
        .expect(0)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(&seed, dir.path());
    let crawler = create_crawler(&config);
    let mut session = CrawlSession::new(dir.path());

    let tasks = crawler
        .discover(&seed, &mut session, &CancellationToken::new())
        .await
        .expect("discovery succeeds");

    let mut urls: Vec<String> = tasks
        .iter()
        .map(|t| t.source_url.trim_start_matches(&mock_server.uri()).to_string())
        .collect();
    urls.sort();
    assert_eq!(urls, vec!["/files/A.pdf", "/files/B.PDF", "/files/C.pdf"]);
    assert_eq!(session.visited_page_count(), 2);
    assert!(tasks.iter().all(|t| t.download_dir == dir.path()));
}

#[tokio::test]
async fn test_other_hosts_are_not_followed() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let port = url::Url::parse(&mock_server.uri()).unwrap().port().unwrap();

    // Same server, but addressed through a different host name
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<a href="http://localhost:{}/elsewhere">Elsewhere</a>
               <a href="/files/A.pdf">A</a>"#,
            port
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(html(r#"<a href="/files/Z.pdf">Z</a>"#))
        .expect(0)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(&seed, dir.path());
    let mut session = CrawlSession::new(dir.path());

    let tasks = create_crawler(&config)
        .discover(&seed, &mut session, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].source_url.ends_with("/files/A.pdf"));
}

#[tokio::test]
async fn test_child_page_failure_is_skipped() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/broken">Broken</a><a href="/files/A.pdf">A</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(&seed, dir.path());
    let mut session = CrawlSession::new(dir.path());

    let tasks = create_crawler(&config)
        .discover(&seed, &mut session, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn test_seed_failure_fails_discovery() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(&seed, dir.path());
    let mut session = CrawlSession::new(dir.path());

    let result = create_crawler(&config)
        .discover(&seed, &mut session, &CancellationToken::new())
        .await;

    match result {
        Err(TrawlError::Page { source, .. }) => {
            assert!(matches!(source, FetchError::NotFound { .. }))
        }
        other => panic!("expected page error, got {:?}", other.map(|t| t.len())),
    }
}

#[tokio::test]
async fn test_download_writes_verified_file() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/A.pdf"))
        .respond_with(pdf())
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let task = FetchTask::new(
        format!("{}/files/A.pdf", mock_server.uri()),
        "A.pdf",
        dir.path(),
        "Paper A",
    );

    let outcome = create_fetcher(&config)
        .fetch(&task, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Downloaded {
            bytes: PDF_BODY.len() as u64,
            attempts: 1
        }
    );
    assert_eq!(std::fs::read(task.target_path()).unwrap(), PDF_BODY);
    assert!(!task.partial_path().exists());
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let task = FetchTask::new(
        format!("{}/missing.pdf", mock_server.uri()),
        "missing.pdf",
        dir.path(),
        "",
    );

    let result = create_fetcher(&config)
        .fetch(&task, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(FetchError::NotFound { .. })));
    assert!(!task.target_path().exists());
}

#[tokio::test]
async fn test_unavailable_is_retried_until_exhausted() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/busy.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let task = FetchTask::new(
        format!("{}/busy.pdf", mock_server.uri()),
        "busy.pdf",
        dir.path(),
        "",
    );

    let result = create_fetcher(&config)
        .fetch(&task, &CancellationToken::new())
        .await;

    match result {
        Err(FetchError::Exhausted { attempts, source }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(*source, FetchError::Unavailable { .. }));
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/flaky.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky.pdf"))
        .respond_with(pdf())
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let task = FetchTask::new(
        format!("{}/flaky.pdf", mock_server.uri()),
        "flaky.pdf",
        dir.path(),
        "",
    );

    let outcome = create_fetcher(&config)
        .fetch(&task, &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::Downloaded { attempts: 2, .. }));
}

#[tokio::test]
async fn test_connection_refused_is_retried() {
    let dir = tempfile::tempdir().unwrap();

    // Reserve a port, then free it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = create_test_config("http://127.0.0.1/", dir.path());
    let task = FetchTask::new(
        format!("http://127.0.0.1:{}/a.pdf", port),
        "a.pdf",
        dir.path(),
        "",
    );

    let fetcher = create_fetcher(&config).with_policy(RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(5),
        max_jitter: Duration::ZERO,
    });
    let result = fetcher.fetch(&task, &CancellationToken::new()).await;

    match result {
        Err(FetchError::Exhausted { attempts, source }) => {
            assert_eq!(attempts, fetcher.policy().max_attempts);
            assert!(source.is_retryable());
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }
}

#[tokio::test]
async fn test_existing_file_is_not_requested() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .respond_with(pdf())
        .expect(0)
        .mount(&mock_server)
        .await;

    std::fs::write(dir.path().join("A.pdf"), PDF_BODY).unwrap();

    let config = create_test_config(&mock_server.uri(), dir.path());
    let task = FetchTask::new(
        format!("{}/A.pdf", mock_server.uri()),
        "A.pdf",
        dir.path(),
        "",
    );

    let outcome = create_fetcher(&config)
        .fetch(&task, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::AlreadyPresent {
            bytes: PDF_BODY.len() as u64
        }
    );
}

#[tokio::test]
async fn test_bad_header_leaves_partial_file() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/fake.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login required</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), dir.path());
    let task = FetchTask::new(
        format!("{}/fake.pdf", mock_server.uri()),
        "fake.pdf",
        dir.path(),
        "",
    );

    let result = create_fetcher(&config)
        .fetch(&task, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(FetchError::Integrity { .. })));
    assert!(!task.target_path().exists());
    assert!(task.partial_path().exists());
}

#[tokio::test]
async fn test_supervisor_end_to_end_with_index() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let download_dir = dir.path().join("downloads");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<h1>Final May 2025</h1>
               <a href="/files/p1.pdf">Question Paper</a>
               <a href="/files/gone.pdf">Suggested Answers</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/p1.pdf"))
        .respond_with(pdf())
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/gone.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(&seed, &download_dir);
    let supervisor = Supervisor::from_config(&config).unwrap();

    let report = supervisor.execute(&seed, &download_dir).await;

    assert!(report.success());
    assert_eq!(report.attempts, 1);
    assert_eq!(report.result.success_count, 1);
    assert_eq!(report.result.failure_count, 1);
    assert_eq!(report.result.errors.len(), 1);

    assert!(download_dir.join("M25FRQues.pdf").exists());

    let index = std::fs::read_to_string(download_dir.join("Master.txt")).unwrap();
    assert!(index.contains("M25FRQues.pdf"));
    assert!(index.contains("Question Paper"));
    assert!(!index.contains("gone.pdf"));
}

#[tokio::test]
async fn test_supervisor_retries_when_nothing_downloads() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>No documents yet</p>"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(&seed, dir.path());
    let supervisor = Supervisor::from_config(&config).unwrap();

    let report = supervisor.execute(&seed, dir.path()).await;

    assert!(!report.success());
    assert_eq!(report.attempts, 3);
    assert!(matches!(
        report.state,
        SupervisorState::FailedRetryable { attempt: 3, .. }
    ));
    assert!(!dir.path().join("Master.txt").exists());
}

#[tokio::test]
async fn test_supervisor_unknown_host_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let seed = "http://nonexistent-host.invalid/papers";
    let config = create_test_config(seed, dir.path());
    let supervisor = Supervisor::from_config(&config).unwrap();

    let report = supervisor.execute(seed, dir.path()).await;

    assert!(!report.success());
    assert_eq!(report.attempts, 1);
    assert!(matches!(report.state, SupervisorState::FailedFatal { .. }));
    assert_eq!(report.result.total_attempted(), 0);
}
