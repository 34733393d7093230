//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the crawl
//! pipeline end-to-end over a SQLite database in a temporary directory.

use recrawler::config::Config;
use recrawler::crawler::{Crawler, Fetcher, HttpFetcher, Priority, SiteType};
use recrawler::state::JobStage;
use recrawler::storage::{DedupStore, JobQueue, PageStore, QueueTier, SqliteStorage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to `db_path`
fn create_test_config(db_path: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.max_concurrent_requests = 4;
    config.crawler.idle_poll_ms = 10;
    config.crawler.request_timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.storage.database_path = db_path.to_string_lossy().to_string();
    config
}

/// Builds a crawler (one "worker") over the database in `dir`
fn create_crawler(dir: &TempDir) -> (Arc<Crawler>, Arc<SqliteStorage>) {
    let config = create_test_config(&dir.path().join("crawl.db"));
    let storage = Arc::new(SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap());
    let fetcher: Arc<dyn Fetcher> = Arc::new(
        HttpFetcher::from_config(&config.user_agent, Duration::from_secs(5)).unwrap(),
    );
    let crawler = Crawler::with_storage(&config, storage.clone(), fetcher);
    (Arc::new(crawler), storage)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

/// Drains a queue tier, returning the job URLs oldest first
fn drain(storage: &SqliteStorage, tier: QueueTier) -> Vec<String> {
    let mut urls = Vec::new();
    while let Some(job) = storage.dequeue(tier).unwrap() {
        urls.push(job.current_url);
    }
    urls
}

#[tokio::test]
async fn test_filtered_link_never_admitted_and_news_links_go_high() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Site</title></head><body>
                <h1>Breaking news</h1>
                <a href="/privacy">Privacy</a>
                <a href="/article-1">Article one</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, storage) = create_crawler(&dir);

    assert!(crawler.seed(&format!("{}/", base_url)).unwrap());

    // Process only the seed job
    let job = crawler.frontier().next_job().unwrap().unwrap();
    let mut outcomes = crawler.handle_job(job).await.into_outcomes();
    assert_eq!(outcomes.len(), 1);
    let outcome = outcomes.remove(0);

    assert_eq!(outcome.stage, JobStage::Done);
    assert_eq!(outcome.site_type, Some(SiteType::News));
    assert_eq!(outcome.priority, Some(Priority::High));
    assert_eq!(outcome.links_admitted, 1);

    let article = format!("{}/article-1", base_url);
    let privacy = format!("{}/privacy", base_url);

    assert!(storage.contains(&article).unwrap());
    assert!(!storage.contains(&privacy).unwrap());
    assert_eq!(drain(&storage, QueueTier::High), vec![article]);
    assert!(drain(&storage, QueueTier::Low).is_empty());

    let page = storage.get_page(&format!("{}/", base_url)).unwrap().unwrap();
    assert_eq!(page.title, "Site");
    assert_eq!(page.site_type, SiteType::News);
}

#[tokio::test]
async fn test_not_found_fails_and_stays_deduplicated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, storage) = create_crawler(&dir);
    let url = format!("{}/missing", base_url);

    assert!(crawler.seed(&url).unwrap());
    let summary = crawler.run_until_idle().await;

    assert_eq!(summary.jobs_failed, 1);
    assert_eq!(summary.jobs_done, 0);
    assert_eq!(summary.failures_by_kind.get("fetch_failure"), Some(&1));
    assert!(storage.get_page(&url).unwrap().is_none());
    assert_eq!(storage.count_pages().unwrap(), 0);

    // Never retried: the URL is still recorded as handled
    assert!(storage.contains(&url).unwrap());
    assert!(!crawler.seed(&url).unwrap());
    assert!(!crawler.try_admit(&url));

    // Until an operator clears it
    assert!(crawler.forget(&url).unwrap());
    assert!(crawler.seed(&url).unwrap());
}

#[tokio::test]
async fn test_non_html_is_dropped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2, 3], "image/png"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, storage) = create_crawler(&dir);

    crawler.seed(&format!("{}/logo.png", base_url)).unwrap();
    let summary = crawler.run_until_idle().await;

    assert_eq!(summary.failures_by_kind.get("unsupported_content"), Some(&1));
    assert_eq!(storage.count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_second_job_for_domain_waits_for_first() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(
            html(r#"<html><body><p>First page</p><a href="/third">Third</a></body></html>"#)
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(html("<html><body><p>Second page</p></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, storage) = create_crawler(&dir);
    let first = format!("{}/first", base_url);
    let second = format!("{}/second", base_url);
    let third = format!("{}/third", base_url);

    crawler.seed(&first).unwrap();
    crawler.seed(&second).unwrap();

    let first_job = crawler.frontier().next_job().unwrap().unwrap();
    let second_job = crawler.frontier().next_job().unwrap().unwrap();
    assert_eq!(first_job.current_url, first);

    let running = {
        let crawler = Arc::clone(&crawler);
        tokio::spawn(async move { crawler.handle_job(first_job).await })
    };

    // Wait until the first job holds the domain
    let domain = url::Url::parse(&base_url)
        .unwrap()
        .host_str()
        .unwrap()
        .to_string();
    for _ in 0..100 {
        if crawler.frontier().politeness().is_in_flight(&domain) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(crawler.frontier().politeness().is_in_flight(&domain));

    // The second job is not fetched and not enqueued; it waits on this worker
    assert!(crawler.handle_job(second_job).await.is_deferred());
    assert_eq!(storage.depth(QueueTier::High).unwrap(), 0);
    assert_eq!(storage.depth(QueueTier::Low).unwrap(), 0);
    assert_eq!(crawler.frontier().politeness().deferred_len(&domain), 1);

    // The holder of the domain runs it right after the first job
    let outcomes = running.await.unwrap().into_outcomes();
    let urls: Vec<&str> = outcomes.iter().map(|o| o.url.as_str()).collect();
    assert_eq!(urls, vec![first.as_str(), second.as_str()]);
    assert!(outcomes.iter().all(|o| o.is_success()));

    // The first page's link was held, then released at its priority (plain page: low)
    assert_eq!(outcomes[0].priority, Some(Priority::Low));
    assert_eq!(drain(&storage, QueueTier::Low), vec![third]);
    assert!(drain(&storage, QueueTier::High).is_empty());
    assert!(!crawler.frontier().politeness().is_in_flight(&domain));
}

#[tokio::test]
async fn test_full_crawl_until_idle() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><meta name="keywords" content="shop"></head><body>
                <a href="/product/kettle">Kettle</a>
                <a href="/product/mug">Mug</a>
                <a href="/terms">Terms</a>
                <a href="/cart#top">Cart</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/product/kettle"))
        .respond_with(html(
            r#"<html><head><title>Kettle</title></head><body>
                <div class="product"><h2>Blue Kettle</h2><span class="price">$24</span></div>
                <a href="/">Home</a>
                <a href="/product/mug">Mug</a>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/product/mug"))
        .respond_with(html("<html><head><title>Mug</title></head><body></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let (crawler, storage) = create_crawler(&dir);

    crawler.seed(&format!("{}/", base_url)).unwrap();
    let summary = crawler.run_until_idle().await;

    assert_eq!(summary.jobs_done, 3);
    assert_eq!(summary.jobs_failed, 0);
    assert_eq!(summary.pages_persisted, 3);
    assert_eq!(summary.links_admitted, 2);
    assert_eq!(storage.count_pages().unwrap(), 3);
    assert_eq!(storage.count().unwrap(), 3);

    let kettle = storage
        .get_page(&format!("{}/product/kettle", base_url))
        .unwrap()
        .unwrap();
    assert_eq!(kettle.price.len(), 1);
    assert_eq!(kettle.price[0].name, "Blue Kettle");
    assert_eq!(
        storage
            .count_pages_by_site_type(SiteType::Ecommerce)
            .unwrap(),
        1
    );

    assert_eq!(storage.depth(QueueTier::High).unwrap(), 0);
    assert_eq!(storage.depth(QueueTier::Low).unwrap(), 0);
}

#[tokio::test]
async fn test_two_workers_share_frontier() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let links: String = (0..8)
        .map(|i| format!(r#"<a href="/item-{}">Item</a>"#, i))
        .collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            "<html><head><meta name=\"keywords\" content=\"news\"></head><body>{}</body></html>",
            links
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    for i in 0..8 {
        Mock::given(method("GET"))
            .and(path(format!("/item-{}", i)))
            .respond_with(html("<html><body><p>Item</p></body></html>"))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let (worker_a, storage) = create_crawler(&dir);
    let (worker_b, _) = create_crawler(&dir);

    worker_a.seed(&format!("{}/", base_url)).unwrap();
    let seed_job = worker_a.frontier().next_job().unwrap().unwrap();
    let seed_outcomes = worker_a.handle_job(seed_job).await.into_outcomes();
    assert_eq!(seed_outcomes[0].links_admitted, 8);
    assert_eq!(storage.depth(QueueTier::High).unwrap(), 8);

    // Both workers drain the shared queues
    let (a, b) = tokio::join!(worker_a.run_until_idle(), worker_b.run_until_idle());

    assert_eq!(a.jobs_done + b.jobs_done, 8);
    assert_eq!(a.jobs_failed + b.jobs_failed, 0);
    assert_eq!(storage.count_pages().unwrap(), 9);

    // Each page was fetched exactly once, verified by the mocks' expectations
    mock_server.verify().await;
}

#[tokio::test]
async fn test_concurrent_admission_across_workers() {
    let dir = TempDir::new().unwrap();
    let workers: Vec<_> = (0..8).map(|_| create_crawler(&dir).0).collect();

    let handles: Vec<_> = workers
        .into_iter()
        .map(|worker| {
            tokio::task::spawn_blocking(move || worker.try_admit("https://site.test/shared"))
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 1);
}
