//! Integration tests for the indexing service
//!
//! These tests use wiremock to serve small sites and run full indexing
//! cycles against a temporary database.

use lexicrawl::config::{
    Config, CrawlerConfig, MorphologyConfig, SearchConfig, SiteEntry, StorageConfig,
    UserAgentConfig,
};
use lexicrawl::crawler::STOP_MESSAGE;
use lexicrawl::morphology::{DictionaryMorphology, Morphology};
use lexicrawl::storage::{open_storage, SharedStorage, Storage};
use lexicrawl::{IndexingService, SiteStatus};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for the given sites
fn create_test_config(site_urls: &[String], db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            politeness_delay: 0,
            request_timeout: 5_000,
            max_concurrent_pages_open: 4,
            shutdown_grace_period: 1,
        },
        user_agent: UserAgentConfig {
            user_agent: "TestBot/1.0".to_string(),
            referer: "https://www.google.com".to_string(),
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
            page_batch_size: 2,
            lemma_batch_size: 10,
            index_batch_size: 10,
        },
        morphology: MorphologyConfig::default(),
        search: SearchConfig::default(),
        sites: site_urls
            .iter()
            .enumerate()
            .map(|(i, url)| SiteEntry {
                name: format!("Site {}", i + 1),
                url: url.clone(),
            })
            .collect(),
    }
}

fn morphology() -> Arc<dyn Morphology> {
    Arc::new(DictionaryMorphology::from_entries([
        ("собаки", "собака", "С жр,мн,им"),
        ("собаку", "собака", "С жр,ед,вн"),
        ("кошки", "кошка", "С жр,мн,им"),
        ("и", "и", "СОЮЗ"),
    ]))
}

/// Starts a service over a fresh database in `dir`
fn create_service(dir: &TempDir, site_urls: &[String]) -> (IndexingService, SharedStorage) {
    let db_path = dir.path().join("index.db");
    let config = create_test_config(site_urls, &db_path.to_string_lossy());
    let storage = open_storage(&db_path).expect("Failed to open DB");
    let service = IndexingService::new(config, Arc::clone(&storage), morphology())
        .expect("Failed to create service");
    (service, storage)
}

fn html(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn wait_idle(service: &IndexingService) {
    tokio::time::timeout(Duration::from_secs(10), service.wait_until_idle())
        .await
        .expect("Indexing did not finish in time");
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html("Home", r#"<a href="/page1">One</a> <a href="/page2">Two</a>"#),
    )
    .await;
    mount_page(
        &server,
        "/page1",
        html(
            "Page 1",
            r#"собаки и кошки <a href="/page2">Two</a> <a href="/missing">Gone</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/page2", html("Page 2", "собаку")).await;
    mount_page(&server, "/missing", ResponseTemplate::new(404)).await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[server.uri()]);

    assert!(service.start_indexing().unwrap());
    wait_idle(&service).await;

    let storage = storage.lock();
    let site = storage.list_sites().unwrap().remove(0);
    assert_eq!(site.status, SiteStatus::Indexed);

    // The site root and error pages are not stored
    assert_eq!(storage.count_pages(Some(site.id)).unwrap(), 2);
    assert!(storage.get_page_by_path(site.id, "/page1").unwrap().is_some());
    assert!(storage.get_page_by_path(site.id, "/missing").unwrap().is_none());

    let dog = storage.get_lemma(site.id, "собака").unwrap().unwrap();
    assert_eq!(dog.frequency, 2);
    let cat = storage.get_lemma(site.id, "кошка").unwrap().unwrap();
    assert_eq!(cat.frequency, 1);
    assert!(storage.get_lemma(site.id, "и").unwrap().is_none());
}

#[tokio::test]
async fn test_no_url_is_fetched_twice() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "Home",
            r#"<a href="/a">A</a> <a href="/b">B</a> <a href="/a">A again</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    for route in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(
                route,
                r#"<a href="/a">A</a> <a href="/b">B</a> <a href="/c">C</a> <a href="/c#top">C</a>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html("C", "кошки"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[server.uri()]);

    assert!(service.start_indexing().unwrap());
    wait_idle(&service).await;

    assert_eq!(storage.lock().count_pages(None).unwrap(), 3);
    // Wiremock verifies the fetch counts when the server drops
}

#[tokio::test]
async fn test_links_to_the_site_root_do_not_refetch_it() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            "Home",
            r#"<a href="/">Logo</a> <a href="/x">X</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html("X", r#"кошки <a href="/">Home</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[format!("{}/", server.uri())]);

    assert!(service.start_indexing().unwrap());
    wait_idle(&service).await;

    let storage = storage.lock();
    let site = storage.list_sites().unwrap().remove(0);
    assert_eq!(storage.count_pages(Some(site.id)).unwrap(), 1);
    assert!(storage.get_page_by_path(site.id, "/").unwrap().is_none());
    assert!(storage.get_page_by_path(site.id, "/x").unwrap().is_some());
}

#[tokio::test]
async fn test_frequency_counts_pages_across_sites() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    for server in [&first, &second] {
        mount_page(server, "/", html("Home", r#"<a href="/x">X</a>"#)).await;
        mount_page(server, "/x", html("X", "собаки собаку")).await;
    }

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[first.uri(), second.uri()]);

    assert!(service.start_indexing().unwrap());
    wait_idle(&service).await;

    let storage = storage.lock();
    let sites = storage.list_sites().unwrap();
    assert_eq!(sites.len(), 2);
    for site in &sites {
        assert_eq!(site.status, SiteStatus::Indexed);
        let dog = storage.get_lemma(site.id, "собака").unwrap().unwrap();
        assert_eq!(dog.frequency, 1);
    }
    assert_eq!(storage.lemma_frequency("собака", None).unwrap(), 2);
}

#[tokio::test]
async fn test_start_while_running_returns_false() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html("Home", "").set_delay(Duration::from_millis(300)),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[server.uri()]);

    assert!(service.start_indexing().unwrap());
    assert!(service.is_indexing());
    assert!(!service.start_indexing().unwrap());

    wait_idle(&service).await;
    assert!(!service.is_indexing());
    assert_eq!(storage.lock().list_sites().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stop_marks_sites_failed() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html("Home", r#"<a href="/slow">Slow</a>"#),
    )
    .await;
    mount_page(
        &server,
        "/slow",
        html("Slow", "собаки").set_delay(Duration::from_secs(3)),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[server.uri()]);

    assert!(service.start_indexing().unwrap());
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(service.stop_indexing());
    assert!(!service.stop_indexing());
    wait_idle(&service).await;

    let storage = storage.lock();
    let site = storage.list_sites().unwrap().remove(0);
    assert_eq!(site.status, SiteStatus::Failed);
    assert_eq!(site.last_error.as_deref(), Some(STOP_MESSAGE));
    assert_eq!(storage.count_pages(None).unwrap(), 0);
}

#[tokio::test]
async fn test_stop_while_idle_returns_false() {
    let dir = TempDir::new().unwrap();
    let (service, _storage) = create_service(&dir, &["https://example.com".to_string()]);

    assert!(!service.stop_indexing());
}

#[tokio::test]
async fn test_restart_after_stop() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", r#"<a href="/x">X</a>"#)).await;
    mount_page(&server, "/x", html("X", "кошки")).await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[server.uri()]);

    assert!(service.start_indexing().unwrap());
    service.stop_indexing();
    wait_idle(&service).await;

    assert!(service.start_indexing().unwrap());
    wait_idle(&service).await;

    let storage = storage.lock();
    let sites = storage.list_sites().unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages(None).unwrap(), 1);
}

#[tokio::test]
async fn test_unreachable_site_is_failed() {
    // Nothing listens on the discard port
    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &["http://127.0.0.1:9".to_string()]);

    assert!(service.start_indexing().unwrap());
    wait_idle(&service).await;

    let site = storage.lock().list_sites().unwrap().remove(0);
    assert_eq!(site.status, SiteStatus::Failed);
    assert!(site.last_error.is_some());
}

#[tokio::test]
async fn test_index_page_replaces_contribution() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("A", "собаки кошки"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", html("A", "собаки")).await;
    mount_page(&server, "/b", html("B", "кошки")).await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[server.uri()]);

    let page_a = format!("{}/a", server.uri());
    let page_b = format!("{}/b", server.uri());
    assert!(service.index_page(&page_a).await.unwrap());
    assert!(service.index_page(&page_b).await.unwrap());

    let site_id = {
        let storage = storage.lock();
        let site = storage.list_sites().unwrap().remove(0);
        assert_eq!(site.status, SiteStatus::Indexed);
        let cat = storage.get_lemma(site.id, "кошка").unwrap().unwrap();
        assert_eq!(cat.frequency, 2);
        site.id
    };

    // The page no longer mentions cats
    assert!(service.index_page(&page_a).await.unwrap());

    let storage = storage.lock();
    assert_eq!(storage.count_pages(Some(site_id)).unwrap(), 2);
    let cat = storage.get_lemma(site_id, "кошка").unwrap().unwrap();
    assert_eq!(cat.frequency, 1);
    let dog = storage.get_lemma(site_id, "собака").unwrap().unwrap();
    assert_eq!(dog.frequency, 1);
}

#[tokio::test]
async fn test_index_page_is_rejected_during_a_crawl() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html("Home", "").set_delay(Duration::from_millis(500)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html("X", "кошки"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[server.uri()]);

    assert!(service.start_indexing().unwrap());
    let page = format!("{}/x", server.uri());
    assert!(!service.index_page(&page).await.unwrap());

    {
        let storage = storage.lock();
        let site = storage.list_sites().unwrap().remove(0);
        assert!(storage.get_page_by_path(site.id, "/x").unwrap().is_none());
    }

    wait_idle(&service).await;
    assert_eq!(storage.lock().count_pages(None).unwrap(), 0);
}

#[tokio::test]
async fn test_index_page_outside_sites_is_rejected() {
    let server = MockServer::start().await;

    let dir = TempDir::new().unwrap();
    let (service, storage) = create_service(&dir, &[server.uri()]);

    assert!(!service
        .index_page("https://elsewhere.example/page")
        .await
        .unwrap());
    assert!(!service.index_page("   ").await.unwrap());
    assert!(storage.lock().list_sites().unwrap().is_empty());
}
