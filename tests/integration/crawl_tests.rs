//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test the full
//! crawl cycle end-to-end. Test hostnames (`a.test`, `b.test`) are mapped onto
//! the mock servers through the client's DNS overrides so the host-based scope
//! policy sees distinct hosts.

use reqwest::redirect::Policy;
use reqwest::Client;
use site_cartographer::config::Config;
use site_cartographer::events::{self, CrawlEvent};
use site_cartographer::{Coordinator, CrawlResult, Document};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Absolute URL on `host` served by `server`
fn url_on(host: &str, server: &MockServer, path: &str) -> String {
    format!("http://{}:{}{}", host, server.address().port(), path)
}

/// Client resolving each test hostname to its mock server
fn test_client(hosts: &[(&str, &MockServer)]) -> Client {
    let mut builder = Client::builder()
        .redirect(Policy::none())
        .timeout(Duration::from_secs(10));
    for (host, server) in hosts {
        builder = builder.resolve(host, *server.address());
    }
    builder.build().expect("Failed to build test client")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn config_with_workers(workers: u32) -> Config {
    let mut config = Config::default();
    config.crawler.workers = workers;
    config
}

fn doc<'a>(result: &'a CrawlResult, url: &str) -> &'a Document {
    result
        .get(url)
        .unwrap_or_else(|| panic!("missing document {}", url))
}

#[tokio::test]
async fn test_end_to_end_graph() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Home</title><link rel="stylesheet" href="/s.css"></head>
            <body><a href="/b">B</a></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<html><head><title>B</title></head></html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/s.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(".x{background:url(img.png)}")
                .insert_header("content-type", "text/css"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&[("a.test", &server)]);
    let coordinator = Coordinator::with_client(Config::default(), client);
    let root = url_on("a.test", &server, "/");
    let result = coordinator.run(&root).await.expect("Crawl failed");

    assert_eq!(result.address(), root);
    assert_eq!(result.len(), 4);

    let urls: Vec<&str> = result.documents().map(|d| d.url.as_str()).collect();
    let b = url_on("a.test", &server, "/b");
    let css = url_on("a.test", &server, "/s.css");
    let img = url_on("a.test", &server, "/img.png");
    // FIFO drain: the stylesheet link precedes the anchor in the markup
    assert_eq!(urls, vec![root.as_str(), css.as_str(), b.as_str(), img.as_str()]);

    let home = doc(&result, &root);
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.status_code, Some(200));
    assert!(home.referenced_by.is_empty());
    assert_eq!(home.references.len(), 2);

    let b_doc = doc(&result, &b);
    assert_eq!(b_doc.referenced_by.len(), 1);
    assert_eq!(b_doc.referenced_by[0].source_url, root);
    assert_eq!(b_doc.referenced_by[0].excerpt.as_deref(), Some(r#"<a href="/b">B</a>"#));

    let css_doc = doc(&result, &css);
    assert_eq!(css_doc.referenced_by[0].source_url, root);
    assert!(css_doc.referenced_by[0]
        .excerpt
        .as_deref()
        .unwrap()
        .starts_with("<link"));

    let img_doc = doc(&result, &img);
    assert_eq!(img_doc.referenced_by.len(), 1);
    assert_eq!(img_doc.referenced_by[0].source_url, css);
    assert_eq!(
        img_doc.referenced_by[0].excerpt.as_deref(),
        Some("background: url(img.png)")
    );
    assert_eq!(
        img_doc.response_headers.get("content-type").map(String::as_str),
        Some("image/png")
    );
}

#[tokio::test]
async fn test_dedup_two_links_one_document() {
    let server = MockServer::start().await;

    Mock::given(path("/"))
        .respond_with(html(r#"<a href="/t">first</a><p><a href="t">second</a></p>"#))
        .mount(&server)
        .await;
    Mock::given(path("/t"))
        .respond_with(html("<p>target</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&[("a.test", &server)]);
    let coordinator = Coordinator::with_client(Config::default(), client);
    let result = coordinator
        .run(&url_on("a.test", &server, "/"))
        .await
        .expect("Crawl failed");

    assert_eq!(result.len(), 2);
    let target = doc(&result, &url_on("a.test", &server, "/t"));
    assert_eq!(target.referenced_by.len(), 2);
    assert_eq!(result.reference_count(), 2);
}

#[tokio::test]
async fn test_scope_allows_one_hop_off_host() {
    let site_a = MockServer::start().await;
    let site_b = MockServer::start().await;

    let page1 = url_on("b.test", &site_b, "/page1");
    let page2 = url_on("b.test", &site_b, "/page2");

    Mock::given(path("/"))
        .respond_with(html(&format!(r#"<a href="{}">off site</a>"#, page1)))
        .mount(&site_a)
        .await;
    Mock::given(path("/page1"))
        .respond_with(html(r#"<a href="/page2">deeper</a>"#))
        .expect(1)
        .mount(&site_b)
        .await;
    Mock::given(path("/page2"))
        .respond_with(html("<p>never fetched</p>"))
        .expect(0)
        .mount(&site_b)
        .await;

    let client = test_client(&[("a.test", &site_a), ("b.test", &site_b)]);
    let coordinator = Coordinator::with_client(Config::default(), client);
    let result = coordinator
        .run(&url_on("a.test", &site_a, "/"))
        .await
        .expect("Crawl failed");

    assert!(result.contains(&page1));
    assert!(!result.contains(&page2));
    assert_eq!(result.len(), 2);
}

#[tokio::test]
async fn test_redirect_is_a_separate_document() {
    let server = MockServer::start().await;

    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/new"))
        .respond_with(html("<title>New</title>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&[("a.test", &server)]);
    let coordinator = Coordinator::with_client(Config::default(), client);
    let old = url_on("a.test", &server, "/old");
    let new = url_on("a.test", &server, "/new");
    let result = coordinator.run(&old).await.expect("Crawl failed");

    assert_eq!(result.len(), 2);

    let old_doc = doc(&result, &old);
    assert_eq!(old_doc.status_code, Some(302));
    assert_eq!(old_doc.redirect_url.as_deref(), Some(new.as_str()));
    assert!(!old_doc.is_redirection_loop);

    let new_doc = doc(&result, &new);
    assert_eq!(new_doc.title.as_deref(), Some("New"));
    assert_eq!(new_doc.referenced_by.len(), 1);
    assert_eq!(new_doc.referenced_by[0].source_url, old);
    assert!(new_doc.referenced_by[0].excerpt.is_none());
}

#[tokio::test]
async fn test_redirect_target_off_host_is_fetched_but_not_followed() {
    let site_a = MockServer::start().await;
    let site_b = MockServer::start().await;

    let landing = url_on("b.test", &site_b, "/landing");

    Mock::given(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", landing.as_str()))
        .mount(&site_a)
        .await;
    Mock::given(path("/landing"))
        .respond_with(html(r#"<a href="/elsewhere">x</a>"#))
        .expect(1)
        .mount(&site_b)
        .await;
    Mock::given(path("/elsewhere"))
        .respond_with(html("<p>x</p>"))
        .expect(0)
        .mount(&site_b)
        .await;

    let client = test_client(&[("a.test", &site_a), ("b.test", &site_b)]);
    let coordinator = Coordinator::with_client(Config::default(), client);
    let result = coordinator
        .run(&url_on("a.test", &site_a, "/"))
        .await
        .expect("Crawl failed");

    assert_eq!(result.len(), 2);
    assert!(result.contains(&landing));
}

#[tokio::test]
async fn test_redirect_loop_is_flagged() {
    let server = MockServer::start().await;

    Mock::given(path("/a"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/b"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/b"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/a"))
        .expect(1)
        .mount(&server)
        .await;

    let (sender, mut receiver) = events::channel();
    let client = test_client(&[("a.test", &server)]);
    let coordinator = Coordinator::with_client(Config::default(), client).with_events(sender);
    let a = url_on("a.test", &server, "/a");
    let b = url_on("a.test", &server, "/b");
    let result = coordinator.run(&a).await.expect("Crawl failed");
    drop(coordinator);

    assert_eq!(result.len(), 2);
    assert!(doc(&result, &a).is_redirection_loop);
    assert!(doc(&result, &b).is_redirection_loop);
    assert_eq!(doc(&result, &a).referenced_by.len(), 1);

    let mut loop_updates = 0;
    while let Some(event) = receiver.recv().await {
        if let CrawlEvent::DocumentUpdated {
            reference: None,
            document,
        } = event
        {
            assert!(document.is_redirection_loop);
            loop_updates += 1;
        }
    }
    assert_eq!(loop_updates, 2);
}

async fn crawl_anchored_redirect_pair(workers: u32) -> (CrawlResult, String, String) {
    let server = MockServer::start().await;

    Mock::given(path("/"))
        .respond_with(html(r#"<a href="/a">a</a><a href="/b">b</a>"#))
        .mount(&server)
        .await;
    Mock::given(path("/a"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/b"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/b"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/a"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&[("a.test", &server)]);
    let coordinator = Coordinator::with_client(config_with_workers(workers), client);
    let root = url_on("a.test", &server, "/");
    let result = coordinator.run(&root).await.expect("Crawl failed");

    (
        result,
        url_on("a.test", &server, "/a"),
        url_on("a.test", &server, "/b"),
    )
}

#[tokio::test]
async fn test_redirect_loop_between_linked_pages_is_flagged() {
    let (result, a, b) = crawl_anchored_redirect_pair(1).await;

    assert_eq!(result.len(), 3);
    assert_eq!(doc(&result, &a).redirect_url.as_deref(), Some(b.as_str()));
    assert_eq!(doc(&result, &b).redirect_url.as_deref(), Some(a.as_str()));
    assert!(doc(&result, &a).is_redirection_loop);
    assert!(doc(&result, &b).is_redirection_loop);
    assert!(!result.documents().next().unwrap().is_redirection_loop);
}

#[tokio::test]
async fn test_redirect_loop_between_linked_pages_with_workers() {
    let (result, a, b) = crawl_anchored_redirect_pair(4).await;

    assert_eq!(result.len(), 3);
    assert!(doc(&result, &a).is_redirection_loop);
    assert!(doc(&result, &b).is_redirection_loop);
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_and_crawl_continues() {
    let server = MockServer::start().await;

    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dead = format!("http://127.0.0.1:{}/gone", closed_port);

    Mock::given(path("/"))
        .respond_with(html(&format!(
            r#"<a href="{}">dead</a><a href="/alive">alive</a>"#,
            dead
        )))
        .mount(&server)
        .await;
    Mock::given(path("/alive"))
        .respond_with(html("<p>ok</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&[("a.test", &server)]);
    let coordinator = Coordinator::with_client(Config::default(), client);
    let result = coordinator
        .run(&url_on("a.test", &server, "/"))
        .await
        .expect("Crawl failed");

    assert_eq!(result.len(), 3);

    let dead_doc = doc(&result, &dead);
    assert!(dead_doc.status_code.is_none());
    assert!(dead_doc.reason_phrase.is_none());
    assert!(dead_doc.has_error());
    assert!(dead_doc
        .error_message
        .as_deref()
        .unwrap()
        .contains("FetchError: request failed"));
    assert!(dead_doc.full_error_message.is_some());

    assert_eq!(
        doc(&result, &url_on("a.test", &server, "/alive")).status_code,
        Some(200)
    );
}

#[tokio::test]
async fn test_error_status_pages_are_documents() {
    let server = MockServer::start().await;

    Mock::given(path("/"))
        .respond_with(html(r#"<a href="/missing">x</a><img src="/broken.png">"#))
        .mount(&server)
        .await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(path("/broken.png"))
        .respond_with(ResponseTemplate::new(500).insert_header("content-type", "image/png"))
        .mount(&server)
        .await;

    let client = test_client(&[("a.test", &server)]);
    let coordinator = Coordinator::with_client(Config::default(), client);
    let result = coordinator
        .run(&url_on("a.test", &server, "/"))
        .await
        .expect("Crawl failed");

    let missing = doc(&result, &url_on("a.test", &server, "/missing"));
    assert_eq!(missing.status_code, Some(404));
    assert_eq!(missing.reason_phrase.as_deref(), Some("Not Found"));
    assert!(!missing.has_error());

    let broken = doc(&result, &url_on("a.test", &server, "/broken.png"));
    assert_eq!(broken.status_code, Some(500));
}

#[tokio::test]
async fn test_multiple_workers_fetch_each_url_once() {
    let server = MockServer::start().await;

    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">p{}</a>"#, i, i))
        .collect();
    Mock::given(path("/"))
        .respond_with(html(&links))
        .expect(1)
        .mount(&server)
        .await;

    for i in 0..20 {
        // every page links back to the root and to its neighbour
        let body = format!(r#"<a href="/">home</a><a href="/p{}">next</a>"#, (i + 1) % 20);
        Mock::given(path(format!("/p{}", i)))
            .respond_with(html(&body).set_delay(Duration::from_millis(20)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let (sender, mut receiver) = events::channel();
    let client = test_client(&[("a.test", &server)]);
    let coordinator =
        Coordinator::with_client(config_with_workers(4), client).with_events(sender);
    let root = url_on("a.test", &server, "/");
    let result = coordinator.run(&root).await.expect("Crawl failed");
    drop(coordinator);

    assert_eq!(result.len(), 21);
    assert_eq!(doc(&result, &root).referenced_by.len(), 20);
    for i in 0..20 {
        let page = doc(&result, &url_on("a.test", &server, &format!("/p{}", i)));
        assert_eq!(page.referenced_by.len(), 2);
    }

    let mut parsed = 0;
    while let Some(event) = receiver.recv().await {
        if matches!(event, CrawlEvent::DocumentParsed { .. }) {
            parsed += 1;
        }
    }
    assert_eq!(parsed, 21);
}

#[tokio::test]
async fn test_cancellation_keeps_partial_result() {
    let server = MockServer::start().await;

    Mock::given(path("/"))
        .respond_with(html(r#"<a href="/slow">slow</a><a href="/later">later</a>"#))
        .mount(&server)
        .await;
    Mock::given(path("/slow"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;
    Mock::given(path("/later"))
        .respond_with(html("<p>later</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&[("a.test", &server)]);
    let coordinator = Coordinator::with_client(Config::default(), client);
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        }
    });

    let started = Instant::now();
    let result = coordinator
        .run_with_cancellation(&url_on("a.test", &server, "/"), cancel)
        .await
        .expect("Cancelled crawl should still return a result");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.len(), 2);

    let slow = doc(&result, &url_on("a.test", &server, "/slow"));
    assert!(slow.status_code.is_none());
    assert!(slow.error_message.as_deref().unwrap().contains("cancelled"));
    assert!(!result.contains(&url_on("a.test", &server, "/later")));
    assert_eq!(result.in_flight().count(), 0);
}

#[tokio::test]
async fn test_invalid_seed_is_an_error() {
    let (sender, mut receiver) = events::channel();
    let coordinator = Coordinator::new(Config::default())
        .expect("Failed to build coordinator")
        .with_events(sender);

    assert!(coordinator.run("not a url").await.is_err());
    assert!(matches!(
        receiver.try_recv(),
        Ok(CrawlEvent::CrawlError { .. })
    ));
}
