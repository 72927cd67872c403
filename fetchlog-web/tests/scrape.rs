mod common;

use fetchlog_common::FailureKind;
use fetchlog_config::ScrapingSettings;
use fetchlog_http::HttpClient;
use fetchlog_web::{LinkEntry, ScrapeOutcome, Scraper};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scraper(max_links: usize) -> Scraper {
    Scraper::new(
        HttpClient::new().expect("client"),
        &ScrapingSettings {
            max_links,
            request_timeout_seconds: 5,
        },
    )
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

#[tokio::test]
async fn page_is_extracted_against_its_own_url() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blog/post"))
        .respond_with(html(
            r#"<html><head><title>Hello&nbsp;World</title></head>
               <body><h1>  News </h1>
               <a href="/x">  link  </a>
               <a href="next">Next</a>
               <a href="/X">dup</a>
               <a href="https://elsewhere.org/">Out</a>
               </body></html>"#,
        ))
        .mount(&server)
        .await;

    let url = format!("{}/blog/post", server.uri());
    let outcome = scraper(10).scrape(&url, &CancellationToken::new()).await;
    assert!(outcome.is_success(), "{outcome:?}");

    let page = outcome.into_record();
    assert_eq!(page.status, 200);
    assert_eq!(page.title, "Hello World");
    assert_eq!(page.heading, "News");
    assert_eq!(
        page.links,
        vec![
            LinkEntry {
                text: "link".into(),
                href: format!("{}/x", server.uri()),
            },
            LinkEntry {
                text: "Next".into(),
                href: format!("{}/blog/next", server.uri()),
            },
            LinkEntry {
                text: "Out".into(),
                href: "https://elsewhere.org/".into(),
            },
        ]
    );
}

#[tokio::test]
async fn link_cap_is_respected() {
    let server = MockServer::start().await;
    let anchors: String = (0..25).map(|i| format!("<a href=\"/p{i}\">p{i}</a>")).collect();
    Mock::given(method("GET"))
        .respond_with(html(&anchors))
        .mount(&server)
        .await;

    let outcome = scraper(10)
        .scrape(&server.uri(), &CancellationToken::new())
        .await;
    assert_eq!(outcome.record().links.len(), 10);
    assert_eq!(outcome.record().links[9].text, "p9");
}

#[tokio::test]
async fn non_http_url_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<p>x</p>"))
        .expect(0)
        .mount(&server)
        .await;

    for bad in ["ftp://example.com/file", "/relative/path", ""] {
        let outcome = scraper(10).scrape(bad, &CancellationToken::new()).await;
        match outcome {
            ScrapeOutcome::Failure(page) => {
                assert_eq!(
                    page.failure_kind,
                    Some(FailureKind::MalformedInput),
                    "{bad}"
                );
                assert_eq!(page.status, 0);
                assert!(page.links.is_empty());
                assert!(!page.error_message.is_empty());
            }
            other => panic!("expected failure for {bad:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn error_status_is_recorded_with_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<h1>gone</h1>"))
        .mount(&server)
        .await;

    let outcome = scraper(10)
        .scrape(&server.uri(), &CancellationToken::new())
        .await;
    let page = outcome.record();
    assert_eq!(page.failure_kind, Some(FailureKind::RemoteRejected));
    assert_eq!(page.status, 404);
    assert_eq!(page.error_message, "HTTP 404 Not Found");
    assert!(page.heading.is_empty());
}

#[tokio::test]
async fn blank_page_is_an_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("   "))
        .mount(&server)
        .await;

    let outcome = scraper(10)
        .scrape(&server.uri(), &CancellationToken::new())
        .await;
    assert_eq!(outcome.failure_kind(), Some(FailureKind::EmptyResponse));
    assert_eq!(outcome.record().status, 200);
}

#[tokio::test]
async fn timeout_yields_an_empty_failure_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<title>late</title>").set_delay(Duration::from_secs(8)))
        .mount(&server)
        .await;

    let outcome = scraper(10)
        .scrape(&server.uri(), &CancellationToken::new())
        .await;
    let page = outcome.into_record();
    assert!(!page.success);
    assert_eq!(page.failure_kind, Some(FailureKind::Timeout));
    assert!(page.error_message.to_lowercase().contains("timeout"));
    assert_eq!(page.status, 0);
    assert!(page.links.is_empty());
    assert!(page.title.is_empty());
}
