use std::sync::{Arc, Mutex};

use fetchlog_config::ScrapingSettings;
use fetchlog_http::HttpClient;
use fetchlog_web::Scraper;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Field names of every ERROR event seen while installed.
#[derive(Clone, Default)]
struct ErrorEvents(Arc<Mutex<Vec<Vec<String>>>>);

impl ErrorEvents {
    fn take(&self) -> Vec<Vec<String>> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

#[derive(Default)]
struct FieldNames(Vec<String>);

impl Visit for FieldNames {
    fn record_debug(&mut self, field: &Field, _value: &dyn std::fmt::Debug) {
        self.0.push(field.name().to_string());
    }
}

impl<S: Subscriber> Layer<S> for ErrorEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut names = FieldNames::default();
        event.record(&mut names);
        self.0.lock().unwrap().push(names.0);
    }
}

fn scraper() -> Scraper {
    Scraper::new(
        HttpClient::new().expect("client"),
        &ScrapingSettings {
            max_links: 10,
            request_timeout_seconds: 5,
        },
    )
}

async fn error_lines_for(url: &str) -> Vec<Vec<String>> {
    let events = ErrorEvents::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));
    let outcome = scraper().scrape(url, &CancellationToken::new()).await;
    assert!(!outcome.is_success(), "{outcome:?}");
    events.take()
}

fn assert_single_error_line(lines: &[Vec<String>]) {
    assert_eq!(lines.len(), 1, "{lines:?}");
    let fields = &lines[0];
    for name in ["url", "kind", "cause", "error_message"] {
        assert!(
            fields.iter().any(|f| f == name),
            "missing {name}: {fields:?}"
        );
    }
    assert_eq!(
        fields.iter().filter(|f| *f == "message").count(),
        1,
        "{fields:?}"
    );
}

#[tokio::test]
async fn refused_connection_logs_one_error_line() {
    let lines = error_lines_for("http://127.0.0.1:9/").await;
    assert_single_error_line(&lines);
}

#[tokio::test]
async fn rejected_status_logs_one_error_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let lines = error_lines_for(&server.uri()).await;
    assert_single_error_line(&lines);
}

#[tokio::test]
async fn malformed_url_logs_one_error_line() {
    let lines = error_lines_for("not a url").await;
    assert_single_error_line(&lines);
}
