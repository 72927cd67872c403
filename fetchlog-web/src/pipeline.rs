use fetchlog_common::{Failure, FailureKind};
use fetchlog_config::ScrapingSettings;
use fetchlog_http::{HttpClient, parse_http_url};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::extract::extract;
use crate::page::{PageExtract, ScrapeOutcome};

const TARGET: &str = "the page";

/// Scrape pipeline: validate, acquire, classify, extract.
#[derive(Debug, Clone)]
pub struct Scraper {
    http: HttpClient,
    settings: ScrapingSettings,
}

impl Scraper {
    pub fn new(http: HttpClient, settings: &ScrapingSettings) -> Self {
        Self {
            http,
            settings: settings.clone(),
        }
    }

    /// Scrape `url` once. Every problem comes back as
    /// [`ScrapeOutcome::Failure`] holding a persistable record.
    pub async fn scrape(&self, url: &str, cancel: &CancellationToken) -> ScrapeOutcome {
        let outcome = self.run(url, cancel).await;
        let page = outcome.record();
        if outcome.is_success() {
            info!(
                url=%page.url,
                status=page.status,
                links=page.links.len(),
                "scrape.ok"
            );
        } else {
            error!(
                url=%page.url,
                status=page.status,
                kind=%page.failure_kind.unwrap_or(FailureKind::UnclassifiedFailure),
                cause=%page.cause_or_dash(),
                error_message=%page.error_message,
                "scrape.failed"
            );
        }
        outcome
    }

    async fn run(&self, url: &str, cancel: &CancellationToken) -> ScrapeOutcome {
        let parsed = match parse_http_url(url) {
            Ok(parsed) => parsed,
            Err(err) => {
                let failure = err.to_failure(TARGET);
                return ScrapeOutcome::Failure(PageExtract::failure(url, 0, &failure));
            }
        };

        let resp = match self
            .http
            .acquire_url(&parsed, self.settings.request_timeout_seconds, cancel)
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                let failure = err.to_failure(TARGET);
                return ScrapeOutcome::Failure(PageExtract::failure(url, 0, &failure));
            }
        };

        if !resp.is_success() {
            let failure = Failure::new(
                FailureKind::RemoteRejected,
                format!("HTTP {}", resp.status_line()),
            );
            return ScrapeOutcome::Failure(PageExtract::failure(url, resp.status, &failure));
        }
        if resp.is_blank() {
            let failure = Failure::new(FailureKind::EmptyResponse, "received an empty HTML page");
            return ScrapeOutcome::Failure(PageExtract::failure(url, resp.status, &failure));
        }

        let extracted = extract(&resp.body, &parsed, self.settings.max_links);
        ScrapeOutcome::Success(PageExtract::success(url, resp.status, extracted))
    }
}
