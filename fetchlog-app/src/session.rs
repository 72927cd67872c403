use anyhow::{Context, Result};
use fetchlog_config::{Settings, resolve_path};
use fetchlog_http::HttpClient;
use fetchlog_runtime::FetchlogHandle;
use fetchlog_store::{ScrapeStore, StoredExtract, StoredObservation, WeatherStore};
use fetchlog_weather::{WeatherFailure, WeatherFetcher, WeatherOutcome, WeatherRequest};
use fetchlog_web::{ScrapeOutcome, Scraper};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// One console session: the current settings snapshot plus the pipelines
/// built from it. Stores are opened per operation so a storage change
/// takes effect on the next action.
pub struct Session {
    settings: Settings,
    http: HttpClient,
    handle: FetchlogHandle,
}

impl Session {
    pub fn new(settings: Settings, handle: FetchlogHandle) -> Result<Self> {
        let http = HttpClient::new().context("building HTTP client")?;
        Ok(Self {
            settings,
            http,
            handle,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cancellation(&self) -> Arc<CancellationToken> {
        self.handle.cancellation()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.cancellation().is_cancelled()
    }

    /// Swap in a new settings snapshot with different storage locations.
    pub fn reconfigure_storage(
        &mut self,
        relational_path: Option<&str>,
        document_path: Option<&str>,
        collection: Option<&str>,
    ) {
        self.settings = self
            .settings
            .with_storage(relational_path, document_path, collection);
        info!(
            relational=%self.settings.relational_db.database_path,
            document=%self.settings.document_db.database_path,
            collection=%self.settings.document_db.collection_name,
            "session.storage.changed"
        );
    }

    pub fn storage_summary(&self) -> String {
        format!(
            "SQLite: {}\nDocument store: {}\nDocument collection: {}",
            resolve_path(&self.settings.relational_db.database_path).display(),
            resolve_path(&self.settings.document_db.database_path).display(),
            self.settings.document_db.collection_name
        )
    }

    async fn weather_store(&self) -> Result<WeatherStore> {
        let path = &self.settings.relational_db.database_path;
        WeatherStore::open(path)
            .await
            .with_context(|| format!("opening weather store at {path}"))
    }

    fn scrape_store(&self) -> Result<ScrapeStore> {
        let db = &self.settings.document_db;
        ScrapeStore::open(&db.database_path, &db.collection_name)
            .with_context(|| format!("opening document store at {}", db.database_path))
    }

    /// Fetch, then persist whichever arm came back. The id is the row in
    /// `weather_records` on success, in `weather_failures` otherwise.
    pub async fn weather(&self, req: &WeatherRequest) -> Result<(WeatherOutcome, i64)> {
        let fetcher = WeatherFetcher::new(self.http.clone(), &self.settings.open_weather_map);
        let outcome = fetcher.fetch(req, &self.handle.operation_token()).await;

        let store = self.weather_store().await?;
        let row = match &outcome {
            WeatherOutcome::Success(obs) => store.insert(obs).await?,
            WeatherOutcome::Failure(f) => store.insert_failure(f).await?,
        };
        store.close().await;
        Ok((outcome, row))
    }

    /// Scrape, then persist the document unconditionally.
    pub async fn scrape(&self, url: &str) -> Result<(ScrapeOutcome, Uuid)> {
        let scraper = Scraper::new(self.http.clone(), &self.settings.scraping);
        let outcome = scraper.scrape(url, &self.handle.operation_token()).await;

        let store = self.scrape_store()?;
        let id = store.insert(outcome.record()).await?;
        Ok((outcome, id))
    }

    pub async fn weather_history(
        &self,
        city_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<StoredObservation>> {
        let store = self.weather_store().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = store.recent(city_filter, limit).await?;
        store.close().await;
        Ok(rows)
    }

    /// Failed lookups, newest first.
    pub async fn weather_failures(&self, limit: usize) -> Result<Vec<WeatherFailure>> {
        let store = self.weather_store().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = store.recent_failures(limit).await?;
        store.close().await;
        Ok(rows)
    }

    pub async fn scrape_history(&self, n: usize) -> Result<Vec<StoredExtract>> {
        Ok(self.scrape_store()?.latest(n).await?)
    }
}
