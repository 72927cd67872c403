//! SQLite-backed history of weather lookups.
//!
//! Two append-only tables: `weather_records` for observations and
//! `weather_failures` for lookups that produced none. Timestamps are stored
//! as fixed-width RFC 3339 text so that ordering by column is chronological.
use chrono::{DateTime, SecondsFormat, Utc};
use fetchlog_common::FailureKind;
use fetchlog_config::{ensure_parent_dir, resolve_path};
use fetchlog_weather::{Units, WeatherFailure, WeatherObservation};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS weather_records (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        city        TEXT    NOT NULL,
        country     TEXT    NOT NULL,
        temperature REAL    NOT NULL,
        feels_like  REAL    NOT NULL,
        humidity    INTEGER NOT NULL,
        pressure    INTEGER NOT NULL,
        wind_speed  REAL    NOT NULL,
        description TEXT    NOT NULL,
        observed_at TEXT    NOT NULL,
        captured_at TEXT    NOT NULL,
        units       TEXT    NOT NULL,
        raw_json    TEXT    NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_weather_records_city ON weather_records(city)",
    "CREATE INDEX IF NOT EXISTS idx_weather_records_captured ON weather_records(captured_at)",
    r#"CREATE TABLE IF NOT EXISTS weather_failures (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        city        TEXT    NOT NULL,
        units       TEXT    NOT NULL,
        kind        TEXT    NOT NULL,
        message     TEXT    NOT NULL,
        status      INTEGER NOT NULL,
        raw_body    TEXT    NOT NULL,
        captured_at TEXT    NOT NULL
    )"#,
];

/// An observation as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObservation {
    pub id: i64,
    pub observation: WeatherObservation,
}

pub struct WeatherStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl WeatherStore {
    /// Open (creating file, parent directories and schema as needed).
    pub async fn open(database_path: &str) -> StoreResult<Self> {
        let path = resolve_path(database_path);
        ensure_parent_dir(&path)?;

        let opts = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&pool).await?;
        }
        debug!(path=%path.display(), "store.weather.open");
        Ok(Self { pool, path })
    }

    pub fn resolved_path(&self) -> &Path {
        &self.path
    }

    pub async fn insert(&self, obs: &WeatherObservation) -> StoreResult<i64> {
        let res = sqlx::query(
            r#"INSERT INTO weather_records
               (city, country, temperature, feels_like, humidity, pressure, wind_speed,
                description, observed_at, captured_at, units, raw_json)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
        )
        .bind(obs.city.as_str())
        .bind(obs.country.as_str())
        .bind(obs.temperature)
        .bind(obs.feels_like)
        .bind(i64::from(obs.humidity))
        .bind(obs.pressure)
        .bind(obs.wind_speed)
        .bind(obs.description.as_str())
        .bind(timestamp(&obs.observed_at))
        .bind(timestamp(&obs.captured_at))
        .bind(obs.units.as_str())
        .bind(obs.raw_json.as_str())
        .execute(&self.pool)
        .await?;
        let id = res.last_insert_rowid();
        info!(id, city=%obs.city, "store.weather.insert");
        Ok(id)
    }

    pub async fn insert_failure(&self, failure: &WeatherFailure) -> StoreResult<i64> {
        let res = sqlx::query(
            r#"INSERT INTO weather_failures
               (city, units, kind, message, status, raw_body, captured_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )
        .bind(failure.city.as_str())
        .bind(failure.units.as_str())
        .bind(failure.kind.as_str())
        .bind(failure.message.as_str())
        .bind(i64::from(failure.status))
        .bind(failure.raw_body.as_str())
        .bind(timestamp(&failure.captured_at))
        .execute(&self.pool)
        .await?;
        let id = res.last_insert_rowid();
        info!(id, city=%failure.city, kind=%failure.kind, "store.weather.insert_failure");
        Ok(id)
    }

    /// Newest observations first. `city_filter` is a case-insensitive
    /// substring match; blank means no filter.
    pub async fn recent(
        &self,
        city_filter: Option<&str>,
        limit: i64,
    ) -> StoreResult<Vec<StoredObservation>> {
        let pattern = city_filter
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| format!("%{}%", escape_like(c)));
        let rows = sqlx::query(
            r#"SELECT id, city, country, temperature, feels_like, humidity, pressure,
                      wind_speed, description, observed_at, captured_at, units, raw_json
               FROM weather_records
               WHERE ?1 IS NULL OR city LIKE ?1 ESCAPE '\'
               ORDER BY captured_at DESC, id DESC
               LIMIT ?2"#,
        )
        .bind(pattern.as_deref())
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        debug!(rows = rows.len(), filter=?city_filter, limit, "store.weather.recent");
        rows.iter().map(observation_from_row).collect()
    }

    /// Newest failures first.
    pub async fn recent_failures(&self, limit: i64) -> StoreResult<Vec<WeatherFailure>> {
        let rows = sqlx::query(
            r#"SELECT city, units, kind, message, status, raw_body, captured_at
               FROM weather_failures
               ORDER BY captured_at DESC, id DESC
               LIMIT ?1"#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| -> StoreResult<WeatherFailure> {
                Ok(WeatherFailure {
                    city: r.try_get("city")?,
                    units: Units::from_config(&r.try_get::<String, _>("units")?),
                    kind: FailureKind::from_label(&r.try_get::<String, _>("kind")?),
                    message: r.try_get("message")?,
                    status: u16::try_from(r.try_get::<i64, _>("status")?).unwrap_or(0),
                    raw_body: r.try_get("raw_body")?,
                    captured_at: parse_timestamp(&r.try_get::<String, _>("captured_at")?)?,
                    cause: None,
                })
            })
            .collect()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn observation_from_row(r: &SqliteRow) -> StoreResult<StoredObservation> {
    Ok(StoredObservation {
        id: r.try_get("id")?,
        observation: WeatherObservation {
            city: r.try_get("city")?,
            country: r.try_get("country")?,
            temperature: r.try_get("temperature")?,
            feels_like: r.try_get("feels_like")?,
            humidity: r.try_get::<i64, _>("humidity")?.clamp(0, 100) as u8,
            pressure: r.try_get("pressure")?,
            wind_speed: r.try_get("wind_speed")?,
            description: r.try_get("description")?,
            observed_at: parse_timestamp(&r.try_get::<String, _>("observed_at")?)?,
            captured_at: parse_timestamp(&r.try_get::<String, _>("captured_at")?)?,
            units: Units::from_config(&r.try_get::<String, _>("units")?),
            raw_json: r.try_get("raw_json")?,
        },
    })
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {raw:?}: {e}")))
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
