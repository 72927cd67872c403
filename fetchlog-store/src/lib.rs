//! Append-only persistence for both pipelines.
//!
//! - [`WeatherStore`]: SQLite (via sqlx) tables for observations and failed
//!   lookups
//! - [`ScrapeStore`]: redb document collection of [`fetchlog_web::PageExtract`]
//!   records, successes and failures alike
//!
//! Neither store ever updates or deletes; history only accumulates.

mod documents;
mod error;
mod weather;

pub use documents::{ScrapeStore, StoredExtract};
pub use error::{StoreError, StoreResult};
pub use weather::{StoredObservation, WeatherStore};
