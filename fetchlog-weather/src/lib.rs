//! Weather pipeline: units resolution, payload normalization and the
//! fetcher that ties them to the HTTP acquisition gate.
//!
//! ```rust,no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use fetchlog_config::Settings;
//! use fetchlog_http::HttpClient;
//! use fetchlog_weather::{WeatherFetcher, WeatherOutcome, WeatherRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let settings = Settings::default();
//! let fetcher = WeatherFetcher::new(HttpClient::new()?, &settings.open_weather_map);
//! match fetcher.fetch(&WeatherRequest::for_city("Oslo"), &CancellationToken::new()).await {
//!     WeatherOutcome::Success(obs) => {
//!         println!("{} {}", obs.temperature, obs.units.temperature_symbol())
//!     }
//!     WeatherOutcome::Failure(f) => eprintln!("{}: {}", f.kind, f.message),
//! }
//! # Ok(()) }
//! ```
mod fetcher;
mod normalize;
mod outcome;
mod units;

pub use fetcher::{WeatherFetcher, WeatherRequest};
pub use normalize::{ParseError, WeatherObservation, normalize};
pub use outcome::{WeatherFailure, WeatherOutcome};
pub use units::{Units, normalize_units};
