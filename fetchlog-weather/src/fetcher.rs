use fetchlog_common::{Failure, FailureKind};
use fetchlog_config::OpenWeatherMapSettings;
use fetchlog_http::{HttpClient, parse_http_url};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

use crate::normalize::normalize;
use crate::outcome::{WeatherFailure, WeatherOutcome};
use crate::units::Units;

const TARGET: &str = "the weather API";

/// Caller input for one weather lookup. Blank `units` / `language` mean
/// "use the configured default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeatherRequest {
    pub city: String,
    pub units: String,
    pub language: String,
}

impl WeatherRequest {
    pub fn for_city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            ..Self::default()
        }
    }
}

/// Weather pipeline: validate, acquire, classify, normalize.
#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    http: HttpClient,
    settings: OpenWeatherMapSettings,
}

impl WeatherFetcher {
    pub fn new(http: HttpClient, settings: &OpenWeatherMapSettings) -> Self {
        Self {
            http,
            settings: settings.clone(),
        }
    }

    pub fn settings(&self) -> &OpenWeatherMapSettings {
        &self.settings
    }

    /// Units actually used for `requested`.
    pub fn resolve_units(&self, requested: &str) -> Units {
        Units::resolve(requested, Units::from_config(&self.settings.default_units))
    }

    /// Language actually sent for `requested`.
    pub fn resolve_language(&self, requested: &str) -> String {
        let trimmed = requested.trim();
        if trimmed.is_empty() {
            self.settings.default_language.trim().to_lowercase()
        } else {
            trimmed.to_lowercase()
        }
    }

    /// Run one lookup. Never fails: every problem comes back as
    /// [`WeatherOutcome::Failure`].
    pub async fn fetch(&self, req: &WeatherRequest, cancel: &CancellationToken) -> WeatherOutcome {
        let units = self.resolve_units(&req.units);
        let outcome = self.run(req, units, cancel).await;
        match &outcome {
            WeatherOutcome::Success(obs) => info!(
                city=%obs.city,
                country=%obs.country,
                units=%obs.units,
                temperature=obs.temperature,
                "weather.fetch.ok"
            ),
            WeatherOutcome::Failure(f) => error!(
                city=%f.city,
                kind=%f.kind,
                status=f.status,
                cause=%f.cause_or_dash(),
                error_message=%f.message,
                "weather.fetch.failed"
            ),
        }
        outcome
    }

    async fn run(
        &self,
        req: &WeatherRequest,
        units: Units,
        cancel: &CancellationToken,
    ) -> WeatherOutcome {
        let city = req.city.trim();
        if city.is_empty() {
            return WeatherOutcome::Failure(WeatherFailure::new(
                city,
                units,
                FailureKind::MalformedInput,
                "city must not be empty",
            ));
        }
        if !self.settings.has_api_key() {
            return WeatherOutcome::Failure(WeatherFailure::new(
                city,
                units,
                FailureKind::ConfigurationMissing,
                "OpenWeatherMap API key is not set (open_weather_map.api_key)",
            ));
        }

        let language = self.resolve_language(&req.language);
        let url = match self.request_url(city, units, &language) {
            Ok(url) => url,
            Err(failure) => {
                return WeatherOutcome::Failure(WeatherFailure::from_failure(city, units, &failure));
            }
        };

        let resp = match self
            .http
            .acquire_url(&url, self.settings.request_timeout_seconds, cancel)
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                let failure = err.to_failure(TARGET);
                return WeatherOutcome::Failure(WeatherFailure::from_failure(city, units, &failure));
            }
        };

        if !resp.is_success() {
            return WeatherOutcome::Failure(
                WeatherFailure::new(
                    city,
                    units,
                    FailureKind::RemoteRejected,
                    format!("API error: {}", resp.status_line()),
                )
                .with_status(resp.status)
                .with_raw_body(resp.body),
            );
        }
        if resp.is_blank() {
            return WeatherOutcome::Failure(
                WeatherFailure::new(
                    city,
                    units,
                    FailureKind::EmptyResponse,
                    "API returned an empty response",
                )
                .with_status(resp.status),
            );
        }

        match normalize(&resp.body, city, units) {
            Ok(obs) => WeatherOutcome::Success(obs),
            Err(err) => WeatherOutcome::Failure(
                WeatherFailure::new(
                    city,
                    units,
                    FailureKind::ParseFailure,
                    "could not parse the API response",
                )
                .with_status(resp.status)
                .with_raw_body(err.raw())
                .with_cause(err.to_string()),
            ),
        }
    }

    /// `base_url?q=&appid=&units=&lang=`, keeping any query the base already has.
    fn request_url(&self, city: &str, units: Units, language: &str) -> Result<Url, Failure> {
        let mut url = parse_http_url(&self.settings.base_url).map_err(|e| {
            Failure::new(
                FailureKind::MalformedInput,
                "configured weather API base URL is invalid",
            )
            .with_cause(e.to_string())
        })?;
        url.query_pairs_mut()
            .append_pair("q", city)
            .append_pair("appid", self.settings.api_key.trim())
            .append_pair("units", units.as_str())
            .append_pair("lang", language);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(settings: OpenWeatherMapSettings) -> WeatherFetcher {
        WeatherFetcher::new(HttpClient::new().unwrap(), &settings)
    }

    #[test]
    fn request_url_carries_all_parameters() {
        let f = fetcher(OpenWeatherMapSettings {
            api_key: "k".into(),
            base_url: "https://api.example.com/data/2.5/weather".into(),
            ..Default::default()
        });
        let url = f.request_url("São Paulo", Units::Imperial, "pt").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("q".into(), "São Paulo".into()),
                ("appid".into(), "k".into()),
                ("units".into(), "imperial".into()),
                ("lang".into(), "pt".into()),
            ]
        );
        assert_eq!(url.path(), "/data/2.5/weather");
    }

    #[test]
    fn bad_base_url_is_malformed_input() {
        let f = fetcher(OpenWeatherMapSettings {
            api_key: "k".into(),
            base_url: "not a url".into(),
            ..Default::default()
        });
        let err = f.request_url("x", Units::Metric, "en").unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedInput);
    }

    #[test]
    fn language_and_units_fall_back_to_configuration() {
        let f = fetcher(OpenWeatherMapSettings {
            default_units: "imperial".into(),
            default_language: "RU".into(),
            ..Default::default()
        });
        assert_eq!(f.resolve_language("  "), "ru");
        assert_eq!(f.resolve_language(" DE "), "de");
        assert_eq!(f.resolve_units("bogus"), Units::Imperial);
        assert_eq!(f.resolve_units("Standard"), Units::Standard);
    }
}
