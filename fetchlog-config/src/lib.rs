//! Loader for the fetchlog settings snapshot with file + environment overlays.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults (every field has one)
//! 2. files / inline snippets, in the order they were attached
//! 3. `FETCHLOG__SECTION__KEY` environment variables
//!
//! After merging, every string value goes through `${VAR}` expansion, so a
//! file may say `api_key: "${OPENWEATHER_API_KEY}"`.
//!
//! The resulting [`Settings`] is an immutable snapshot: pipelines borrow it,
//! and changing a setting at runtime means building a new snapshot.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Files picked up by [`SettingsLoader::with_default_files`], both optional.
pub const DEFAULT_FILES: [&str; 2] = ["fetchlog.yaml", "fetchlog.local.yaml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub relational_db: RelationalDbSettings,
    pub document_db: DocumentDbSettings,
    pub open_weather_map: OpenWeatherMapSettings,
    pub scraping: ScrapingSettings,
    pub logging: LoggingSettings,
}

/// Where weather observations are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalDbSettings {
    pub database_path: String,
}

impl Default for RelationalDbSettings {
    fn default() -> Self {
        Self {
            database_path: "data/weather.db".into(),
        }
    }
}

/// Where scrape documents are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentDbSettings {
    pub database_path: String,
    pub collection_name: String,
}

impl Default for DocumentDbSettings {
    fn default() -> Self {
        Self {
            database_path: "data/scraping.db".into(),
            collection_name: "scrape_results".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenWeatherMapSettings {
    #[serde(deserialize_with = "string_or_number")]
    pub api_key: String,
    pub base_url: String,
    pub default_units: String,
    pub default_language: String,
    pub request_timeout_seconds: u64,
}

impl Default for OpenWeatherMapSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openweathermap.org/data/2.5/weather".into(),
            default_units: "metric".into(),
            default_language: "en".into(),
            request_timeout_seconds: 20,
        }
    }
}

impl OpenWeatherMapSettings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingSettings {
    /// Hard cap on links kept per page.
    pub max_links: usize,
    pub request_timeout_seconds: u64,
}

impl Default for ScrapingSettings {
    fn default() -> Self {
        Self {
            max_links: 10,
            request_timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub file_path: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file_path: "logs/app.log".into(),
        }
    }
}

impl Settings {
    /// Copy of this snapshot with storage locations replaced where a new
    /// non-blank value is given.
    ///
    /// ```
    /// use fetchlog_config::Settings;
    ///
    /// let base = Settings::default();
    /// let next = base.with_storage(Some("/tmp/w.db"), Some("  "), Some("pages"));
    /// assert_eq!(next.relational_db.database_path, "/tmp/w.db");
    /// assert_eq!(next.document_db.database_path, base.document_db.database_path);
    /// assert_eq!(next.document_db.collection_name, "pages");
    /// ```
    pub fn with_storage(
        &self,
        relational_path: Option<&str>,
        document_path: Option<&str>,
        collection: Option<&str>,
    ) -> Settings {
        let pick = |new: Option<&str>, old: &str| {
            new.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(old)
                .to_string()
        };
        let mut next = self.clone();
        next.relational_db.database_path = pick(relational_path, &self.relational_db.database_path);
        next.document_db.database_path = pick(document_path, &self.document_db.database_path);
        next.document_db.collection_name = pick(collection, &self.document_db.collection_name);
        next
    }
}

/// Resolve a possibly relative storage path against the current directory.
pub fn resolve_path(path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        return p.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(p))
        .unwrap_or_else(|_| p.to_path_buf())
}

/// Create the parent directory of `file` if it does not exist yet.
pub fn ensure_parent_dir(file: &Path) -> std::io::Result<()> {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

/// Accept `api_key: 1234` as well as `api_key: "1234"`; env parsing turns
/// digit-only values into numbers.
fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, got {other}"
        ))),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct SettingsLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: &'static str,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Start from the built-in defaults; `FETCHLOG__` env overrides are
    /// applied last by [`SettingsLoader::load`].
    ///
    /// ```
    /// use fetchlog_config::SettingsLoader;
    ///
    /// let settings = SettingsLoader::new()
    ///     .with_yaml_str("scraping:\n  max_links: 3")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(settings.scraping.max_links, 3);
    /// assert_eq!(settings.scraping.request_timeout_seconds, 20);
    /// assert_eq!(settings.open_weather_map.default_units, "metric");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: "FETCHLOG",
        }
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers
    /// format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// `fetchlog.yaml` then `fetchlog.local.yaml` from the working directory.
    pub fn with_default_files(self) -> Self {
        DEFAULT_FILES
            .iter()
            .fold(self, |loader, name| loader.with_optional_file(name))
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use fetchlog_config::SettingsLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_OWM_KEY", "injected-from-env"); }
    ///
    /// let settings = SettingsLoader::new()
    ///     .with_yaml_str(r#"
    /// open_weather_map:
    ///   api_key: "${DOCTEST_OWM_KEY}"
    ///   default_language: ru
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(settings.open_weather_map.api_key, "injected-from-env");
    /// assert_eq!(settings.open_weather_map.default_language, "ru");
    /// assert_eq!(settings.document_db.collection_name, "scrape_results");
    ///
    /// unsafe { std::env::remove_var("DOCTEST_OWM_KEY"); }
    /// ```
    pub fn load(self) -> Result<Settings, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(self.env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        // Recursively expand environment variables
        expand_env_in_value(&mut v);

        // An entirely empty source set deserializes as unit/null.
        if v.is_null() {
            v = Value::Object(Default::default());
        }

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
