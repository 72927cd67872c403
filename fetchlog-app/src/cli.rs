use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "fetchlog",
    version,
    about = "Collect weather observations and page scrapes into local stores"
)]
pub struct Cli {
    /// Settings file (YAML/TOML/JSON). Defaults to fetchlog.yaml +
    /// fetchlog.local.yaml in the working directory, both optional.
    #[arg(long, global = true, env = "FETCHLOG_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Interactive numbered menu (default).
    Menu,
    /// Fetch current weather for a city and store it.
    Weather {
        #[arg(long)]
        city: String,
        /// metric, imperial or standard; anything else uses the default.
        #[arg(long)]
        units: Option<String>,
        #[arg(long = "lang")]
        language: Option<String>,
    },
    /// Scrape one page and store the result.
    Scrape { url: String },
    /// Show stored results.
    History {
        #[command(subcommand)]
        target: HistoryTarget,
    },
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum HistoryTarget {
    /// Stored weather observations, newest first.
    Weather {
        /// Case-insensitive substring of the city name.
        #[arg(long)]
        city: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// List failed lookups instead of observations.
        #[arg(long)]
        failures: bool,
    },
    /// Latest scrape results, newest first.
    Scrape {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Menu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["fetchlog"]).unwrap();
        assert_eq!(cli.command(), Command::Menu);
        assert!(cli.config.is_none());
    }

    #[test]
    fn weather_flags() {
        let cli = Cli::try_parse_from([
            "fetchlog", "weather", "--city", "Oslo", "--units", "imperial", "--lang", "no",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            Command::Weather {
                city: "Oslo".into(),
                units: Some("imperial".into()),
                language: Some("no".into()),
            }
        );
    }

    #[test]
    fn history_defaults() {
        let cli = Cli::try_parse_from(["fetchlog", "history", "weather"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::History {
                target: HistoryTarget::Weather {
                    city: None,
                    limit: 20,
                    failures: false,
                }
            }
        );
        let cli = Cli::try_parse_from(["fetchlog", "history", "scrape"]).unwrap();
        assert_eq!(
            cli.command(),
            Command::History {
                target: HistoryTarget::Scrape { limit: 5 }
            }
        );
    }

    #[test]
    fn history_weather_failures() {
        let cli = Cli::try_parse_from([
            "fetchlog", "history", "weather", "--failures", "--limit", "3",
        ])
        .unwrap();
        assert_eq!(
            cli.command(),
            Command::History {
                target: HistoryTarget::Weather {
                    city: None,
                    limit: 3,
                    failures: true,
                }
            }
        );
    }

    #[test]
    fn config_is_global() {
        let cli = Cli::try_parse_from(["fetchlog", "scrape", "https://e.co/", "--config", "x.yaml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
        assert_eq!(
            cli.command(),
            Command::Scrape {
                url: "https://e.co/".into()
            }
        );
    }

    #[test]
    fn weather_requires_city() {
        assert!(Cli::try_parse_from(["fetchlog", "weather"]).is_err());
    }
}
