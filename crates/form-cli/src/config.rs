use std::env;

use clap::ValueEnum;

pub const LOG_ENV: &str = "FORMKIT_LOG";
pub const FORMAT_ENV: &str = "FORMKIT_FORMAT";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings read from the environment; command line flags take precedence.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub log_filter: String,
    pub format: OutputFormat,
}

impl CliConfig {
    pub fn from_env() -> Self {
        let log_filter = env::var(LOG_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let format = env::var(FORMAT_ENV)
            .ok()
            .and_then(|value| OutputFormat::from_str(value.trim(), true).ok())
            .unwrap_or_default();

        Self { log_filter, format }
    }

    pub fn with_overrides(mut self, log: Option<String>, format: Option<OutputFormat>) -> Self {
        if let Some(log) = log {
            self.log_filter = log;
        }
        if let Some(format) = format {
            self.format = format;
        }
        self
    }
}
