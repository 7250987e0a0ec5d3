use crate::calendar::{CalendarVariant, HolidayEntry};
use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main configuration structure for dora-metrics
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DoraMetricsConfig {
    /// CI runner the pipelines live on
    pub buildkite: BuildkiteConfig,
    /// Source host used to correlate deploys with pull requests
    pub github: GitHubConfig,
    pub workers: WorkerConfig,
    /// Shared budget for every upstream call
    pub rate_limit: RateLimitConfig,
    pub calendar: CalendarConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildkiteConfig {
    /// API token (can be set via env var)
    pub token: Option<String>,
    pub base_url: String,
    /// Builds requested per page
    pub page_size: u32,
}

impl Default for BuildkiteConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: "https://api.buildkite.com".to_string(),
            page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token (can be set via env var)
    pub token: Option<String>,
    /// GitHub Enterprise API root; public GitHub when unset
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Upstream calls allowed in flight at once
    pub pool_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { pool_size: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    /// Burst capacity
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Where `{year}.json` files for the `cn` calendar are served from; the static
    /// table is used when unset
    pub holiday_base_url: Option<String>,
    /// Holidays and make-up work days per calendar variant
    pub static_holidays: HashMap<CalendarVariant, Vec<HolidayEntry>>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            holiday_base_url: Some(
                "https://raw.githubusercontent.com/NateScarlet/holiday-cn/master".to_string(),
            ),
            static_holidays: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl DoraMetricsConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`dora-metrics.toml`, or `path` when given)
    /// 3. Environment variables (prefixed with DORA_METRICS_, nested with `__`)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None if Path::new("dora-metrics.toml").exists() => {
                builder = builder.add_source(File::with_name("dora-metrics"));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("DORA_METRICS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut dora_config: DoraMetricsConfig = builder.build()?.try_deserialize()?;

        // Tokens are commonly exported under their tool's conventional name
        if dora_config.buildkite.token.is_none() {
            dora_config.buildkite.token = std::env::var("BUILDKITE_TOKEN").ok();
        }
        if dora_config.github.token.is_none() {
            dora_config.github.token = std::env::var("GITHUB_TOKEN").ok();
        }

        Ok(dora_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}
