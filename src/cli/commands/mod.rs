use anyhow::{Context, Result};
use dora_metrics::calendar::{ConfiguredHolidaySource, HolidayCnSource, HolidaySource, StaticHolidays};
use dora_metrics::{
    BuildkiteClient, DoraMetricsConfig, GitHubSourceHost, HolidayCache, RateLimitedHttpClient,
    SourceHost, WorkDayCalendar,
};
use std::sync::Arc;

pub mod report;
pub mod steps;
pub mod work_days;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self, config: &DoraMetricsConfig) -> Result<()>;
}

/// Clients shared by every command, all drawing on one rate limit
pub struct Services {
    pub http: RateLimitedHttpClient,
    pub calendar: WorkDayCalendar,
}

impl Services {
    pub fn new(config: &DoraMetricsConfig) -> Result<Self> {
        let http = RateLimitedHttpClient::new(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        )?;

        let remote_cn = config.calendar.holiday_base_url.as_ref().map(|base_url| {
            Arc::new(HolidayCnSource::new(http.clone(), base_url.clone())) as Arc<dyn HolidaySource>
        });
        let source = ConfiguredHolidaySource::new(
            remote_cn,
            StaticHolidays::new(config.calendar.static_holidays.clone()),
        );
        let calendar = WorkDayCalendar::new(Arc::new(HolidayCache::new(Arc::new(source))));

        Ok(Self { http, calendar })
    }

    pub fn buildkite(&self, config: &DoraMetricsConfig) -> Result<BuildkiteClient> {
        let token = config
            .buildkite
            .token
            .as_deref()
            .context("Buildkite token missing: set BUILDKITE_TOKEN or buildkite.token")?;
        Ok(BuildkiteClient::new(
            self.http.clone(),
            config.buildkite.base_url.clone(),
            token,
        ))
    }

    /// `None` when no GitHub token is configured.
    pub fn source_host(&self, config: &DoraMetricsConfig) -> Result<Option<Arc<dyn SourceHost>>> {
        let Some(token) = config.github.token.as_deref() else {
            return Ok(None);
        };
        let host = GitHubSourceHost::new(token, config.github.base_url.as_deref())?
            .with_rate_limiter(self.http.rate_limiter());
        Ok(Some(Arc::new(host)))
    }
}
