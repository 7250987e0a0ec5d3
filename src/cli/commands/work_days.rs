use super::{Command, Services};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dora_metrics::calendar::parse_offset;
use dora_metrics::{CalendarVariant, DoraMetricsConfig, WorkInfo};
use serde::Serialize;

pub struct WorkDaysCommand {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone: String,
    pub calendar: CalendarVariant,
}

#[derive(Debug, Serialize)]
struct WorkDaysOutput {
    calendar: CalendarVariant,
    timezone: String,
    business_days: i64,
    business_days_two_decimals: f64,
    work_time_and_holiday: WorkInfo,
}

impl Command for WorkDaysCommand {
    async fn execute(&self, config: &DoraMetricsConfig) -> Result<()> {
        let tz = parse_offset(&self.timezone)
            .with_context(|| format!("Unsupported timezone '{}'", self.timezone))?;
        let (start, end) = (self.start.timestamp_millis(), self.end.timestamp_millis());

        let calendar = Services::new(config)?.calendar;
        let output = WorkDaysOutput {
            calendar: self.calendar,
            timezone: self.timezone.clone(),
            business_days: calendar
                .business_days_between(start, end, tz, self.calendar)
                .await?,
            business_days_two_decimals: calendar
                .business_days_to_two_decimal_scale(start, end, tz, self.calendar)
                .await?,
            work_time_and_holiday: calendar
                .work_time_and_holiday_between(start, end, tz, self.calendar)
                .await?,
        };

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}
