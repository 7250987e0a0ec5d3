use super::CalendarVariant;
use crate::errors::FetchError;
use crate::http::RateLimitedHttpClient;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Supplies the holiday overrides of one calendar year
#[async_trait]
pub trait HolidaySource: Send + Sync {
    async fn load_year(
        &self,
        variant: CalendarVariant,
        year: i32,
    ) -> Result<HashMap<NaiveDate, bool>, FetchError>;
}

/// One configured holiday; `off_day = false` marks a make-up work day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntry {
    pub date: NaiveDate,
    #[serde(default = "default_off_day", alias = "isOffDay")]
    pub off_day: bool,
}

fn default_off_day() -> bool {
    true
}

/// Holidays listed in configuration, keyed by variant
#[derive(Debug, Clone, Default)]
pub struct StaticHolidays {
    tables: HashMap<CalendarVariant, Vec<HolidayEntry>>,
}

impl StaticHolidays {
    pub fn new(tables: HashMap<CalendarVariant, Vec<HolidayEntry>>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl HolidaySource for StaticHolidays {
    async fn load_year(
        &self,
        variant: CalendarVariant,
        year: i32,
    ) -> Result<HashMap<NaiveDate, bool>, FetchError> {
        Ok(self
            .tables
            .get(&variant)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.date.year() == year)
                    .map(|entry| (entry.date, entry.off_day))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct HolidayYearFile {
    #[serde(default)]
    days: Vec<HolidayEntry>,
}

/// Year files in the holiday-cn layout: `{base_url}/{year}.json`
#[derive(Debug, Clone)]
pub struct HolidayCnSource {
    http: RateLimitedHttpClient,
    base_url: String,
}

impl HolidayCnSource {
    pub fn new(http: RateLimitedHttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl HolidaySource for HolidayCnSource {
    async fn load_year(
        &self,
        variant: CalendarVariant,
        year: i32,
    ) -> Result<HashMap<NaiveDate, bool>, FetchError> {
        let url = format!("{}/{year}.json", self.base_url);
        debug!(%variant, year, url = %url, "Loading holiday year");

        let response = self.http.get("holidays", &url, &[], None).await?;
        let file: HolidayYearFile =
            serde_json::from_str(&response.body).map_err(|e| FetchError::Decode {
                provider: "holidays",
                message: e.to_string(),
            })?;

        info!(%variant, year, entries = file.days.len(), "Holiday year loaded");
        Ok(file
            .days
            .into_iter()
            .map(|entry| (entry.date, entry.off_day))
            .collect())
    }
}

/// Routes each variant to where its holidays come from
pub struct ConfiguredHolidaySource {
    cn: Option<Arc<dyn HolidaySource>>,
    fallback: StaticHolidays,
}

impl ConfiguredHolidaySource {
    pub fn new(cn: Option<Arc<dyn HolidaySource>>, fallback: StaticHolidays) -> Self {
        Self { cn, fallback }
    }
}

#[async_trait]
impl HolidaySource for ConfiguredHolidaySource {
    async fn load_year(
        &self,
        variant: CalendarVariant,
        year: i32,
    ) -> Result<HashMap<NaiveDate, bool>, FetchError> {
        match (variant, &self.cn) {
            (CalendarVariant::Regular, _) => Ok(HashMap::new()),
            (CalendarVariant::Cn, Some(remote)) => remote.load_year(variant, year).await,
            _ => self.fallback.load_year(variant, year).await,
        }
    }
}
