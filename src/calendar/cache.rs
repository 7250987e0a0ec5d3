use super::{CalendarVariant, HolidayMap, HolidaySource};
use crate::errors::FetchError;
use crate::observability::provider_metrics;
use chrono::{Datelike, NaiveDate};
use moka::future::Cache;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

type YearKey = (CalendarVariant, i32);

/// Process-wide holiday years, loaded once per (variant, year) and never evicted.
///
/// Concurrent first requests for the same year share a single load; a failed load
/// is not remembered, so the next request tries again.
pub struct HolidayCache {
    source: Arc<dyn HolidaySource>,
    years: Cache<YearKey, Arc<HashMap<NaiveDate, bool>>>,
}

impl HolidayCache {
    pub fn new(source: Arc<dyn HolidaySource>) -> Self {
        // No capacity bound and no TTL: entries live as long as the process.
        let years = Cache::builder().build();
        Self { source, years }
    }

    pub async fn year(
        &self,
        variant: CalendarVariant,
        year: i32,
    ) -> Result<Arc<HashMap<NaiveDate, bool>>, FetchError> {
        let source = Arc::clone(&self.source);
        self.years
            .try_get_with((variant, year), async move {
                debug!(%variant, year, "Holiday year not cached, loading");
                let days = source.load_year(variant, year).await?;
                provider_metrics().record_holiday_load();
                Ok::<_, FetchError>(Arc::new(days))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Every year touched by `[from, to]`, merged into one lookup map.
    pub async fn holidays_between(
        &self,
        variant: CalendarVariant,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<HolidayMap, FetchError> {
        let mut map = HolidayMap::default();
        for year in from.year()..=to.year() {
            map.extend(&*self.year(variant, year).await?);
        }
        Ok(map)
    }

    pub fn is_loaded(&self, variant: CalendarVariant, year: i32) -> bool {
        self.years.contains_key(&(variant, year))
    }
}
