use super::{CalendarVariant, HolidayCache, HolidayMap};
use crate::errors::FetchError;
use crate::model::{Millis, DAY_MS};
use crate::rounding::ratio;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::Serialize;
use std::sync::Arc;

/// Result of a calendar query over `[start, end)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkInfo {
    /// Calendar days touched by the range
    pub days: i64,
    /// Non-work days counted against the work time
    pub holidays: i64,
    pub work_time_ms: i64,
}

impl WorkInfo {
    /// Work time expressed in whole days, half-up. Less than half a work day counts as zero.
    pub fn whole_days(&self) -> i64 {
        ratio(self.work_time_ms, DAY_MS, 0) as i64
    }

    /// Work time expressed in days with two decimals, half-up.
    pub fn days_two_decimals(&self) -> f64 {
        ratio(self.work_time_ms, DAY_MS, 2)
    }
}

fn local_date(instant: Millis, tz: FixedOffset) -> NaiveDate {
    DateTime::from_timestamp_millis(instant)
        .unwrap_or_default()
        .with_timezone(&tz)
        .date_naive()
}

/// Epoch millis of local midnight starting `date`.
fn day_start(date: NaiveDate, tz: FixedOffset) -> Millis {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
        - i64::from(tz.local_minus_utc()) * 1000
}

/// Local dates touched by `[start, end)`; a range ending at midnight stops the day before.
fn local_dates(start: Millis, end: Millis, tz: FixedOffset) -> Vec<NaiveDate> {
    let first = local_date(start, tz);
    let last = local_date((end - 1).max(start), tz);
    first.iter_days().take_while(|date| *date <= last).collect()
}

/// Shrinks the range to its first and last work day, then charges every remaining
/// non-work day as a full day off.
pub fn trimmed_work_info(
    holidays: &HolidayMap,
    start: Millis,
    end: Millis,
    tz: FixedOffset,
) -> WorkInfo {
    if end <= start {
        return WorkInfo::default();
    }

    let dates = local_dates(start, end, tz);
    let days = dates.len() as i64;
    let off: Vec<bool> = dates.iter().map(|d| holidays.is_holiday(*d)).collect();
    let total_holidays = off.iter().filter(|o| **o).count() as i64;

    let (Some(first), Some(last)) = (off.iter().position(|o| !o), off.iter().rposition(|o| !o))
    else {
        return WorkInfo {
            days,
            holidays: total_holidays,
            work_time_ms: 0,
        };
    };

    let from = if first == 0 { start } else { day_start(dates[first], tz) };
    let to = if last == dates.len() - 1 {
        end
    } else {
        day_start(dates[last], tz) + DAY_MS
    };
    let interior = off[first..=last].iter().filter(|o| **o).count() as i64;

    WorkInfo {
        days,
        holidays: total_holidays,
        work_time_ms: (to - from - interior * DAY_MS).max(0),
    }
}

/// Keeps the range as given: the first and last calendar day are always chargeable,
/// only non-work days strictly inside the range are subtracted.
pub fn boundary_inclusive_work_info(
    holidays: &HolidayMap,
    start: Millis,
    end: Millis,
    tz: FixedOffset,
) -> WorkInfo {
    if end <= start {
        return WorkInfo::default();
    }

    let dates = local_dates(start, end, tz);
    let interior = if dates.len() > 2 {
        dates[1..dates.len() - 1]
            .iter()
            .filter(|d| holidays.is_holiday(**d))
            .count() as i64
    } else {
        0
    };

    WorkInfo {
        days: dates.len() as i64,
        holidays: interior,
        work_time_ms: (end - start - interior * DAY_MS).max(0),
    }
}

/// Work-day arithmetic backed by the shared holiday cache
#[derive(Clone)]
pub struct WorkDayCalendar {
    cache: Arc<HolidayCache>,
}

impl WorkDayCalendar {
    pub fn new(cache: Arc<HolidayCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &HolidayCache {
        &self.cache
    }

    pub async fn is_holiday(
        &self,
        date: NaiveDate,
        variant: CalendarVariant,
    ) -> Result<bool, FetchError> {
        let map = self.cache.holidays_between(variant, date, date).await?;
        Ok(map.is_holiday(date))
    }

    async fn holidays_for(
        &self,
        start: Millis,
        end: Millis,
        tz: FixedOffset,
        variant: CalendarVariant,
    ) -> Result<HolidayMap, FetchError> {
        if end <= start {
            return Ok(HolidayMap::default());
        }
        self.cache
            .holidays_between(variant, local_date(start, tz), local_date(end, tz))
            .await
    }

    /// Trimmed work info for `[start, end)`.
    pub async fn work_info_between(
        &self,
        start: Millis,
        end: Millis,
        tz: FixedOffset,
        variant: CalendarVariant,
    ) -> Result<WorkInfo, FetchError> {
        let holidays = self.holidays_for(start, end, tz, variant).await?;
        Ok(trimmed_work_info(&holidays, start, end, tz))
    }

    /// Whole business days between `start` and `end`.
    pub async fn business_days_between(
        &self,
        start: Millis,
        end: Millis,
        tz: FixedOffset,
        variant: CalendarVariant,
    ) -> Result<i64, FetchError> {
        Ok(self
            .work_info_between(start, end, tz, variant)
            .await?
            .whole_days())
    }

    pub async fn work_time_and_holiday_between(
        &self,
        start: Millis,
        end: Millis,
        tz: FixedOffset,
        variant: CalendarVariant,
    ) -> Result<WorkInfo, FetchError> {
        let holidays = self.holidays_for(start, end, tz, variant).await?;
        Ok(boundary_inclusive_work_info(&holidays, start, end, tz))
    }

    pub async fn business_days_to_two_decimal_scale(
        &self,
        start: Millis,
        end: Millis,
        tz: FixedOffset,
        variant: CalendarVariant,
    ) -> Result<f64, FetchError> {
        Ok(self
            .work_info_between(start, end, tz, variant)
            .await?
            .days_two_decimals())
    }
}
