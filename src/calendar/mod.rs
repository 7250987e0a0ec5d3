//! Holiday-aware work-day arithmetic.
//!
//! Holiday years are loaded lazily per calendar variant and kept for the life of the
//! process; span calculations themselves are pure functions over a [`HolidayMap`].

pub mod cache;
pub mod source;
pub mod workday;

pub use cache::HolidayCache;
pub use source::{
    ConfiguredHolidaySource, HolidayCnSource, HolidayEntry, HolidaySource, StaticHolidays,
};
pub use workday::{WorkDayCalendar, WorkInfo};

use chrono::{Datelike, FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Which public-holiday table applies on top of weekends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalendarVariant {
    #[default]
    Regular,
    Cn,
    Vn,
}

impl fmt::Display for CalendarVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalendarVariant::Regular => "regular",
            CalendarVariant::Cn => "cn",
            CalendarVariant::Vn => "vn",
        };
        f.write_str(name)
    }
}

impl FromStr for CalendarVariant {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(CalendarVariant::Regular),
            "cn" | "china" => Ok(CalendarVariant::Cn),
            "vn" | "vietnam" => Ok(CalendarVariant::Vn),
            other => Err(format!("unknown calendar variant '{other}'")),
        }
    }
}

/// Date → "is a non-work day" overrides for one or more loaded years.
#[derive(Debug, Clone, Default)]
pub struct HolidayMap {
    days: HashMap<NaiveDate, bool>,
}

impl HolidayMap {
    pub fn new(days: HashMap<NaiveDate, bool>) -> Self {
        Self { days }
    }

    pub fn extend(&mut self, year: &HashMap<NaiveDate, bool>) {
        self.days.extend(year.iter().map(|(date, off)| (*date, *off)));
    }

    /// Loaded entries win; everything else falls back to the weekend rule.
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.days
            .get(&date)
            .copied()
            .unwrap_or_else(|| is_weekend(date))
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Parses `UTC`, `Z`, `+08:00`, `+0800` or `-05:30` into a fixed offset.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekend_fallback_and_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(date(2024, 10, 1), true);
        overrides.insert(date(2024, 10, 12), false);
        let map = HolidayMap::new(overrides);

        assert!(map.is_holiday(date(2024, 10, 1)));
        assert!(!map.is_holiday(date(2024, 10, 12)));
        assert!(map.is_holiday(date(2024, 10, 13)));
        assert!(!map.is_holiday(date(2024, 10, 14)));
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset("+08:00").unwrap().local_minus_utc(), 8 * 3600);
        assert_eq!(parse_offset("-0530").unwrap().local_minus_utc(), -(5 * 3600 + 1800));
        assert!(parse_offset("Asia/Shanghai").is_none());
        assert!(parse_offset("+25:00").is_none());
    }

    #[test]
    fn variant_round_trips_through_text() {
        for variant in [CalendarVariant::Regular, CalendarVariant::Cn, CalendarVariant::Vn] {
            assert_eq!(variant.to_string().parse::<CalendarVariant>().unwrap(), variant);
        }
        assert!("mars".parse::<CalendarVariant>().is_err());
    }
}
