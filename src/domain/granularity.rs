// Grouping granularities for intensity aggregates
use super::error::IntensityError;
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

/// A time dimension extracted from the observation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Month,
    /// 1 = Sunday .. 7 = Saturday
    DayOfWeek,
    Hour,
}

impl GroupKey {
    pub fn column_name(&self) -> &'static str {
        match self {
            GroupKey::Month => "month",
            GroupKey::DayOfWeek => "dayofweek",
            GroupKey::Hour => "hour",
        }
    }

    pub fn extract(&self, datetime: &NaiveDateTime) -> u32 {
        match self {
            GroupKey::Month => datetime.month(),
            GroupKey::DayOfWeek => datetime.weekday().number_from_sunday(),
            GroupKey::Hour => datetime.hour(),
        }
    }

    pub fn accepts(&self, value: u32) -> bool {
        match self {
            GroupKey::Month => (1..=12).contains(&value),
            GroupKey::DayOfWeek => (1..=7).contains(&value),
            GroupKey::Hour => value < 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hourly,
    MonthlyHourly,
    MonthlyWeekdayHourly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [
        Granularity::Hourly,
        Granularity::MonthlyHourly,
        Granularity::MonthlyWeekdayHourly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hourly => "HOURLY",
            Granularity::MonthlyHourly => "MONTHLY_HOURLY",
            Granularity::MonthlyWeekdayHourly => "MONTHLY_WEEKDAY_HOURLY",
        }
    }

    /// Route segment used by the HTTP layer
    pub fn route_name(&self) -> &'static str {
        match self {
            Granularity::Hourly => "by_hour",
            Granularity::MonthlyHourly => "by_month",
            Granularity::MonthlyWeekdayHourly => "by_month_and_weekday",
        }
    }

    /// Grouping keys, outermost first. Results are ordered ascending on the same keys.
    pub fn group_keys(&self) -> &'static [GroupKey] {
        match self {
            Granularity::Hourly => &[GroupKey::Hour],
            Granularity::MonthlyHourly => &[GroupKey::Month, GroupKey::Hour],
            Granularity::MonthlyWeekdayHourly => {
                &[GroupKey::Month, GroupKey::DayOfWeek, GroupKey::Hour]
            }
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = IntensityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s) || g.route_name() == s)
            .ok_or_else(|| IntensityError::UnsupportedGranularity(s.to_string()))
    }
}
