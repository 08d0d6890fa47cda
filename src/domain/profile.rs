// Intensity profiles - nested aggregate results returned to callers
use super::error::IntensityError;
use super::granularity::{Granularity, GroupKey};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

/// One flat row of a grouped aggregate, as returned by the datastore.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateRow {
    pub month: Option<u32>,
    pub dayofweek: Option<u32>,
    pub hour: Option<u32>,
    /// Null when every row in the bucket had zero total generation
    pub carbon_intensity: Option<f64>,
}

impl AggregateRow {
    pub fn key(&self, key: GroupKey) -> Option<u32> {
        match key {
            GroupKey::Month => self.month,
            GroupKey::DayOfWeek => self.dayofweek,
            GroupKey::Hour => self.hour,
        }
    }

    pub fn set_key(&mut self, key: GroupKey, value: u32) {
        match key {
            GroupKey::Month => self.month = Some(value),
            GroupKey::DayOfWeek => self.dayofweek = Some(value),
            GroupKey::Hour => self.hour = Some(value),
        }
    }

    fn require(&self, key: GroupKey) -> Result<u32, IntensityError> {
        match self.key(key) {
            Some(value) if key.accepts(value) => Ok(value),
            Some(value) => Err(IntensityError::DataSource(anyhow::anyhow!(
                "{} value {} out of range",
                key.column_name(),
                value
            ))),
            None => Err(IntensityError::DataSource(anyhow::anyhow!(
                "aggregate row is missing `{}`",
                key.column_name()
            ))),
        }
    }

    fn describe(&self) -> String {
        [GroupKey::Month, GroupKey::DayOfWeek, GroupKey::Hour]
            .into_iter()
            .filter_map(|k| self.key(k).map(|v| format!("{}={}", k.column_name(), v)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyIntensity {
    pub hour: u32,
    pub carbon_intensity: f64,
}

pub type MonthlyProfile = IndexMap<u32, Vec<HourlyIntensity>>;
pub type MonthlyWeekdayProfile = IndexMap<u32, IndexMap<u32, Vec<HourlyIntensity>>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IntensityProfile {
    #[serde(rename = "carbon_intensity_by_hour")]
    ByHour(Vec<HourlyIntensity>),
    #[serde(rename = "carbon_intensity_by_month")]
    ByMonth(MonthlyProfile),
    #[serde(rename = "carbon_intensity_by_month_and_weekday")]
    ByMonthAndWeekday(MonthlyWeekdayProfile),
}

/// Profile plus whether it was served from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntensityResponse {
    #[serde(flatten)]
    pub profile: IntensityProfile,
    #[serde(rename = "fromCache")]
    pub from_cache: bool,
}

/// Nest flat rows by the granularity's keys.
///
/// Rows are taken in the order given. Map keys keep first-seen order, so the
/// datastore's ordering carries through unchanged. Buckets with a null mean
/// are left out; a result with no non-null bucket at all is a division edge case.
pub fn reshape(
    rows: Vec<AggregateRow>,
    granularity: Granularity,
) -> Result<IntensityProfile, IntensityError> {
    let mut by_hour = Vec::new();
    let mut by_month = MonthlyProfile::new();
    let mut by_month_and_weekday = MonthlyWeekdayProfile::new();
    let mut kept = 0usize;
    let mut skipped = Vec::new();

    for row in rows {
        let hour = row.require(GroupKey::Hour)?;
        let month = match granularity {
            Granularity::Hourly => None,
            _ => Some(row.require(GroupKey::Month)?),
        };
        let dayofweek = match granularity {
            Granularity::MonthlyWeekdayHourly => Some(row.require(GroupKey::DayOfWeek)?),
            _ => None,
        };

        let Some(carbon_intensity) = row.carbon_intensity else {
            warn!(
                "Omitting {} bucket {}: no rows with non-zero total generation",
                granularity,
                row.describe()
            );
            skipped.push(row.describe());
            continue;
        };
        kept += 1;
        let entry = HourlyIntensity {
            hour,
            carbon_intensity,
        };

        match (month, dayofweek) {
            (Some(month), Some(dayofweek)) => by_month_and_weekday
                .entry(month)
                .or_default()
                .entry(dayofweek)
                .or_default()
                .push(entry),
            (Some(month), None) => by_month.entry(month).or_default().push(entry),
            _ => by_hour.push(entry),
        }
    }

    if kept == 0 && !skipped.is_empty() {
        return Err(IntensityError::DivisionEdgeCase(format!(
            "every bucket lacks rows with non-zero total generation ({})",
            skipped.join("; ")
        )));
    }

    Ok(match granularity {
        Granularity::Hourly => IntensityProfile::ByHour(by_hour),
        Granularity::MonthlyHourly => IntensityProfile::ByMonth(by_month),
        Granularity::MonthlyWeekdayHourly => IntensityProfile::ByMonthAndWeekday(by_month_and_weekday),
    })
}
