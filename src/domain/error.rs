// Error taxonomy for carbon intensity aggregation
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntensityError {
    /// Unknown utility, or a factor/share constant that cannot be resolved
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported granularity `{0}`")]
    UnsupportedGranularity(String),

    /// Datastore call failed, timed out, or returned malformed rows
    #[error("data source error: {0:#}")]
    DataSource(anyhow::Error),

    /// A row or bucket whose total generation is zero
    #[error("zero total generation: {0}")]
    DivisionEdgeCase(String),
}

/// A failed aggregate request, naming what was asked for and what went wrong.
#[derive(Debug, Error)]
#[error("{granularity} carbon intensity for `{utility}` failed: {source}")]
pub struct AggregateFailure {
    pub utility: String,
    pub granularity: String,
    #[source]
    pub source: IntensityError,
}

impl AggregateFailure {
    pub fn new(utility: impl Display, granularity: impl Display, source: IntensityError) -> Self {
        Self {
            utility: utility.to_string(),
            granularity: granularity.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_names_utility_granularity_and_condition() {
        let failure = AggregateFailure::new(
            "hepco",
            "MONTHLY_WEEKDAY_HOURLY",
            IntensityError::Configuration("unknown utility `hepco`".to_string()),
        );

        assert_eq!(
            failure.to_string(),
            "MONTHLY_WEEKDAY_HOURLY carbon intensity for `hepco` failed: configuration error: unknown utility `hepco`"
        );
    }

    #[test]
    fn test_data_source_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("Failed to send request to InfluxDB");
        let err = IntensityError::DataSource(err);

        assert_eq!(
            err.to_string(),
            "data source error: Failed to send request to InfluxDB: connection refused"
        );
    }
}
