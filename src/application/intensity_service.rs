// Carbon intensity service - Cached intensity aggregates per utility
use crate::application::aggregate_cache::AggregateCache;
use crate::application::generation_repository::GenerationMixRepository;
use crate::application::query_planner::QueryPlanner;
use crate::domain::emissions::{EmissionsFactorTable, FactorRegistry};
use crate::domain::error::{AggregateFailure, IntensityError};
use crate::domain::granularity::Granularity;
use crate::domain::profile::{reshape, IntensityProfile, IntensityResponse};
use crate::domain::utility::Utility;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub utility: Utility,
    pub granularity: Granularity,
}

pub type IntensityCache = AggregateCache<AggregateKey, IntensityProfile>;

#[derive(Clone)]
pub struct CarbonIntensityService {
    repository: Arc<dyn GenerationMixRepository>,
    planner: QueryPlanner,
    cache: Arc<IntensityCache>,
    query_timeout: Duration,
}

impl CarbonIntensityService {
    pub fn new(
        repository: Arc<dyn GenerationMixRepository>,
        registry: Arc<FactorRegistry>,
        cache: Arc<IntensityCache>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            planner: QueryPlanner::new(registry),
            cache,
            query_timeout,
        }
    }

    /// Intensity profile for a utility and granularity given by name.
    pub async fn daily_intensity(
        &self,
        utility: &str,
        granularity: &str,
    ) -> Result<IntensityResponse, AggregateFailure> {
        let granularity_id: Granularity = granularity
            .parse()
            .map_err(|e| AggregateFailure::new(utility, granularity, e))?;
        self.intensity(utility, granularity_id).await
    }

    pub async fn intensity(
        &self,
        utility: &str,
        granularity: Granularity,
    ) -> Result<IntensityResponse, AggregateFailure> {
        let utility_id: Utility = utility
            .parse()
            .map_err(|e| AggregateFailure::new(utility, granularity, e))?;
        self.aggregate(utility_id, granularity).await
    }

    pub async fn aggregate(
        &self,
        utility: Utility,
        granularity: Granularity,
    ) -> Result<IntensityResponse, AggregateFailure> {
        let key = AggregateKey {
            utility,
            granularity,
        };

        let cached = self
            .cache
            .get_or_compute(key, || self.compute(utility, granularity))
            .await
            .map_err(|e| AggregateFailure::new(utility, granularity, e))?;

        Ok(IntensityResponse {
            profile: cached.value,
            from_cache: cached.from_cache,
        })
    }

    pub fn factors(&self, utility: &str) -> Result<&EmissionsFactorTable, IntensityError> {
        self.planner.registry().get(utility.parse()?)
    }

    async fn compute(
        &self,
        utility: Utility,
        granularity: Granularity,
    ) -> Result<IntensityProfile, IntensityError> {
        let request = self.planner.plan(utility, granularity)?;

        tracing::debug!("Querying {} intensity aggregate for {}", granularity, utility);
        let rows = tokio::time::timeout(self.query_timeout, self.repository.query_aggregate(&request))
            .await
            .map_err(|_| {
                IntensityError::DataSource(anyhow::anyhow!(
                    "query timed out after {:?}",
                    self.query_timeout
                ))
            })?
            .map_err(IntensityError::DataSource)?;
        tracing::debug!("Got {} aggregate rows for {} {}", rows.len(), utility, granularity);

        reshape(rows, granularity)
    }
}
