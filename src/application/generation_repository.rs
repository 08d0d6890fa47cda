// Repository trait for generation mix data access
use crate::application::query_planner::AggregateRequest;
use crate::domain::profile::AggregateRow;
use async_trait::async_trait;

#[async_trait]
pub trait GenerationMixRepository: Send + Sync {
    /// Mean of the request's intensity expression over each bucket of the
    /// utility's full history, one row per bucket, in the request's order.
    async fn query_aggregate(&self, request: &AggregateRequest) -> anyhow::Result<Vec<AggregateRow>>;
}
