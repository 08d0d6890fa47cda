// Aggregation query planner - Builds declarative aggregate requests
use crate::domain::emissions::FactorRegistry;
use crate::domain::error::IntensityError;
use crate::domain::granularity::{Granularity, GroupKey};
use crate::domain::intensity::{build_intensity_expression, IntensityExpression};
use crate::domain::utility::Utility;
use std::sync::Arc;

/// Grouped mean of the intensity expression over a utility's whole history.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRequest {
    pub utility: Utility,
    pub granularity: Granularity,
    pub group_by: Vec<GroupKey>,
    pub intensity: IntensityExpression,
    /// All keys ascending
    pub order_by: Vec<GroupKey>,
}

#[derive(Debug, Clone)]
pub struct QueryPlanner {
    registry: Arc<FactorRegistry>,
}

impl QueryPlanner {
    pub fn new(registry: Arc<FactorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    pub fn plan(&self, utility: Utility, granularity: Granularity) -> Result<AggregateRequest, IntensityError> {
        let factors = self.registry.get(utility)?;
        let intensity = build_intensity_expression(factors);
        intensity.validate()?;

        let keys = granularity.group_keys().to_vec();
        Ok(AggregateRequest {
            utility,
            granularity,
            group_by: keys.clone(),
            intensity,
            order_by: keys,
        })
    }
}
