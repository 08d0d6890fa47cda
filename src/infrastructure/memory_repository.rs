// In-process repository over locally loaded generation mix datasets
use crate::application::generation_repository::GenerationMixRepository;
use crate::application::query_planner::AggregateRequest;
use crate::domain::generation::GenerationMixRow;
use crate::domain::profile::AggregateRow;
use crate::domain::utility::Utility;
use crate::infrastructure::csv_dataset::{dataset_path, load_dataset};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    datasets: HashMap<Utility, Vec<GenerationMixRow>>,
}

impl MemoryRepository {
    pub fn new(datasets: HashMap<Utility, Vec<GenerationMixRow>>) -> Self {
        Self { datasets }
    }

    /// Load `<dir>/<utility>.csv` for every utility that has one
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut datasets = HashMap::new();
        for utility in Utility::ALL {
            if !dataset_path(dir, utility).exists() {
                tracing::warn!("No dataset for {} in {}", utility, dir.display());
                continue;
            }
            let rows = load_dataset(dir, utility)?;
            tracing::info!("Loaded {} rows for {}", rows.len(), utility);
            datasets.insert(utility, rows);
        }
        Ok(Self::new(datasets))
    }
}

/// Grouped mean of the intensity expression, skipping zero-total rows.
///
/// Buckets where every row was skipped come back with a null intensity, as
/// `AVG` over only nulls would.
pub fn aggregate_rows(rows: &[GenerationMixRow], request: &AggregateRequest) -> Vec<AggregateRow> {
    let mut buckets: BTreeMap<Vec<u32>, (f64, usize)> = BTreeMap::new();
    let mut skipped = 0;

    for row in rows {
        let key: Vec<u32> = request
            .group_by
            .iter()
            .map(|k| k.extract(&row.datetime))
            .collect();
        let bucket = buckets.entry(key).or_insert((0.0, 0));

        match request.intensity.evaluate(row) {
            Ok(intensity) => {
                bucket.0 += intensity;
                bucket.1 += 1;
            }
            Err(e) => {
                tracing::debug!("Excluding row: {}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(
            "Excluded {} {} rows with zero total generation",
            skipped,
            request.utility
        );
    }

    let mut aggregated: Vec<AggregateRow> = buckets
        .into_iter()
        .map(|(key, (sum, count))| {
            let mut row = AggregateRow {
                carbon_intensity: (count > 0).then(|| sum / count as f64),
                ..Default::default()
            };
            for (group_key, value) in request.group_by.iter().zip(key) {
                row.set_key(*group_key, value);
            }
            row
        })
        .collect();

    aggregated.sort_by_key(|row| {
        request
            .order_by
            .iter()
            .map(|k| row.key(*k))
            .collect::<Vec<_>>()
    });
    aggregated
}

#[async_trait]
impl GenerationMixRepository for MemoryRepository {
    async fn query_aggregate(&self, request: &AggregateRequest) -> Result<Vec<AggregateRow>> {
        let rows = self
            .datasets
            .get(&request.utility)
            .with_context(|| format!("no dataset loaded for {}", request.utility))?;
        Ok(aggregate_rows(rows, request))
    }
}
