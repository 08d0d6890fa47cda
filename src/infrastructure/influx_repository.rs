// InfluxDB 3 SQL repository implementation
use crate::application::generation_repository::GenerationMixRepository;
use crate::application::query_planner::AggregateRequest;
use crate::domain::profile::AggregateRow;
use crate::infrastructure::config::table_name;
use crate::infrastructure::sql_renderer::render_aggregate;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    table_template: String,
}

#[derive(Debug, Deserialize)]
struct InfluxErrorBody {
    error: String,
}

impl InfluxRepository {
    pub fn new(host: String, token: String, database: String, table_template: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            table_template,
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        let encoded_query = urlencoding::encode(query);
        format!(
            "{}/api/v3/query_sql?db={}&format=json&q={}",
            self.host,
            urlencoding::encode(&self.database),
            encoded_query
        )
    }

    async fn execute_query(&self, query: &str) -> Result<Vec<Map<String, Value>>> {
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<InfluxErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, message);
        }

        response
            .json::<Vec<Map<String, Value>>>()
            .await
            .context("Failed to parse InfluxDB response")
    }

    /// Map one JSON result row onto the request's grouping keys
    fn parse_row(object: &Map<String, Value>, request: &AggregateRequest) -> Result<AggregateRow> {
        let mut row = AggregateRow::default();

        for key in &request.group_by {
            let name = key.column_name();
            let value = object
                .get(name)
                .and_then(as_key_value)
                .with_context(|| format!("column `{}` missing or not a whole number in {:?}", name, object))?;
            row.set_key(*key, value);
        }

        row.carbon_intensity = match object.get("carbon_intensity") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_f64()
                    .with_context(|| format!("carbon_intensity is not a number: {}", value))?,
            ),
        };

        Ok(row)
    }
}

/// EXTRACT may come back as an integer or a float depending on the engine version
fn as_key_value(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).ok();
    }
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
        .map(|f| f as u32)
}

#[async_trait]
impl GenerationMixRepository for InfluxRepository {
    async fn query_aggregate(&self, request: &AggregateRequest) -> Result<Vec<AggregateRow>> {
        let table = table_name(&self.table_template, request.utility)?;
        let query = render_aggregate(request, &table);

        tracing::debug!("Executing aggregate query: {}", query);
        let objects = self.execute_query(&query).await?;
        tracing::debug!(
            "Got {} rows from InfluxDB for {} {}",
            objects.len(),
            request.utility,
            request.granularity
        );

        objects
            .iter()
            .map(|object| Self::parse_row(object, request))
            .collect()
    }
}
