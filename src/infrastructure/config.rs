use crate::application::aggregate_cache::CachePolicy;
use crate::domain::utility::Utility;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub datastore: DatastoreSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Influx,
    Csv,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatastoreSettings {
    pub backend: Backend,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub database: String,
    #[serde(default = "default_table_template")]
    pub table_template: String,
    #[serde(default = "default_dataset_dir")]
    pub dataset_dir: PathBuf,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl DatastoreSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheSettings {
    pub ttl_secs: Option<u64>,
    pub max_entries: Option<usize>,
}

impl CacheSettings {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: self.ttl_secs.map(Duration::from_secs),
            max_entries: self.max_entries,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_table_template() -> String {
    "${utility}_historical_data_by_generation_type".to_string()
}

fn default_dataset_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_query_timeout_secs() -> u64 {
    30
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/grid_carbon"))
        .add_source(config::Environment::with_prefix("GRID_CARBON").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace template variables in a string
pub fn expand_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

/// Datastore table holding a utility's generation mix history
pub fn table_name(template: &str, utility: Utility) -> anyhow::Result<String> {
    let mut vars = HashMap::new();
    vars.insert("utility".to_string(), utility.to_string());
    let table = expand_template(template, &vars);

    if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        anyhow::bail!("invalid table name `{}` from template `{}`", table, template);
    }
    Ok(table)
}
