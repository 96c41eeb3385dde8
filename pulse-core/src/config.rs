use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct PulseConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Where record collections come from: the live Postgres store or the
/// bundled JSON documents.
#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub source: DataSourceKind,
    pub responses_path: String,
    pub outcomes_path: String,
    pub personas_path: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    Database,
    Static,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InsightsConfig {
    /// Rating on the 1-4 scale above which a persona is taken to decide
    /// in favor of vaccination.
    pub decision_threshold: f64,
    /// Final normalized rating at or above which a persona counts as
    /// converted.
    pub conversion_threshold: f64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            decision_threshold: crate::metrics::DECISION_THRESHOLD,
            conversion_threshold: crate::metrics::CONVERSION_THRESHOLD,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Azure OpenAI resource name; full endpoint is derived from it unless
    /// `endpoint` overrides it (tests point this at a mock server).
    pub resource_name: String,
    pub deployment: String,
    pub api_version: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub system_prompt: String,
    /// Completion rounds per request; one extra round after a tool call.
    pub max_steps: u32,
    /// Document-service base URL for the create_document tool.
    pub docs_base_url: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            resource_name: String::new(),
            deployment: "gpt-4o-mini".to_string(),
            api_version: "2024-06-01".to_string(),
            endpoint: None,
            system_prompt: "You are a helpful assistant.".to_string(),
            max_steps: 2,
            docs_base_url: "https://docs.googleapis.com/v1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8710,
        }
    }
}

impl PulseConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}
