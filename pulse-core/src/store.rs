//! Record access behind one seam.
//!
//! The dashboard either queries the hosted Postgres store or reads the
//! bundled JSON datasets; everything downstream consumes the same opaque
//! "all rows" collections.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::config::{DataSourceKind, DatasetConfig};
use crate::error::PulseError;
use crate::models::{OutcomeRecord, ResponseRecord};

#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// All persona response records, unordered.
    async fn responses(&self) -> Result<Vec<ResponseRecord>, PulseError>;

    /// All survey outcome records, unordered.
    async fn outcomes(&self) -> Result<Vec<OutcomeRecord>, PulseError>;

    /// Human-readable status for the health endpoint.
    async fn status(&self) -> Result<String, PulseError>;

    /// Store name for logging.
    fn name(&self) -> &str;
}

/// Live Postgres-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ResponseStore for PgStore {
    async fn responses(&self) -> Result<Vec<ResponseRecord>, PulseError> {
        Ok(crate::db::fetch_responses(&self.pool).await?)
    }

    async fn outcomes(&self) -> Result<Vec<OutcomeRecord>, PulseError> {
        Ok(crate::db::fetch_outcomes(&self.pool).await?)
    }

    async fn status(&self) -> Result<String, PulseError> {
        Ok(crate::db::health_check(&self.pool).await?)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

/// Bundled-dataset store, loaded once at startup.
pub struct StaticStore {
    responses: Vec<ResponseRecord>,
    outcomes: Vec<OutcomeRecord>,
}

impl StaticStore {
    pub fn new(responses: Vec<ResponseRecord>, outcomes: Vec<OutcomeRecord>) -> Self {
        Self {
            responses,
            outcomes,
        }
    }

    pub fn load(config: &DatasetConfig) -> Result<Self, PulseError> {
        let responses = crate::dataset::load_responses(&config.responses_path)?;
        let outcomes = crate::dataset::load_outcomes(&config.outcomes_path)?;
        tracing::info!(
            responses = responses.len(),
            outcomes = outcomes.len(),
            "Loaded bundled datasets"
        );
        Ok(Self::new(responses, outcomes))
    }
}

#[async_trait]
impl ResponseStore for StaticStore {
    async fn responses(&self) -> Result<Vec<ResponseRecord>, PulseError> {
        Ok(self.responses.clone())
    }

    async fn outcomes(&self) -> Result<Vec<OutcomeRecord>, PulseError> {
        Ok(self.outcomes.clone())
    }

    async fn status(&self) -> Result<String, PulseError> {
        Ok(format!(
            "static dataset ({} responses, {} outcomes)",
            self.responses.len(),
            self.outcomes.len()
        ))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Build the configured store. Database mode connects eagerly so startup
/// fails loudly when the store is unreachable.
pub async fn create_store(
    dataset: &DatasetConfig,
    database: &crate::config::DatabaseConfig,
) -> Result<Box<dyn ResponseStore>, PulseError> {
    match dataset.source {
        DataSourceKind::Database => {
            let pool = crate::db::create_pool(database).await?;
            Ok(Box::new(PgStore::new(pool)))
        }
        DataSourceKind::Static => Ok(Box::new(StaticStore::load(dataset)?)),
    }
}
