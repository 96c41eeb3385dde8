use crate::config::DatabaseConfig;
use crate::models::{OutcomeRecord, ResponseRecord};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

/// Fetch every row of the persona_responses table. No ordering or pagination
/// contract; callers sort what they need.
pub async fn fetch_responses(pool: &PgPool) -> Result<Vec<ResponseRecord>, sqlx::Error> {
    sqlx::query_as::<_, ResponseRecord>(
        "SELECT id, persona_id, persona_name, iteration, current_rating, \
         normalized_current_rating, recommended_rating, normalized_recommended_rating, \
         reaction, reason, editor_changes, article, is_real \
         FROM persona_responses",
    )
    .fetch_all(pool)
    .await
}

/// Fetch every row of the survey_responses table.
pub async fn fetch_outcomes(pool: &PgPool) -> Result<Vec<OutcomeRecord>, sqlx::Error> {
    sqlx::query_as::<_, OutcomeRecord>(
        "SELECT id, persona_id, answer_time, response, is_real, is_fact, \
         took_vaccine, recommendation_rating, attitude_score \
         FROM survey_responses",
    )
    .fetch_all(pool)
    .await
}
