//! Seeding — pushes the bundled simulation datasets into Postgres.
//!
//! The simulation produces its output out-of-band; this crate is the only
//! write path into the store. Inserts are idempotent (`ON CONFLICT (id) DO
//! NOTHING`), so re-running a seed is safe.

use pulse_core::models::{OutcomeRecord, Reaction, ResponseRecord};
use sqlx::PgPool;

const CREATE_RESPONSES: &str = "\
CREATE TABLE IF NOT EXISTS persona_responses (
    id UUID PRIMARY KEY,
    persona_id INTEGER NOT NULL,
    persona_name TEXT NOT NULL,
    iteration INTEGER NOT NULL,
    current_rating DOUBLE PRECISION NOT NULL,
    normalized_current_rating DOUBLE PRECISION NOT NULL,
    recommended_rating DOUBLE PRECISION NOT NULL,
    normalized_recommended_rating DOUBLE PRECISION NOT NULL,
    reaction TEXT NOT NULL,
    reason TEXT NOT NULL,
    editor_changes TEXT NOT NULL,
    article TEXT NOT NULL,
    is_real BOOLEAN NOT NULL,
    UNIQUE (persona_id, iteration)
)";

const CREATE_OUTCOMES: &str = "\
CREATE TABLE IF NOT EXISTS survey_responses (
    id UUID PRIMARY KEY,
    persona_id INTEGER NOT NULL,
    answer_time TIMESTAMPTZ NOT NULL,
    response TEXT NOT NULL,
    is_real BOOLEAN NOT NULL,
    is_fact BOOLEAN NOT NULL,
    took_vaccine BOOLEAN NOT NULL,
    recommendation_rating DOUBLE PRECISION NOT NULL,
    attitude_score DOUBLE PRECISION NOT NULL
)";

#[derive(Debug, Default)]
pub struct SeedReport {
    pub responses_inserted: u64,
    pub outcomes_inserted: u64,
}

/// Create both tables if absent and insert every record.
pub async fn seed_all(
    pool: &PgPool,
    responses: &[ResponseRecord],
    outcomes: &[OutcomeRecord],
) -> Result<SeedReport, sqlx::Error> {
    Ok(SeedReport {
        responses_inserted: seed_responses(pool, responses).await?,
        outcomes_inserted: seed_outcomes(pool, outcomes).await?,
    })
}

pub async fn seed_responses(
    pool: &PgPool,
    records: &[ResponseRecord],
) -> Result<u64, sqlx::Error> {
    sqlx::query(CREATE_RESPONSES).execute(pool).await?;

    let mut inserted = 0;
    for r in records {
        let result = sqlx::query(
            "INSERT INTO persona_responses (id, persona_id, persona_name, iteration, \
             current_rating, normalized_current_rating, recommended_rating, \
             normalized_recommended_rating, reaction, reason, editor_changes, article, is_real) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(r.id)
        .bind(r.persona_id)
        .bind(&r.persona_name)
        .bind(r.iteration)
        .bind(r.current_rating)
        .bind(r.normalized_current_rating)
        .bind(r.recommended_rating)
        .bind(r.normalized_recommended_rating)
        .bind(match r.reaction {
            Reaction::Positive => "Positive",
            Reaction::Negative => "Negative",
        })
        .bind(&r.reason)
        .bind(&r.editor_changes)
        .bind(&r.article)
        .bind(r.is_real)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }

    tracing::info!(inserted, total = records.len(), "Seeded persona_responses");
    Ok(inserted)
}

pub async fn seed_outcomes(pool: &PgPool, records: &[OutcomeRecord]) -> Result<u64, sqlx::Error> {
    sqlx::query(CREATE_OUTCOMES).execute(pool).await?;

    let mut inserted = 0;
    for r in records {
        let result = sqlx::query(
            "INSERT INTO survey_responses (id, persona_id, answer_time, response, is_real, \
             is_fact, took_vaccine, recommendation_rating, attitude_score) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(r.id)
        .bind(r.persona_id)
        .bind(r.answer_time)
        .bind(&r.response)
        .bind(r.is_real)
        .bind(r.is_fact)
        .bind(r.took_vaccine)
        .bind(r.recommendation_rating)
        .bind(r.attitude_score)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }

    tracing::info!(inserted, total = records.len(), "Seeded survey_responses");
    Ok(inserted)
}
