use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The survey-outcome dataset variant: one persona's answer with the
/// resulting vaccination decision and attitude scores (0-5 scale).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutcomeRecord {
    pub id: Uuid,
    pub persona_id: i32,
    pub answer_time: DateTime<Utc>,
    pub response: String,
    pub is_real: bool,
    pub is_fact: bool,
    pub took_vaccine: bool,
    pub recommendation_rating: f64,
    pub attitude_score: f64,
}
