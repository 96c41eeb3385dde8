use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Categorical sentiment attached to a persona's reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum Reaction {
    Positive,
    Negative,
}

/// One persona's reaction at one iteration of article exposure.
///
/// Within a persona's record set, iteration numbers are unique and ordering
/// by iteration defines the trajectory. The article tag is `is_real` only;
/// "fake" is always `!is_real`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResponseRecord {
    pub id: Uuid,
    pub persona_id: i32,
    pub persona_name: String,
    pub iteration: i32,
    pub current_rating: f64,
    pub normalized_current_rating: f64,
    pub recommended_rating: f64,
    pub normalized_recommended_rating: f64,
    pub reaction: Reaction,
    pub reason: String,
    pub editor_changes: String,
    pub article: String,
    pub is_real: bool,
}

impl ResponseRecord {
    pub fn is_fake(&self) -> bool {
        !self.is_real
    }
}
