use serde::{Deserialize, Serialize};

/// Bundled description of a synthetic persona. Read-only; produced by the
/// simulation alongside the response datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub persona_id: i32,
    pub name: String,
    pub description: String,
    pub demographics: Demographics,
    #[serde(default)]
    pub media_diet: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demographics {
    pub age: u32,
    pub gender: String,
    pub location: String,
    pub occupation: String,
}
