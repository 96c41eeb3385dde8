//! Bundled static datasets — the fallback/alternative to the live store.
//!
//! The simulation ships its output as plain JSON documents. Loading is
//! strict: a malformed document is an error for the caller to surface, not
//! an empty collection.

use std::path::Path;

use crate::error::PulseError;
use crate::models::{OutcomeRecord, PersonaProfile, ResponseRecord};

pub fn load_responses(path: impl AsRef<Path>) -> Result<Vec<ResponseRecord>, PulseError> {
    load_json(path.as_ref())
}

pub fn load_outcomes(path: impl AsRef<Path>) -> Result<Vec<OutcomeRecord>, PulseError> {
    load_json(path.as_ref())
}

pub fn load_personas(path: impl AsRef<Path>) -> Result<Vec<PersonaProfile>, PulseError> {
    load_json(path.as_ref())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, PulseError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| PulseError::Dataset(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_fixture(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    const SAMPLE: &str = r#"[
        {
            "id": "3efac521-a8ce-45f6-966a-42165b4166fc",
            "persona_id": 1,
            "persona_name": "Brian",
            "iteration": 1,
            "current_rating": 1.0,
            "normalized_current_rating": 0.0,
            "recommended_rating": 1.5,
            "normalized_recommended_rating": 0.166667,
            "reaction": "Negative",
            "reason": "Distrusts health authorities.",
            "editor_changes": "Adopted a tone that respects his autonomy.",
            "article": "Recent studies have shown protection against severe illness.",
            "is_real": true
        }
    ]"#;

    #[test]
    fn parses_a_valid_response_collection() {
        let path = write_fixture("pulse-dataset-valid.json", SAMPLE);
        let records = load_responses(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].persona_name, "Brian");
        assert_eq!(records[0].reaction, crate::models::Reaction::Negative);
        assert!(records[0].is_real);
        assert!(!records[0].is_fake());
    }

    #[test]
    fn malformed_json_is_an_error_not_an_empty_collection() {
        let path = write_fixture("pulse-dataset-malformed.json", "{not json");
        let err = load_responses(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, PulseError::Dataset(_)));
    }

    #[test]
    fn missing_file_surfaces_io_error() {
        let err = load_responses("/nonexistent/responses.json").unwrap_err();
        assert!(matches!(err, PulseError::Io(_)));
    }
}
