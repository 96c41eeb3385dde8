use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Completion error: {0}")]
    Completion(#[from] crate::completion::CompletionError),
}
