pub mod completion;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod store;

pub use completion::{ChatClient, ChatMessage, ChatRole, CompletionError, DocumentClient};
pub use config::PulseConfig;
pub use error::PulseError;
pub use store::{PgStore, ResponseStore, StaticStore};
