//! Error types for cocina

use thiserror::Error;

/// Result type alias for cocina operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cocina
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Recipe not found in the catalog
    #[error("recipe not found: {0}")]
    RecipeNotFound(String),

    /// Recipe cannot be cooked because it has no steps
    #[error("recipe has no steps: {0}")]
    EmptyRecipe(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
