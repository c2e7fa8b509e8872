use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Mandatory source missing: {0}")]
    MissingSource(String),

    #[error("Failed to read source '{name}': {message}")]
    SourceUnreadable { name: String, message: String },

    #[error("Collaborator request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Collaborator response violated the correction contract: {0}")]
    Contract(String),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, ReconError>;
