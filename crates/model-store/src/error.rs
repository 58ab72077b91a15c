use thiserror::Error;

/// Errors that can occur when storing or loading models
#[derive(Error, Debug)]
pub enum ModelStoreError {
    #[error("Model {0} not found")]
    NotFound(String),

    /// Ids become file names, so only `[A-Za-z0-9_.-]` is accepted
    #[error("Invalid model id {0:?}")]
    InvalidId(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The stored model decoded but breaks the rank invariant
    #[error("Stored model is invalid: {0}")]
    InvalidModel(#[from] training::TrainingError),
}

pub type Result<T> = std::result::Result<T, ModelStoreError>;
