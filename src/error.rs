use std::path::PathBuf;

/// Errors surfaced by the store and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{} is locked by another process", path.display())]
    Locked { path: PathBuf },

    #[error("No {0} IDs left")]
    IdsExhausted(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
