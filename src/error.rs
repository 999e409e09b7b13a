use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiWatchError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("No open merge request for branch: {0}")]
    MergeRequestNotFound(String),

    #[error("Merge request !{0} has no pipeline")]
    NoPipeline(u64),

    #[error("Inconsistent pipeline data: {0}")]
    DataIntegrity(String),

    #[error("Git error: {0}")]
    Git(String),
}

pub type Result<T> = std::result::Result<T, CiWatchError>;
