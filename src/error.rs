use std::time::Duration;
use thiserror::Error;

/// Everything a story generation (or a settings update) can fail with.
///
/// The transport layer decides how each variant is presented; nothing in the
/// crate returns an unclassified error.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("No API key available: supply one with the request, save one in settings or set OPENROUTER_API_KEY")]
    NoCredential,

    #[error("Bad prompt template: {0}")]
    BadTemplate(#[from] TemplateError),

    #[error("Backend failure: {0}")]
    BackendFailure(#[from] BackendError),

    #[error("Failed to persist settings: {0}")]
    Persist(#[from] PersistError),
}

impl StoryError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        StoryError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

impl From<CredentialError> for StoryError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::NoCredentialAvailable => StoryError::NoCredential,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template references unknown placeholder '{{{0}}}'")]
    MissingVariable(String),

    #[error("malformed template at byte {position}: {reason}")]
    MalformedTemplate { position: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("no credential available")]
    NoCredentialAvailable,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure talking to the generative backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("credential rejected by backend: {0}")]
    Unauthorized(String),

    #[error("rate limited by backend: {0}")]
    RateLimited(String),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("worker pool error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, StoryError>;
