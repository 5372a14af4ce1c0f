use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SkillpathError {
    /// Timeouts, 5xx responses, connection failures from any external backend.
    #[error("{backend} backend error: {message}")]
    Transient { backend: String, message: String },

    /// Malformed judge output. Recovered inside the judge, never surfaced by it.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Vector store accepted the item but the graph store did not.
    /// Needs manual reconciliation.
    #[error("Consistency error for content {id}: {message}")]
    Consistency { id: Uuid, message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SkillpathError {
    pub fn transient(backend: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transient {
            backend: backend.into(),
            message: err.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency { .. })
    }
}

pub type Result<T, E = SkillpathError> = std::result::Result<T, E>;
