use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuestionCacheError {
    /// An import payload that is not an array of `{question, answer}` objects.
    #[error("Malformed import (entry {index}): {reason}")]
    MalformedImport { index: usize, reason: String },

    /// A model or embedding backend failed; never retried.
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl QuestionCacheError {
    pub fn collaborator(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }
}
