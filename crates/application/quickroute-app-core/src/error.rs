use crate::ports::RemoteCallError;
use quickroute_core::InvalidMode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No profiles available to connect through")]
    EmptyProfiles,
    #[error("Profile '{0}' not found")]
    UnknownProfile(String),
    #[error("Profile URL cannot be empty")]
    EmptyUrl,
    #[error(transparent)]
    InvalidMode(#[from] InvalidMode),
}

/// Errors produced inside an operation. They stop at the operation boundary,
/// where they are turned into a notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{op} failed: {message}")]
    RemoteCall { op: &'static str, message: String },
    #[error("engine reported unknown mode '{observed}'")]
    StateInconsistency { observed: String },
}

impl CoreError {
    pub fn remote(op: &'static str) -> impl FnOnce(RemoteCallError) -> CoreError {
        move |e| CoreError::RemoteCall {
            op,
            message: e.message,
        }
    }

    /// Text shown to the user: the upstream message for remote failures.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::RemoteCall { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
