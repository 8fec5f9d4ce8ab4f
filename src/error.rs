//! Error types for planner operations
//!
//! Errors are classified by recoverability:
//! - Retryable: network issues, timeouts, an overloaded or rate-limited AI service
//! - NonRetryable: unparseable AI output, configuration, IO
//! - RequiresUserAction: missing or rejected API key

use std::path::PathBuf;
use thiserror::Error;

/// Error types for planner operations
#[derive(Debug, Error)]
pub enum PlannerError {
    // Retryable errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("AI service overloaded: {0}")]
    ServiceOverloaded(String),

    #[error("API rate limit exceeded")]
    RateLimited,

    // Non-retryable errors
    #[error("Could not parse AI response")]
    UnparseableResponse,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("State file is corrupt: {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    // Requires user action
    #[error("No API key configured")]
    MissingApiKey,

    #[error("API key is malformed or was rejected by the AI service")]
    InvalidApiKey,
}

impl PlannerError {
    /// Returns true if this error is worth retrying with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlannerError::Network(_)
                | PlannerError::Timeout(_)
                | PlannerError::ServiceOverloaded(_)
                | PlannerError::RateLimited
        )
    }

    /// Returns true if this error requires user action to resolve
    pub fn requires_user_action(&self) -> bool {
        matches!(self, PlannerError::MissingApiKey | PlannerError::InvalidApiKey)
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PlannerError::Network(_) => "Check your internet connection and try again.",
            PlannerError::Timeout(_) => "The request took too long. Try again.",
            PlannerError::ServiceOverloaded(_) => "The AI service is busy. Try again shortly.",
            PlannerError::RateLimited => "Wait a few minutes and try again.",
            PlannerError::UnparseableResponse => {
                "The AI returned data in an unexpected format. Generate again."
            }
            PlannerError::Configuration(_) => "Check your configuration in ~/.lifeos/config.json",
            PlannerError::CorruptState { .. } => {
                "Restore ~/.lifeos/state.json from a backup or delete it to start fresh."
            }
            PlannerError::Serialization(_) => "Check the file format is correct.",
            PlannerError::Io(_) => "Check file permissions and disk space.",
            PlannerError::MissingApiKey => "Add your API key in settings.",
            PlannerError::InvalidApiKey => "Check that your API key is correct and active.",
        }
    }
}

impl From<std::io::Error> for PlannerError {
    fn from(err: std::io::Error) -> Self {
        PlannerError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::Serialization(err.to_string())
    }
}

/// Serializable error representation for the UI toast
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Retryable,
    NonRetryable,
    RequiresUserAction,
}

impl From<&PlannerError> for ErrorReport {
    fn from(err: &PlannerError) -> Self {
        let error_type = if err.requires_user_action() {
            ErrorType::RequiresUserAction
        } else if err.is_retryable() {
            ErrorType::Retryable
        } else {
            ErrorType::NonRetryable
        };

        ErrorReport {
            message: err.to_string(),
            error_type,
            can_retry: err.is_retryable(),
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}
