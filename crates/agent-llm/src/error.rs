//! Error types for reasoning collaborator calls

use thiserror::Error;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors raised while asking a provider for the next producer message
///
/// Any of these ends the task with a failed record; none is retried.
#[derive(Error, Debug)]
pub enum LLMError {
    /// The collaborator answered with an unexpected status
    #[error("Producer request failed: {0}")]
    RequestFailed(String),

    /// The collaborator rejected our credentials
    #[error("Producer rejected the request as unauthorized")]
    AuthenticationFailed,

    /// The collaborator is throttling us
    #[error("Producer rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The collaborator could not accept the conversation
    #[error("Producer rejected the conversation: {0}")]
    InvalidRequest(String),

    /// Transport-level failure
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The answer could not be read as a producer message
    #[error("Unexpected producer response: {0}")]
    UnexpectedResponse(String),

    /// Failure inside an in-process provider
    #[error("Provider error: {0}")]
    ProviderError(String),
}
