use thiserror::Error;

/// Errors that can occur when invoking a model.
///
/// Generation failures are surfaced per-sample by the evaluation harness;
/// they never abort an entire run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    /// Error from the underlying rust-genai library
    #[error("GenAI error: {0}")]
    Api(rust_genai::GenaiError),

    /// Request timed out
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No content in response
    #[error("No content in response")]
    NoContent,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// Other LLM error
    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Get the retry-after duration if this is a rate limit error.
    ///
    /// Returns `Some(Duration)` if the underlying GenAI error has a
    /// Retry-After header (typically from a 429 response).
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            LlmError::Api(e) => e.retry_after(),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Returns `true` for transient errors that might succeed on retry:
    /// - Timeouts
    /// - Rate limits
    /// - API errors that are marked as retryable (5xx, network issues, etc.)
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout(_) => true,
            LlmError::RateLimit(_) => true,
            LlmError::Api(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if the request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LlmError::Cancelled)
    }
}

impl From<rust_genai::GenaiError> for LlmError {
    fn from(error: rust_genai::GenaiError) -> Self {
        // Map GenaiError::Timeout to LlmError::Timeout for consistent API
        if let rust_genai::GenaiError::Timeout(duration) = &error {
            return LlmError::Timeout(duration.as_millis() as u64);
        }
        LlmError::Api(error)
    }
}
