//! LLM client, request types, and the generation capability trait.

mod client;
mod request;

pub use client::LlmClient;
pub use request::LlmRequest;

use crate::error::LlmError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A single buffered generation result.
#[derive(Debug, Clone)]
pub struct Generation {
    /// The assistant's response text.
    pub text: String,

    /// Total tokens used by the call, when the backend reports usage.
    pub tokens: Option<u32>,
}

/// The one capability the evaluation pipeline consumes from a model runtime:
/// a buffered, fallible, cancellable generation.
///
/// Implemented by [`LlmClient`] for real runs and by
/// [`MockGenerator`](crate::MockGenerator) for offline tests. The solver and
/// grader are generic over this trait so they can be exercised without
/// network access.
pub trait Generator: Send + Sync {
    /// Generate a response for the request, honoring the cancellation token.
    ///
    /// Returns [`LlmError::Cancelled`] if the token is cancelled before or
    /// while the call is in flight.
    fn generate_text(
        &self,
        request: LlmRequest,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = Result<Generation, LlmError>> + Send;
}
