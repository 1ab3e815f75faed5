//! Mock generator for offline tests.
//!
//! Replays a scripted sequence of responses, enabling:
//!
//! - **Offline testing**: exercise the solver, grader, and harness without
//!   API calls
//! - **Deterministic testing**: assert exact call counts and orderings
//! - **Failure injection**: script an error at any position in the sequence
//!
//! # Example
//!
//! ```
//! use sycobench_core::{Generator, LlmRequest, MockGenerator};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), sycobench_core::LlmError> {
//! let mock = MockGenerator::from_replies(["Paris is the capital of France."]);
//!
//! let generation = mock
//!     .generate_text(LlmRequest::new("Capital of France?"), &CancellationToken::new())
//!     .await?;
//! assert_eq!(generation.text, "Paris is the capital of France.");
//! assert_eq!(mock.calls(), 1);
//! # Ok(())
//! # }
//! ```

use crate::error::LlmError;
use crate::llm::{Generation, Generator, LlmRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// A scripted reply: either a response text or an error message.
type ScriptedReply = Result<String, String>;

/// Mock generator that replays scripted replies in order.
///
/// Each call to [`Generator::generate_text`] returns the next scripted
/// reply; once the script is exhausted further calls fail with
/// [`LlmError::NoContent`]. All received requests are logged and can be
/// inspected with [`requests`](MockGenerator::requests) to assert call
/// ordering.
#[derive(Debug, Default)]
pub struct MockGenerator {
    /// Scripted replies to return in order
    replies: Vec<ScriptedReply>,

    /// Index of the next reply
    next: AtomicUsize,

    /// Log of every request received
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockGenerator {
    /// Create a mock that replays the given response texts in order.
    pub fn from_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(|r| Ok(r.into())).collect(),
            next: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock from a full script of replies and failures.
    pub fn from_script(script: Vec<ScriptedReply>) -> Self {
        Self {
            replies: script,
            next: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append a successful reply to the script.
    #[must_use]
    pub fn with_reply(mut self, text: impl Into<String>) -> Self {
        self.replies.push(Ok(text.into()));
        self
    }

    /// Append a failing reply to the script.
    #[must_use]
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.replies.push(Err(message.into()));
        self
    }

    /// Number of generate calls received so far.
    pub fn calls(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    /// Check if all scripted replies have been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.calls() >= self.replies.len()
    }

    /// Reset to the beginning of the script, clearing the request log.
    pub fn reset(&self) {
        self.next.store(0, Ordering::SeqCst);
        match self.requests.lock() {
            Ok(mut requests) => requests.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Snapshot of every request received, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record_request(&self, request: &LlmRequest) {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
    }
}

impl Generator for MockGenerator {
    async fn generate_text(
        &self,
        request: LlmRequest,
        cancellation: &CancellationToken,
    ) -> Result<Generation, LlmError> {
        if cancellation.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        // Validate request (same as the real client)
        if request.prompt.is_empty() {
            return Err(LlmError::InvalidRequest(
                "Prompt cannot be empty".to_string(),
            ));
        }

        self.record_request(&request);

        let index = self.next.fetch_add(1, Ordering::SeqCst);
        match self.replies.get(index) {
            Some(Ok(text)) => Ok(Generation {
                text: text.clone(),
                tokens: None,
            }),
            Some(Err(message)) => Err(LlmError::Other(message.clone())),
            None => Err(LlmError::NoContent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let mock = MockGenerator::from_replies(["first", "second"]);
        let token = CancellationToken::new();

        let a = mock
            .generate_text(LlmRequest::new("q1"), &token)
            .await
            .unwrap();
        let b = mock
            .generate_text(LlmRequest::new("q2"), &token)
            .await
            .unwrap();

        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");
        assert_eq!(mock.calls(), 2);
        assert!(mock.is_exhausted());
    }

    #[tokio::test]
    async fn test_exhausted_returns_no_content() {
        let mock = MockGenerator::from_replies(["only"]);
        let token = CancellationToken::new();

        mock.generate_text(LlmRequest::new("q1"), &token)
            .await
            .unwrap();
        let result = mock.generate_text(LlmRequest::new("q2"), &token).await;

        assert!(matches!(result, Err(LlmError::NoContent)));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mock = MockGenerator::default()
            .with_reply("ok")
            .with_failure("boom");
        let token = CancellationToken::new();

        mock.generate_text(LlmRequest::new("q1"), &token)
            .await
            .unwrap();
        let result = mock.generate_text(LlmRequest::new("q2"), &token).await;

        match result {
            Err(LlmError::Other(message)) => assert_eq!(message, "boom"),
            other => panic!("Expected Other error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancellation() {
        let mock = MockGenerator::from_replies(["never returned"]);
        let token = CancellationToken::new();
        token.cancel();

        let result = mock.generate_text(LlmRequest::new("q1"), &token).await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
        // A cancelled call never reaches the script
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_rejects_empty_prompt() {
        let mock = MockGenerator::from_replies(["reply"]);
        let token = CancellationToken::new();

        let result = mock.generate_text(LlmRequest::new(""), &token).await;
        assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_request_log_and_reset() {
        let mock = MockGenerator::from_replies(["a", "b"]);
        let token = CancellationToken::new();

        mock.generate_text(LlmRequest::new("first prompt"), &token)
            .await
            .unwrap();
        mock.generate_text(LlmRequest::new("second prompt"), &token)
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].prompt, "first prompt");
        assert_eq!(requests[1].prompt, "second prompt");

        mock.reset();
        assert_eq!(mock.calls(), 0);
        assert!(mock.requests().is_empty());
    }
}
