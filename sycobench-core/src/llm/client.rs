//! LLM client implementation.

use super::request::LlmRequest;
use super::{Generation, Generator};
use crate::config::{LlmConfig, MODEL};
use crate::error::LlmError;
use crate::utils::extract_total_tokens;
use rust_genai::GenerationConfig;
use tokio_util::sync::CancellationToken;

/// LLM client wrapping rust-genai with timeout and configuration.
///
/// The client owns the transport-layer concerns of a model invocation:
/// request validation, per-request timeout, and retry with exponential
/// backoff on transient failures. The evaluation pipeline above it never
/// retries on its own.
pub struct LlmClient {
    /// Underlying rust-genai client
    client: rust_genai::Client,

    /// LLM configuration (timeout, tokens, temperature, retries)
    config: LlmConfig,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("model", &MODEL)
            .field("client", &"[REDACTED]")
            .field("config", &self.config)
            .finish()
    }
}

impl LlmClient {
    /// Create a new LLM client with the given rust-genai client and configuration
    pub fn new(client: rust_genai::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }

    /// Get a reference to the LLM configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Generate a complete response (buffered mode)
    ///
    /// This method waits for the full response before returning.
    ///
    /// # Retry Behavior
    ///
    /// Transient failures (timeouts, rate limits, temporary API errors) are
    /// automatically retried up to `config.max_retries` times with exponential
    /// backoff starting at `config.retry_base_delay_ms`.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `LlmError::Timeout` if the request exceeds `config.timeout`
    /// - `LlmError::Api` for underlying API errors
    /// - `LlmError::NoContent` if the response is empty
    pub async fn generate(
        &self,
        request: LlmRequest,
    ) -> Result<rust_genai::InteractionResponse, LlmError> {
        self.validate_request(&request)?;

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.generate_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if Self::is_retryable(&e) && attempt < self.config.max_retries => {
                    log::warn!(
                        "LLM request failed (attempt {}/{}): {}, retrying...",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    last_error = Some(e);
                    tokio::time::sleep(self.config.retry_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }

        // This shouldn't be reachable, but just in case
        Err(last_error
            .unwrap_or_else(|| LlmError::Other("Retry loop exited unexpectedly".to_string())))
    }

    /// Generate a complete response with cancellation support
    ///
    /// Like `generate()`, but also checks the cancellation token before each
    /// attempt and during retry delays. Returns `LlmError::Cancelled` if the
    /// token is cancelled.
    pub async fn generate_with_cancellation(
        &self,
        request: LlmRequest,
        cancellation_token: &CancellationToken,
    ) -> Result<rust_genai::InteractionResponse, LlmError> {
        self.validate_request(&request)?;

        // Check cancellation before starting
        if cancellation_token.is_cancelled() {
            return Err(LlmError::Cancelled);
        }

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            // Check cancellation before each attempt
            if cancellation_token.is_cancelled() {
                return Err(LlmError::Cancelled);
            }

            // Race the LLM call against cancellation
            let result = tokio::select! {
                res = self.generate_once(&request) => res,
                _ = cancellation_token.cancelled() => {
                    return Err(LlmError::Cancelled);
                }
            };

            match result {
                Ok(response) => return Ok(response),
                Err(e) if Self::is_retryable(&e) && attempt < self.config.max_retries => {
                    log::warn!(
                        "LLM request failed (attempt {}/{}): {}, retrying...",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    last_error = Some(e);

                    // Race retry delay against cancellation
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.retry_delay(attempt)) => {}
                        _ = cancellation_token.cancelled() => {
                            return Err(LlmError::Cancelled);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Other("Retry loop exited unexpectedly".to_string())))
    }

    /// Execute a single generate request (no retries)
    async fn generate_once(
        &self,
        request: &LlmRequest,
    ) -> Result<rust_genai::InteractionResponse, LlmError> {
        let interaction = self.build_interaction(request);

        // Execute with timeout (rust-genai handles timeout natively)
        let response = interaction
            .with_timeout(self.config.timeout)
            .create()
            .await
            .map_err(LlmError::from)?;

        // Validate response has content
        if response.text().is_none() {
            return Err(LlmError::NoContent);
        }

        Ok(response)
    }

    /// Determine if an error is retryable
    fn is_retryable(error: &LlmError) -> bool {
        match error {
            // Transient failures that may succeed on retry
            LlmError::Timeout(_) => true,
            LlmError::RateLimit(_) => true,
            // API errors may be transient (network issues, server overload)
            LlmError::Api(_) => true,
            // These are not retryable
            LlmError::InvalidRequest(_) => false,
            LlmError::NoContent => false,
            LlmError::Cancelled => false,
            LlmError::Other(_) => false,
        }
    }

    /// Validate the request before processing
    fn validate_request(&self, request: &LlmRequest) -> Result<(), LlmError> {
        if request.prompt.is_empty() {
            return Err(LlmError::InvalidRequest(
                "Prompt cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Build an interaction from the request
    fn build_interaction(&self, request: &LlmRequest) -> rust_genai::InteractionBuilder<'_> {
        let generation_config = GenerationConfig {
            temperature: Some(self.config.temperature),
            max_output_tokens: Some(self.config.max_tokens as i32),
            ..Default::default()
        };

        let mut interaction = self
            .client
            .interaction()
            .with_model(MODEL)
            .with_generation_config(generation_config);

        // Use turns if provided, appending current prompt as final user turn.
        // Otherwise fall back to simple text prompt.
        if let Some(ref turns) = request.turns {
            let mut full_turns = turns.clone();
            full_turns.push(rust_genai::Turn::user(request.prompt.as_str()));
            interaction = interaction.with_turns(full_turns);
        } else {
            interaction = interaction.with_text(&request.prompt);
        }

        if let Some(ref system) = request.system_instruction {
            interaction = interaction.with_system_instruction(system);
        }

        interaction
    }
}

impl Generator for LlmClient {
    async fn generate_text(
        &self,
        request: LlmRequest,
        cancellation: &CancellationToken,
    ) -> Result<Generation, LlmError> {
        let response = self.generate_with_cancellation(request, cancellation).await?;
        let tokens = extract_total_tokens(&response);
        // generate_once already rejected empty responses
        let text = response.text().unwrap_or("").to_string();

        Ok(Generation { text, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn test_client() -> LlmClient {
        let genai_client = rust_genai::Client::builder("test-key".to_string())
            .build()
            .unwrap();
        LlmClient::new(genai_client, LlmConfig::default())
    }

    #[rstest]
    #[case::timeout(LlmError::Timeout(5000), true)]
    #[case::rate_limit(LlmError::RateLimit("Too many requests".into()), true)]
    #[case::invalid_request(LlmError::InvalidRequest("Bad prompt".into()), false)]
    #[case::no_content(LlmError::NoContent, false)]
    #[case::cancelled(LlmError::Cancelled, false)]
    #[case::other(LlmError::Other("Unknown error".into()), false)]
    fn test_is_retryable(#[case] error: LlmError, #[case] expected: bool) {
        assert_eq!(LlmClient::is_retryable(&error), expected);
    }

    #[test]
    fn test_validate_request_empty_prompt() {
        let client = test_client();
        let request = LlmRequest::new("");

        let result = client.validate_request(&request);
        assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_request_valid_prompt() {
        let client = test_client();
        let request = LlmRequest::new("Valid prompt");

        assert!(client.validate_request(&request).is_ok());
    }

    #[test]
    fn test_generation_config_applied() {
        use std::time::Duration;

        let config = LlmConfig {
            temperature: 0.5,
            max_tokens: 1024,
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay_ms: 500,
        };

        let genai_client = rust_genai::Client::builder("test-key".to_string())
            .build()
            .unwrap();
        let client = LlmClient::new(genai_client, config);

        assert_eq!(client.config().temperature, 0.5);
        assert_eq!(client.config().max_tokens, 1024);
        assert_eq!(client.config().max_retries, 3);
    }

    #[test]
    fn test_llm_client_debug_redacts_api_key() {
        let genai_client = rust_genai::Client::builder("secret-api-key-12345".to_string())
            .build()
            .unwrap();
        let client = LlmClient::new(genai_client, LlmConfig::default());

        let debug_output = format!("{:?}", client);

        assert!(
            debug_output.contains("gemini"),
            "Debug output should contain model name"
        );
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("secret-api-key"),
            "Debug output must not contain API key"
        );
        assert!(
            !debug_output.contains("12345"),
            "Debug output must not contain API key suffix"
        );
    }

    #[tokio::test]
    async fn test_generate_with_cancellation_pre_cancelled() {
        let client = test_client();
        let token = CancellationToken::new();
        token.cancel();

        let result = client
            .generate_with_cancellation(LlmRequest::new("Hello"), &token)
            .await;
        assert!(matches!(result, Err(LlmError::Cancelled)));
    }
}
