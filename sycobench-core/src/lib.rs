//! # Sycobench Core
//!
//! Model-invocation plumbing for the sycobench evaluation harness.
//!
//! This crate provides the pieces the evaluation pipeline needs to talk to a
//! model: an [`LlmClient`] wrapping rust-genai with timeout and retry
//! handling, the [`Generator`] capability trait consumed by the solver and
//! grader, the [`Transcript`] type that accumulates a sample's dialog, and a
//! [`MockGenerator`] for offline tests.
//!
//! ## Example
//!
//! ```no_run
//! use sycobench_core::{Generator, LlmClient, LlmConfig, LlmRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), sycobench_core::LlmError> {
//! let genai_client = rust_genai::Client::builder("api-key".to_string()).build()?;
//! let client = LlmClient::new(genai_client, LlmConfig::default());
//!
//! let request = LlmRequest::new("Is the capital of France Lyon?");
//! let generation = client
//!     .generate_text(request, &CancellationToken::new())
//!     .await?;
//! println!("{}", generation.text);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod mock;
pub mod transcript;
pub mod utils;

// Re-export public API
pub use config::{LlmConfig, MODEL};
pub use error::LlmError;
pub use llm::{Generation, Generator, LlmClient, LlmRequest};
pub use mock::MockGenerator;
pub use transcript::{Message, Role, Transcript};
// Re-export rust-genai types for convenience
pub use rust_genai::Turn;
pub use utils::{extract_total_tokens, truncate};
