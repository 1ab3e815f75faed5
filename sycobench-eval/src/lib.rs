//! # Sycobench Eval
//!
//! Evaluation harness for measuring sycophancy in conversational AI models:
//! whether a model agrees with a false factual claim embedded in
//! persuasively-framed prompts, across single-turn and multi-turn dialogs.
//!
//! ## Overview
//!
//! - **Truth store**: canonical truths keyed by statement id, loaded once
//!   and passed explicitly into dataset construction
//! - **Datasets**: JSONL prompt files converted into normalized samples,
//!   with optional difficulty filtering
//! - **Solver**: a conversation driver that plays the opening prompt and
//!   scripted follow-ups against the model under test
//! - **Grader**: a second model invocation constrained by a C/P/I rubric,
//!   parsed via the fixed `GRADE: <letter>` tag
//! - **Harness**: batch execution with bounded concurrency, isolated
//!   per-sample failures, and accuracy/standard-error reporting
//!
//! ## Architecture
//!
//! ```text
//! sycobench-core (LLM client, transcripts, mock generator)
//!     ↓
//! sycobench-eval (truth store, datasets, solver, grader, harness)  ← this crate
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sycobench_core::{LlmClient, LlmConfig};
//! use sycobench_eval::{
//!     ConversationDriver, EvalConfig, EvalHarness, Grader, JsonlPromptDataset, TruthStore,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load the canonical truths and the prompt dataset
//! let truth = Arc::new(TruthStore::load("data/truth_map.json").await?);
//! let dataset = JsonlPromptDataset::multi_turn("data/multiturn.jsonl", truth);
//!
//! // One client drives the model under test, one the grading model
//! let genai = rust_genai::Client::builder("api-key".to_string()).build()?;
//! let solver_llm = Arc::new(LlmClient::new(genai, LlmConfig::default()));
//! let judge_genai = rust_genai::Client::builder("api-key".to_string()).build()?;
//! let judge_llm = Arc::new(LlmClient::new(
//!     judge_genai,
//!     LlmConfig::default().with_temperature(0.0),
//! ));
//!
//! // Run the evaluation
//! let harness = EvalHarness::new(EvalConfig::default());
//! let summary = harness
//!     .evaluate(
//!         &dataset,
//!         &ConversationDriver::new(),
//!         &Grader::multi_turn(),
//!         solver_llm,
//!         judge_llm,
//!         Some(100),
//!     )
//!     .await?;
//!
//! summary.print_summary();
//! summary.write_json(std::path::Path::new("results.json"))?;
//! # Ok(())
//! # }
//! ```

pub mod dataset;
pub mod grader;
pub mod harness;
pub mod results;
pub mod solver;
pub mod truth;

// Re-export public API
pub use dataset::{
    Dataset, DatasetError, Difficulty, IdStyle, JsonlPromptDataset, Record, Sample,
    SampleMetadata, DEFAULT_SYSTEM_PROMPT,
};
pub use grader::{extract_verdict, Grade, GradeError, Grader, Verdict};
pub use harness::{EvalConfig, EvalError, EvalHarness, EvalProgress};
pub use results::{EvalSummary, GradeCounts, SampleResult};
pub use solver::{ConversationDriver, SolvedSample};
pub use truth::TruthStore;
