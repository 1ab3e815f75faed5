//! Evaluation harness: wires dataset, driver, and grader into one run.
//!
//! The harness fans out across samples with bounded concurrency; within one
//! sample all turns stay strictly sequential inside the conversation driver.
//! Per-sample failures are isolated and reported alongside graded results so
//! partial runs still yield usable aggregate statistics. There is no
//! composition-level business logic beyond this wiring.

use crate::dataset::{Dataset, DatasetError, Sample};
use crate::grader::Grader;
use crate::results::{EvalSummary, SampleResult};
use crate::solver::ConversationDriver;
use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use sycobench_core::Generator;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that can abort an evaluation run.
///
/// Only file-level dataset problems are fatal; per-sample errors are folded
/// into the summary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvalError {
    /// Failed to load dataset
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Progress events emitted during evaluation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum EvalProgress {
    /// Dataset loaded, evaluation starting.
    Started {
        /// Total number of samples to evaluate.
        total: usize,
    },
    /// A sample finished (graded or failed).
    SampleCompleted {
        /// Number of samples completed so far.
        completed: usize,
        /// Total number of samples.
        total: usize,
        /// Whether this sample was graded.
        graded: bool,
    },
}

/// Configuration for the evaluation harness.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct EvalConfig {
    /// Maximum number of concurrent sample evaluations (default: 5)
    pub concurrency: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self { concurrency: 5 }
    }
}

impl EvalConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1); // At least 1
        self
    }
}

/// Evaluation harness for sycophancy benchmarks.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sycobench_core::{LlmClient, LlmConfig};
/// use sycobench_eval::{
///     ConversationDriver, EvalConfig, EvalHarness, Grader, JsonlPromptDataset, TruthStore,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let truth = Arc::new(TruthStore::load("data/truth_map.json").await?);
/// let dataset = JsonlPromptDataset::multi_turn("data/multiturn.jsonl", truth);
///
/// let genai = rust_genai::Client::builder("api-key".to_string()).build()?;
/// let solver_llm = Arc::new(LlmClient::new(genai, LlmConfig::default()));
/// let judge_genai = rust_genai::Client::builder("api-key".to_string()).build()?;
/// let judge_llm = Arc::new(LlmClient::new(
///     judge_genai,
///     LlmConfig::default().with_temperature(0.0),
/// ));
///
/// let harness = EvalHarness::new(EvalConfig::default());
/// let summary = harness
///     .evaluate(
///         &dataset,
///         &ConversationDriver::new(),
///         &Grader::multi_turn(),
///         solver_llm,
///         judge_llm,
///         None,
///     )
///     .await?;
///
/// summary.print_summary();
/// # Ok(())
/// # }
/// ```
pub struct EvalHarness {
    config: EvalConfig,
    cancellation: CancellationToken,
}

impl EvalHarness {
    /// Create a new evaluation harness.
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            cancellation: CancellationToken::new(),
        }
    }

    /// Create a harness whose run can be cancelled from outside.
    ///
    /// Once the token is cancelled, in-flight samples stop issuing further
    /// turns and surface as failed results.
    pub fn with_cancellation(config: EvalConfig, cancellation: CancellationToken) -> Self {
        Self {
            config,
            cancellation,
        }
    }

    /// Run evaluation against a dataset.
    ///
    /// `solver_llm` drives the model under test, `judge_llm` the grading
    /// model. The two may share one client or use differently configured
    /// ones (graders typically run at temperature 0.0).
    pub async fn evaluate<D, S, J>(
        &self,
        dataset: &D,
        driver: &ConversationDriver,
        grader: &Grader,
        solver_llm: Arc<S>,
        judge_llm: Arc<J>,
        sample_size: Option<usize>,
    ) -> Result<EvalSummary, EvalError>
    where
        D: Dataset,
        S: Generator,
        J: Generator,
    {
        self.evaluate_with_progress(
            dataset,
            driver,
            grader,
            solver_llm,
            judge_llm,
            sample_size,
            |_| {},
        )
        .await
    }

    /// Run evaluation with progress callbacks.
    ///
    /// Same as [`evaluate`](Self::evaluate), but calls the provided callback
    /// with [`EvalProgress`] events as the evaluation proceeds.
    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate_with_progress<D, S, J, F>(
        &self,
        dataset: &D,
        driver: &ConversationDriver,
        grader: &Grader,
        solver_llm: Arc<S>,
        judge_llm: Arc<J>,
        sample_size: Option<usize>,
        on_progress: F,
    ) -> Result<EvalSummary, EvalError>
    where
        D: Dataset,
        S: Generator,
        J: Generator,
        F: Fn(EvalProgress) + Send + Sync,
    {
        let start_time = Instant::now();

        let samples = dataset.load(sample_size).await?;
        let total_samples = samples.len();

        if samples.is_empty() {
            return Ok(EvalSummary::from_results(
                dataset.name().to_string(),
                grader.name().to_string(),
                vec![],
                start_time.elapsed(),
            ));
        }

        on_progress(EvalProgress::Started {
            total: total_samples,
        });

        log::info!(
            "Evaluating {} samples with concurrency {}",
            total_samples,
            self.config.concurrency
        );

        let completed = Arc::new(AtomicUsize::new(0));
        let on_progress = Arc::new(on_progress);

        let results: Vec<SampleResult> = stream::iter(samples)
            .map(|sample| {
                let solver_llm = solver_llm.clone();
                let judge_llm = judge_llm.clone();
                let cancellation = self.cancellation.clone();
                let completed = completed.clone();
                let on_progress = on_progress.clone();

                async move {
                    let result = evaluate_sample(
                        sample,
                        driver,
                        grader,
                        solver_llm.as_ref(),
                        judge_llm.as_ref(),
                        &cancellation,
                    )
                    .await;

                    let count = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    on_progress(EvalProgress::SampleCompleted {
                        completed: count,
                        total: total_samples,
                        graded: result.is_graded(),
                    });
                    result
                }
            })
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        Ok(EvalSummary::from_results(
            dataset.name().to_string(),
            grader.name().to_string(),
            results,
            start_time.elapsed(),
        ))
    }
}

impl Default for EvalHarness {
    fn default() -> Self {
        Self::new(EvalConfig::default())
    }
}

/// Evaluate a single sample: drive the conversation, then grade it.
///
/// Failures in either stage become a failed result for this sample only.
async fn evaluate_sample<S, J>(
    sample: Sample,
    driver: &ConversationDriver,
    grader: &Grader,
    solver_llm: &S,
    judge_llm: &J,
    cancellation: &CancellationToken,
) -> SampleResult
where
    S: Generator,
    J: Generator,
{
    let solved = match driver.solve(&sample, solver_llm, cancellation).await {
        Ok(solved) => solved,
        Err(e) => {
            log::warn!("Sample {} generation failed: {}", sample.id, e);
            return SampleResult::failed(&sample, None, e.to_string(), 0);
        }
    };

    match grader
        .grade(&sample, &solved.transcript, judge_llm, cancellation)
        .await
    {
        Ok(verdict) => SampleResult::graded(&sample, solved, verdict),
        Err(e) => {
            log::warn!("Sample {} grading failed: {}", sample.id, e);
            let tokens = solved.total_tokens;
            SampleResult::failed(&sample, Some(solved.transcript), e.to_string(), tokens)
        }
    }
}
