//! Evaluation CLI for the sycophancy benchmark.
//!
//! Loads a truth map and a JSONL prompt file, drives each sample through the
//! model under test, and grades the transcripts with a second model. This
//! binary is the hosting runner: it owns CLI flags, logging, progress
//! display, and exit codes.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use sycobench_core::{LlmClient, LlmConfig};
use sycobench_eval::{
    ConversationDriver, Dataset, Difficulty, EvalConfig, EvalHarness, EvalProgress, EvalSummary,
    Grader, JsonlPromptDataset, TruthStore,
};

/// Evaluation CLI for the sycophancy benchmark.
#[derive(Parser, Debug)]
#[command(name = "sycobench")]
#[command(about = "Measure sycophancy against persuasively-framed false claims")]
#[command(version)]
struct Args {
    /// Path to the truth map JSON file (statement_id -> canonical truth)
    #[arg(long)]
    truth_map: PathBuf,

    /// Path to the JSONL prompt file
    #[arg(long, short = 'd')]
    dataset: PathBuf,

    /// Drive scripted follow-ups and grade the whole dialog
    #[arg(long)]
    multi_turn: bool,

    /// Only evaluate records with this difficulty (L1, L2, or L3)
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// Number of samples to evaluate (default: all)
    #[arg(long, short = 's')]
    sample: Option<usize>,

    /// Maximum concurrent sample evaluations
    #[arg(long, default_value = "5")]
    concurrency: usize,

    /// Output format: table or json
    #[arg(long, short = 'o', default_value = "table")]
    output: String,

    /// Output file path (defaults to stdout for table, required for json)
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Gemini API key (can also use GEMINI_API_KEY env var)
    #[arg(long, env = "GEMINI_API_KEY")]
    api_key: String,

    /// LLM request timeout in seconds
    #[arg(long, default_value = "60")]
    llm_timeout: u64,

    /// Maximum tokens per LLM request
    #[arg(long, default_value = "2048")]
    max_tokens: u32,

    /// Temperature for the model under test (0.0-1.0)
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Validate CLI arguments.
    fn validate(&self) -> Result<(), String> {
        if !["table", "json"].contains(&self.output.as_str()) {
            return Err(format!(
                "Invalid output format '{}'. Use 'table' or 'json'.",
                self.output
            ));
        }

        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(format!(
                "temperature ({}) must be between 0.0 and 1.0",
                self.temperature
            ));
        }

        Ok(())
    }

    /// Build the LlmConfig for the model under test.
    fn solver_config(&self) -> LlmConfig {
        LlmConfig::default()
            .with_timeout(Duration::from_secs(self.llm_timeout))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    /// Build the LlmConfig for the grading model.
    ///
    /// Graders run deterministically at temperature 0.0.
    fn judge_config(&self) -> LlmConfig {
        self.solver_config().with_temperature(0.0)
    }

    /// Build EvalConfig from CLI arguments.
    fn eval_config(&self) -> EvalConfig {
        EvalConfig::new().with_concurrency(self.concurrency)
    }
}

/// Run the evaluation end to end.
async fn run_evaluation(args: &Args) -> Result<EvalSummary, String> {
    let truth = TruthStore::load(&args.truth_map)
        .await
        .map_err(|e| format!("Failed to load truth map: {}", e))?;
    let truth = Arc::new(truth);

    let mut dataset = if args.multi_turn {
        JsonlPromptDataset::multi_turn(args.dataset.clone(), truth)
    } else {
        JsonlPromptDataset::single_turn(args.dataset.clone(), truth)
    };
    if let Some(difficulty) = args.difficulty {
        dataset = dataset.with_difficulty(difficulty);
    }

    let solver_genai = rust_genai::Client::builder(args.api_key.clone())
        .build()
        .map_err(|e| format!("Failed to create Gemini client: {}", e))?;
    let solver_llm = Arc::new(LlmClient::new(solver_genai, args.solver_config()));

    let judge_genai = rust_genai::Client::builder(args.api_key.clone())
        .build()
        .map_err(|e| format!("Failed to create grader Gemini client: {}", e))?;
    let judge_llm = Arc::new(LlmClient::new(judge_genai, args.judge_config()));

    let driver = ConversationDriver::new();
    let grader = if args.multi_turn {
        Grader::multi_turn()
    } else {
        Grader::single_turn()
    };

    let harness = EvalHarness::new(args.eval_config());
    run_with_progress(
        &harness,
        &dataset,
        &driver,
        &grader,
        solver_llm,
        judge_llm,
        args.sample,
    )
    .await
}

/// Run evaluation with a progress bar.
async fn run_with_progress<D: Dataset>(
    harness: &EvalHarness,
    dataset: &D,
    driver: &ConversationDriver,
    grader: &Grader,
    solver_llm: Arc<LlmClient>,
    judge_llm: Arc<LlmClient>,
    sample_size: Option<usize>,
) -> Result<EvalSummary, String> {
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let summary = harness
        .evaluate_with_progress(
            dataset,
            driver,
            grader,
            solver_llm,
            judge_llm,
            sample_size,
            |progress| match progress {
                EvalProgress::Started { total } => {
                    progress_bar.set_length(total as u64);
                    progress_bar.set_message("Evaluating...");
                }
                EvalProgress::SampleCompleted {
                    completed, graded, ..
                } => {
                    progress_bar.set_position(completed as u64);
                    if !graded {
                        progress_bar.set_message("(some failures)");
                    }
                }
                _ => {} // Handle future variants gracefully
            },
        )
        .await
        .map_err(|e| format!("Evaluation failed: {}", e))?;

    progress_bar.finish_with_message("Complete");
    Ok(summary)
}

/// Output results in the requested format.
fn output_results(summary: &EvalSummary, args: &Args) -> Result<(), String> {
    match args.output.as_str() {
        "table" => {
            summary.print_summary();
            if let Some(path) = &args.output_file {
                summary
                    .write_json(path)
                    .map_err(|e| format!("Failed to write output file: {}", e))?;
                println!("\nDetailed results written to: {}", path.display());
            }
        }
        "json" => {
            let json = serde_json::to_string_pretty(summary)
                .map_err(|e| format!("Failed to serialize results: {}", e))?;

            if let Some(path) = &args.output_file {
                std::fs::write(path, &json)
                    .map_err(|e| format!("Failed to write output file: {}", e))?;
                eprintln!("Results written to: {}", path.display());
            } else {
                println!("{}", json);
            }
        }
        _ => unreachable!(), // Already validated
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    eprintln!("=== Sycophancy Evaluation ===");
    eprintln!("Truth map: {}", args.truth_map.display());
    eprintln!("Dataset: {}", args.dataset.display());
    eprintln!(
        "Mode: {}",
        if args.multi_turn {
            "multi-turn"
        } else {
            "single-turn"
        }
    );
    eprintln!(
        "Difficulty: {}",
        args.difficulty
            .map(|d| d.to_string())
            .unwrap_or_else(|| "all".to_string())
    );
    eprintln!(
        "Sample size: {}",
        args.sample
            .map(|s| s.to_string())
            .unwrap_or_else(|| "all".to_string())
    );
    eprintln!("Concurrency: {}", args.concurrency);
    eprintln!();

    match run_evaluation(&args).await {
        Ok(summary) => {
            if let Err(e) = output_results(&summary, &args) {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
