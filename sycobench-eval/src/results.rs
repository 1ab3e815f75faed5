//! Evaluation results and summary types.
//!
//! Output types for evaluation runs, designed for JSON serialization and
//! programmatic consumption by the hosting runner.

use crate::dataset::{Sample, SampleMetadata};
use crate::grader::{Grade, Verdict};
use crate::solver::SolvedSample;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sycobench_core::Transcript;

/// Result of evaluating a single sample.
///
/// Either graded (transcript plus verdict) or failed (error string, with the
/// transcript attached when the conversation completed but grading did not).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleResult {
    /// Sample identifier
    pub sample_id: String,

    /// The rendered prompt the model was shown
    pub prompt: String,

    /// The canonical truth the transcript was graded against
    pub target: String,

    /// Category tags, difficulty, and follow-ups
    pub metadata: SampleMetadata,

    /// The full dialog, when the conversation completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,

    /// The grade, when grading succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,

    /// The grading model's rationale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    /// Tokens used driving this sample (0 if unreported)
    pub total_tokens: u32,

    /// Error message if the sample failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SampleResult {
    /// Create a graded result.
    pub fn graded(sample: &Sample, solved: SolvedSample, verdict: Verdict) -> Self {
        Self {
            sample_id: sample.id.clone(),
            prompt: first_user_prompt(sample),
            target: sample.target.clone(),
            metadata: sample.metadata.clone(),
            transcript: Some(solved.transcript),
            grade: Some(verdict.grade),
            rationale: Some(verdict.rationale),
            total_tokens: solved.total_tokens,
            error: None,
        }
    }

    /// Create a failed result.
    ///
    /// `transcript` is present when the conversation completed but grading
    /// failed (e.g. a `GRADE:` tag never appeared in the grader output).
    pub fn failed(
        sample: &Sample,
        transcript: Option<Transcript>,
        error: String,
        total_tokens: u32,
    ) -> Self {
        Self {
            sample_id: sample.id.clone(),
            prompt: first_user_prompt(sample),
            target: sample.target.clone(),
            metadata: sample.metadata.clone(),
            transcript,
            grade: None,
            rationale: None,
            total_tokens,
            error: Some(error),
        }
    }

    /// Whether this sample was graded.
    pub fn is_graded(&self) -> bool {
        self.grade.is_some() && self.error.is_none()
    }

    /// The numeric score of the grade, if graded.
    pub fn score(&self) -> Option<f64> {
        self.grade.map(|g| g.value())
    }
}

fn first_user_prompt(sample: &Sample) -> String {
    sample
        .messages
        .iter()
        .find(|m| m.role == sycobench_core::Role::User)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

/// Per-grade counts across a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GradeCounts {
    pub correct: usize,
    pub partial: usize,
    pub incorrect: usize,
}

/// Summary of an entire evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    /// Name of the dataset used
    pub dataset_name: String,

    /// Name of the grader applied
    pub grader_name: String,

    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of samples that were graded
    pub graded: usize,

    /// Number of samples that failed (generation or grading)
    pub failed: usize,

    /// Mean grade value over graded samples (partial credit: C=1, P=0.5, I=0)
    pub accuracy: f64,

    /// Standard error of the mean grade value
    pub stderr: f64,

    /// How many samples landed on each grade
    pub grade_counts: GradeCounts,

    /// Individual results for each sample
    pub results: Vec<SampleResult>,

    /// Total tokens used across all samples
    pub total_tokens: u32,

    /// Total duration of the evaluation
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl EvalSummary {
    /// Create a summary from evaluation results.
    pub fn from_results(
        dataset_name: String,
        grader_name: String,
        results: Vec<SampleResult>,
        total_duration: Duration,
    ) -> Self {
        let total_samples = results.len();
        let graded = results.iter().filter(|r| r.is_graded()).count();
        let failed = total_samples - graded;

        let scores: Vec<f64> = results.iter().filter_map(|r| r.score()).collect();
        let accuracy = mean(&scores);
        let stderr = standard_error(&scores);

        let mut grade_counts = GradeCounts::default();
        for result in &results {
            match result.grade {
                Some(Grade::Correct) => grade_counts.correct += 1,
                Some(Grade::Partial) => grade_counts.partial += 1,
                Some(Grade::Incorrect) => grade_counts.incorrect += 1,
                None => {}
            }
        }

        let total_tokens: u32 = results
            .iter()
            .map(|r| r.total_tokens)
            .fold(0, u32::saturating_add);

        Self {
            dataset_name,
            grader_name,
            total_samples,
            graded,
            failed,
            accuracy,
            stderr,
            grade_counts,
            results,
            total_tokens,
            total_duration,
        }
    }

    /// Print a summary to stdout.
    pub fn print_summary(&self) {
        println!();
        println!("=== Sycophancy Evaluation Summary ===");
        println!("Dataset: {}", self.dataset_name);
        println!("Grader: {}", self.grader_name);
        println!();
        println!(
            "Samples: {} total, {} graded, {} failed",
            self.total_samples, self.graded, self.failed
        );
        println!(
            "Grades: {} correct, {} partial, {} incorrect",
            self.grade_counts.correct, self.grade_counts.partial, self.grade_counts.incorrect
        );
        println!("Accuracy: {:.3} (stderr {:.3})", self.accuracy, self.stderr);
        println!();
        println!("Tokens: {}", self.total_tokens);
        println!("Duration: {:.1}s", self.total_duration.as_secs_f64());
    }

    /// Write the summary to a JSON file.
    pub fn write_json(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Mean of the scores; 0.0 when none were graded.
fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Standard error of the mean, using the sample standard deviation.
///
/// Zero when fewer than two samples were graded.
fn standard_error(scores: &[f64]) -> f64 {
    let n = scores.len();
    if n < 2 {
        return 0.0;
    }

    let m = mean(scores);
    let variance = scores.iter().map(|s| (s - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    (variance / n as f64).sqrt()
}

/// Custom serde for Duration to serialize as seconds (f64).
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
