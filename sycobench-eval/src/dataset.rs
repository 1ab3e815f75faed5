//! Dataset loading and sample construction.
//!
//! Raw records arrive as one JSON object per line: a rendered prompt (a
//! false claim wrapped in persuasive framing) plus the statement/modifier
//! identifiers, category tags, an optional difficulty, and an optional list
//! of follow-up prompts. This module converts them into normalized
//! [`Sample`]s with the canonical truth resolved from a [`TruthStore`].

use crate::truth::TruthStore;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use sycobench_core::Message;
use thiserror::Error;
use tokio::fs;

/// System prompt placed at the head of every sample's conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Errors that can occur when loading datasets.
///
/// All variants are fatal for the whole load: evaluation over a silently
/// truncated dataset would produce misleading aggregate metrics.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// Failed to read an input file
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The truth map file was not a JSON object of strings
    #[error("Failed to parse truth map: {0}")]
    Truth(String),

    /// A single record line did not parse
    #[error("Malformed record on line {line}: {source}")]
    Record {
        line: usize,
        source: serde_json::Error,
    },
}

/// Difficulty tag carried by multi-turn records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    L1,
    L2,
    L3,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::L1 => write!(f, "L1"),
            Difficulty::L2 => write!(f, "L2"),
            Difficulty::L3 => write!(f, "L3"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L1" => Ok(Difficulty::L1),
            "L2" => Ok(Difficulty::L2),
            "L3" => Ok(Difficulty::L3),
            other => Err(format!("Unknown difficulty '{}'. Use L1, L2, or L3.", other)),
        }
    }
}

/// One raw input record, as found on a line of the prompt file.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    /// Id of the statement whose false version the prompt asserts
    #[serde(deserialize_with = "de_id")]
    pub statement_id: String,

    /// Id of the persuasive framing applied to the false claim
    #[serde(deserialize_with = "de_id")]
    pub modifier_id: String,

    /// Persuasion technique and intensity, e.g. "Authority-L2"
    #[serde(default)]
    pub modifier_category: String,

    /// Topic category of the underlying statement
    #[serde(default)]
    pub statement_category: String,

    /// The rendered prompt: false claim plus framing
    #[serde(default)]
    pub prompt: String,

    /// Difficulty tag (multi-turn datasets only)
    #[serde(default)]
    pub difficulty: Option<Difficulty>,

    /// Scripted follow-up prompts; any non-list shape means "no follow-ups"
    #[serde(default)]
    pub followups: Option<serde_json::Value>,
}

/// Accept ids as JSON strings or numbers; upstream files mix both.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// How sample ids are built from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStyle {
    /// `{statement_id}_{modifier_id}`, the multi-turn naming
    Plain,
    /// `{statement_id}_{modifier_id}_{c}` with `c` the first character of
    /// the modifier category, the single-turn naming
    CategorySuffix,
}

/// The normalized evaluation unit derived from a [`Record`].
///
/// Created once at dataset-load time; never mutated afterwards. The
/// conversation driver reads `messages` and `metadata.followups`; the grader
/// reads `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Stable composite identifier (statement x modifier [x category prefix])
    pub id: String,

    /// Initial conversation: one system message, one user message
    pub messages: Vec<Message>,

    /// The canonical truth for the statement, or empty if unknown.
    /// Never the false/modified claim.
    pub target: String,

    /// Category tags, difficulty, and scripted follow-ups
    pub metadata: SampleMetadata,
}

/// Metadata bag carried by each sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub statement_id: String,
    pub modifier_id: String,
    pub statement_category: String,
    pub modifier_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub followups: Vec<String>,
}

impl Record {
    /// The stable sample id for this record under the given naming style.
    ///
    /// Two records with identical statement, modifier, and category prefix
    /// collide by design; they are the same logical test case.
    pub fn sample_id(&self, style: IdStyle) -> String {
        match style {
            IdStyle::Plain => format!("{}_{}", self.statement_id, self.modifier_id),
            IdStyle::CategorySuffix => match self.modifier_category.chars().next() {
                Some(c) => format!("{}_{}_{}", self.statement_id, self.modifier_id, c),
                None => format!("{}_{}", self.statement_id, self.modifier_id),
            },
        }
    }

    /// Convert this record into a [`Sample`], resolving the target against
    /// the truth store.
    ///
    /// A statement id absent from the store yields an empty target, never an
    /// error.
    pub fn into_sample(self, truth: &TruthStore, style: IdStyle, system_prompt: &str) -> Sample {
        let id = self.sample_id(style);
        let target = truth.target_for(&self.statement_id);
        let followups = normalize_followups(self.followups.as_ref());

        Sample {
            id,
            messages: vec![Message::system(system_prompt), Message::user(&self.prompt)],
            target,
            metadata: SampleMetadata {
                statement_id: self.statement_id,
                modifier_id: self.modifier_id,
                statement_category: self.statement_category,
                modifier_category: self.modifier_category,
                difficulty: self.difficulty,
                followups,
            },
        }
    }
}

/// Normalize the raw `followups` field into a clean ordered list.
///
/// Only a JSON array is accepted; any other shape is treated as "no
/// follow-ups". Entries are coerced to strings and trimmed, and
/// empty-after-trim entries are dropped. Order of the survivors is
/// preserved. This guards against malformed upstream data without failing
/// the whole record.
fn normalize_followups(value: Option<&serde_json::Value>) -> Vec<String> {
    let Some(serde_json::Value::Array(entries)) = value else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let text = match entry {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Trait for evaluation datasets.
///
/// Implement this trait to feed the harness from a custom source.
pub trait Dataset: Send + Sync {
    /// The name of this dataset (used in reports).
    fn name(&self) -> &str;

    /// Load samples from the dataset.
    ///
    /// If `sample_size` is specified, return at most that many samples.
    fn load(
        &self,
        sample_size: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Sample>, DatasetError>> + Send;
}

/// Per-record predicate applied before sample conversion.
type RecordFilter = Box<dyn Fn(&Record) -> bool + Send + Sync>;

/// A prompt dataset loaded from a JSONL file.
///
/// Each line holds one JSON record. A malformed line fails the whole load;
/// blank lines are skipped. An optional filter supports cheap sub-dataset
/// construction (e.g. only difficulty L2) without duplicating files.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sycobench_eval::{Dataset, Difficulty, JsonlPromptDataset, TruthStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let truth = Arc::new(TruthStore::load("data/truth_map.json").await?);
/// let dataset = JsonlPromptDataset::multi_turn("data/multiturn.jsonl", truth)
///     .with_difficulty(Difficulty::L2);
///
/// let samples = dataset.load(None).await?;
/// println!("Loaded {} samples", samples.len());
/// # Ok(())
/// # }
/// ```
pub struct JsonlPromptDataset {
    path: PathBuf,
    name: String,
    truth: std::sync::Arc<TruthStore>,
    style: IdStyle,
    system_prompt: String,
    filter: Option<RecordFilter>,
}

impl JsonlPromptDataset {
    /// Create a single-turn dataset (category-suffixed sample ids).
    pub fn single_turn(path: impl Into<PathBuf>, truth: std::sync::Arc<TruthStore>) -> Self {
        Self::with_style(path, truth, IdStyle::CategorySuffix)
    }

    /// Create a multi-turn dataset (plain sample ids, follow-ups honored).
    pub fn multi_turn(path: impl Into<PathBuf>, truth: std::sync::Arc<TruthStore>) -> Self {
        Self::with_style(path, truth, IdStyle::Plain)
    }

    fn with_style(
        path: impl Into<PathBuf>,
        truth: std::sync::Arc<TruthStore>,
        style: IdStyle,
    ) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("prompts")
            .to_string();

        Self {
            path,
            name,
            truth,
            style,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            filter: None,
        }
    }

    /// Set a custom dataset name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the system prompt seeded into each sample's conversation.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Keep only records matching the predicate.
    #[must_use]
    pub fn with_filter(
        mut self,
        filter: impl Fn(&Record) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Keep only records with the given difficulty tag.
    #[must_use]
    pub fn with_difficulty(self, difficulty: Difficulty) -> Self {
        self.with_filter(move |record| record.difficulty == Some(difficulty))
    }
}

impl Dataset for JsonlPromptDataset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, sample_size: Option<usize>) -> Result<Vec<Sample>, DatasetError> {
        let content = fs::read_to_string(&self.path).await?;
        let records = Self::parse_records(&content)?;

        let mut samples: Vec<Sample> = records
            .into_iter()
            .filter(|record| self.filter.as_ref().map_or(true, |f| f(record)))
            .map(|record| record.into_sample(&self.truth, self.style, &self.system_prompt))
            .collect();

        if let Some(size) = sample_size {
            samples.truncate(size);
        }

        log::info!("Loaded {} samples from {:?}", samples.len(), self.path);
        Ok(samples)
    }
}

impl JsonlPromptDataset {
    /// Parse raw records from JSONL content.
    ///
    /// Blank lines are skipped; a malformed line fails the whole parse with
    /// its 1-based line number.
    pub fn parse_records(content: &str) -> Result<Vec<Record>, DatasetError> {
        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(line).map_err(|source| {
                DatasetError::Record {
                    line: idx + 1,
                    source,
                }
            })?;
            records.push(record);
        }
        Ok(records)
    }
}
