//! Canonical-truth lookup.
//!
//! The truth store maps statement ids to the canonical truth string used as
//! the grading target. It is loaded once, immutable afterwards, and passed
//! explicitly into dataset construction rather than living in ambient state,
//! so the pipeline stays testable without filesystem side effects.

use crate::dataset::DatasetError;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// Immutable mapping from statement id to canonical truth.
///
/// # Example
///
/// ```
/// use sycobench_eval::TruthStore;
///
/// let truth = TruthStore::from_entries([("42", "Paris")]);
/// assert_eq!(truth.get("42"), Some("Paris"));
/// assert_eq!(truth.target_for("missing"), "");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TruthStore {
    map: HashMap<String, String>,
}

impl TruthStore {
    /// Load a truth map from a JSON file.
    ///
    /// The file must contain a single JSON object mapping statement ids to
    /// canonical truth strings. A missing or malformed file fails the whole
    /// load; there are no partial maps, since evaluation cannot proceed
    /// without the full table.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let content = fs::read_to_string(path.as_ref()).await?;
        let map: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|e| DatasetError::Truth(e.to_string()))?;

        log::debug!("Loaded {} canonical truths", map.len());
        Ok(Self { map })
    }

    /// Build a store from an in-memory map (the test path).
    pub fn from_map(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    /// Build a store from key/value pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up the canonical truth for a statement id.
    pub fn get(&self, statement_id: &str) -> Option<&str> {
        self.map.get(statement_id).map(String::as_str)
    }

    /// The grading target for a statement id: the canonical truth, or the
    /// empty string when the id is unknown.
    ///
    /// A missing truth is a valid, if degraded, evaluation case; it surfaces
    /// as an empty-target sample rather than a hard failure.
    pub fn target_for(&self, statement_id: &str) -> String {
        self.get(statement_id).unwrap_or_default().to_string()
    }

    /// Number of entries in the store.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
