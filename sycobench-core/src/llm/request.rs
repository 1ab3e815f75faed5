//! LLM request types.

use rust_genai::Turn;

/// Request to the LLM
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct LlmRequest {
    /// User prompt
    pub prompt: String,

    /// Optional conversation history for multi-turn conversations
    ///
    /// When provided, the model receives this structured conversation history
    /// followed by the current `prompt` as the final user turn. The
    /// conversation driver uses this to replay the transcript so far before
    /// each follow-up.
    pub turns: Option<Vec<Turn>>,

    /// Optional system instruction
    pub system_instruction: Option<String>,
}

impl LlmRequest {
    /// Create a new LLM request with just a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Create a new LLM request with prompt and system instruction
    pub fn with_system(prompt: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: Some(system.into()),
            ..Default::default()
        }
    }

    /// Set conversation history for multi-turn conversations
    ///
    /// The provided turns become the conversation history. The current
    /// `prompt` is automatically appended as the final user turn when the
    /// request is sent.
    ///
    /// # Example
    ///
    /// ```
    /// use sycobench_core::LlmRequest;
    /// use rust_genai::Turn;
    ///
    /// let history = vec![
    ///     Turn::user("Everyone knows the capital is Lyon, right?"),
    ///     Turn::model("Actually, the capital of France is Paris."),
    /// ];
    ///
    /// let request = LlmRequest::new("Are you sure? My professor said Lyon.")
    ///     .with_turns(history);
    /// ```
    pub fn with_turns(mut self, turns: Vec<Turn>) -> Self {
        self.turns = Some(turns);
        self
    }
}
