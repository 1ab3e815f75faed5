//! Conversation driver: runs one sample through the model under test.
//!
//! State machine per sample: the pre-built system + user conversation, one
//! generation for the opening prompt, then one user turn + generation per
//! scripted follow-up, strictly in metadata order. The driver suspends at
//! every generation call and never retries; failures propagate to the
//! harness for that sample only.

use crate::dataset::Sample;
use sycobench_core::{truncate, Generator, LlmError, LlmRequest, Role, Transcript, Turn};
use tokio_util::sync::CancellationToken;

/// The outcome of driving one sample to its terminal state.
#[derive(Debug, Clone)]
pub struct SolvedSample {
    /// The full dialog: system, opening prompt, and all exchanges.
    pub transcript: Transcript,

    /// Tokens used across all generation calls that reported usage.
    pub total_tokens: u32,

    /// Number of generation calls with no usage metadata.
    pub tokens_unavailable: usize,
}

/// Drives multi-turn exchanges with the model under test.
///
/// Within one sample all turns are strictly sequential; no two generation
/// calls for the same sample are ever in flight simultaneously. The harness
/// may run many drivers concurrently across samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationDriver;

impl ConversationDriver {
    /// Create a new driver.
    pub fn new() -> Self {
        Self
    }

    /// Run the sample's conversation to completion.
    ///
    /// Issues exactly `1 + followups.len()` generation calls. Checks the
    /// cancellation token before every call; once cancelled, no further
    /// follow-up turns are issued and `LlmError::Cancelled` is returned.
    pub async fn solve<G: Generator>(
        &self,
        sample: &Sample,
        generator: &G,
        cancellation: &CancellationToken,
    ) -> Result<SolvedSample, LlmError> {
        let mut transcript = Transcript::from_messages(sample.messages.clone());
        let mut total_tokens: u32 = 0;
        let mut tokens_unavailable = 0usize;

        log::debug!(
            "Driving sample {} ({} follow-ups)",
            sample.id,
            sample.metadata.followups.len()
        );

        // Opening turn: the sample's pre-built conversation already ends
        // with the rendered prompt as a user message.
        let generation = generator
            .generate_text(build_request(&transcript), cancellation)
            .await?;
        tally(&mut total_tokens, &mut tokens_unavailable, generation.tokens);
        transcript.push_assistant(generation.text);

        for followup in &sample.metadata.followups {
            if cancellation.is_cancelled() {
                log::debug!("Sample {} cancelled before follow-up", sample.id);
                return Err(LlmError::Cancelled);
            }

            log::trace!("Sample {}: follow-up '{}'", sample.id, truncate(followup, 50));
            transcript.push_user(followup);

            let generation = generator
                .generate_text(build_request(&transcript), cancellation)
                .await?;
            tally(&mut total_tokens, &mut tokens_unavailable, generation.tokens);
            transcript.push_assistant(generation.text);
        }

        Ok(SolvedSample {
            transcript,
            total_tokens,
            tokens_unavailable,
        })
    }
}

fn tally(total: &mut u32, unavailable: &mut usize, tokens: Option<u32>) {
    match tokens {
        Some(t) => *total = total.saturating_add(t),
        None => *unavailable += 1,
    }
}

/// Build the generation request for a transcript ending in a user turn.
///
/// The final user message becomes the request prompt; everything between the
/// system message and that final turn is replayed as structured history.
fn build_request(transcript: &Transcript) -> LlmRequest {
    let messages = transcript.messages();

    let prompt = messages
        .last()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .unwrap_or_default();

    let history: Vec<Turn> = messages[..messages.len().saturating_sub(1)]
        .iter()
        .filter_map(|m| match m.role {
            Role::User => Some(Turn::user(m.content.as_str())),
            Role::Assistant => Some(Turn::model(m.content.as_str())),
            Role::System => None,
        })
        .collect();

    let mut request = match transcript.system_instruction() {
        Some(system) => LlmRequest::with_system(prompt, system),
        None => LlmRequest::new(prompt),
    };

    if !history.is_empty() {
        request = request.with_turns(history);
    }

    request
}
