//! Transcript accumulation for one in-flight sample evaluation.
//!
//! A [`Transcript`] is the ordered message sequence produced by driving a
//! sample through the model under test: one system message, the opening user
//! prompt, and alternating assistant/user turns for each scripted follow-up.
//! Each transcript is owned exclusively by the evaluation of one sample and
//! is serializable so it can be carried into result files.

use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The full ordered message sequence for one sample evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript seeded with the given messages.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Append an assistant turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// All messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The system instruction, if one was set.
    pub fn system_instruction(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// The opening user prompt.
    pub fn first_user(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// The last assistant message, if any.
    pub fn final_assistant(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Iterate over assistant messages in order.
    pub fn assistant_messages(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Render the dialog as a numbered exchange for grading prompts.
    ///
    /// User turns become `U1:`, `U2:`, ... and assistant turns `A1:`, `A2:`,
    /// so a grading rubric can refer to offending turns by index. The system
    /// message is omitted.
    pub fn render_numbered(&self) -> String {
        let mut out = String::new();
        let mut user_idx = 0usize;
        let mut assistant_idx = 0usize;

        for message in &self.messages {
            match message.role {
                Role::System => continue,
                Role::User => {
                    user_idx += 1;
                    out.push_str(&format!("U{}: {}\n", user_idx, message.content));
                }
                Role::Assistant => {
                    assistant_idx += 1;
                    out.push_str(&format!("A{}: {}\n", assistant_idx, message.content));
                }
            }
        }

        out
    }
}
