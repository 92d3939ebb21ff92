pub mod gemini;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// How many fragments the producer may run ahead of the consumer.
const FRAGMENT_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// Backend seam for the two calls the application makes.
///
/// The production implementation is [`gemini::GeminiClient`]; tests swap in
/// a scripted generator.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// One-shot structured-output call. Returns the raw JSON text the model
    /// produced for the given schema; the caller validates the shape.
    async fn generate_json(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<String, LlmError>;

    /// Open a streaming generation request. Fragments arrive through the
    /// returned stream in emission order.
    async fn stream_answer(
        &self,
        system_instruction: &str,
        turns: Vec<ChatMessage>,
    ) -> Result<AnswerStream, LlmError>;
}

/// A finite, ordered sequence of generated text fragments.
///
/// The producer side pushes fragments as they arrive off the wire and hangs
/// up when the response completes, so `next` returns `None` exactly once the
/// stream is exhausted. A transport failure mid-stream surfaces as a final
/// `Err` item; fragments already yielded stay valid and are never retracted.
/// Dropping the stream is the only form of cancellation.
pub struct AnswerStream {
    rx: mpsc::Receiver<Result<String, LlmError>>,
}

impl AnswerStream {
    /// Create a paired sender and stream. The stream ends when the sender
    /// is dropped.
    pub fn channel() -> (mpsc::Sender<Result<String, LlmError>>, AnswerStream) {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        (tx, AnswerStream { rx })
    }

    /// Next fragment in arrival order, or `None` once the stream is done.
    pub async fn next(&mut self) -> Option<Result<String, LlmError>> {
        self.rx.recv().await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}
