//! Streaming chat companion client.
//!
//! # Responsibility
//! - Define the backend contract for streamed conversational completions.
//! - Keep persona, temperature and turn history in a `ChatSession`.
//! - Keep the transcript the chat widget renders in a `Conversation`.
//!
//! # Invariants
//! - A fragment stream is lazy, finite and cannot be restarted; dropping it
//!   cancels the underlying request.
//! - Chat failures never escape `Conversation`; they become error-flagged
//!   transcript messages.

pub mod conversation;
pub mod gemini;
pub mod session;
pub mod sse;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::pin::Pin;
use std::sync::Arc;

pub use conversation::{ChatMessage, Conversation};
pub use gemini::GeminiBackend;
pub use session::ChatSession;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_CHAT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// System instruction for the "Haven" support companion.
pub const HAVEN_PERSONA: &str = "You are a compassionate, empathetic, and safe mental health \
support companion named 'Haven'. Your goal is to provide emotional support, listen actively, \
and offer gentle coping strategies for stress, anxiety, or trauma. You are NOT a doctor or a \
crisis hotline. If a user indicates they are in immediate danger, self-harming, or facing a \
life-threatening emergency, you must gently but firmly encourage them to contact local \
emergency services immediately (like 911 or local helplines). Keep your tone warm, \
non-judgmental, and supportive. Keep responses concise and readable.";

pub type ChatResult<T> = Result<T, ChatError>;

/// Incremental text pieces of one streamed reply.
pub type FragmentStream = Pin<Box<dyn Stream<Item = ChatResult<String>> + Send>>;

#[derive(Debug)]
pub enum ChatError {
    /// No credential was configured for the completion service.
    MissingApiKey,
    Transport(reqwest::Error),
    /// The service rejected the request or reported an in-stream error.
    Api { status: u16, message: String },
    /// A streamed event was not valid JSON of the expected shape.
    Decode(serde_json::Error),
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(
                f,
                "missing chat API key; set API_KEY, VITE_API_KEY or REACT_APP_API_KEY"
            ),
            Self::Transport(err) => write!(f, "chat request failed: {err}"),
            Self::Api { status, message } => write!(f, "chat service error {status}: {message}"),
            Self::Decode(err) => write!(f, "chat stream could not be decoded: {err}"),
        }
    }
}

impl Error for ChatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::MissingApiKey | Self::Api { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

/// One committed turn of session history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Everything a backend needs to produce the next reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub temperature: f32,
    /// Prior turns followed by the new user turn.
    pub contents: Vec<ChatTurn>,
}

/// Streamed conversational completion service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn stream_reply(&self, request: &ChatRequest) -> ChatResult<FragmentStream>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn stream_reply(&self, request: &ChatRequest) -> ChatResult<FragmentStream> {
        (**self).stream_reply(request).await
    }
}

/// Chat client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub system_instruction: String,
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_CHAT_MODEL.to_string(),
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            system_instruction: HAVEN_PERSONA.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}
