//! Multi-turn chat session.
//!
//! # Responsibility
//! - Hold the persona/temperature fixed at initialization.
//! - Keep committed turn history and send it with every new message.
//!
//! # Invariants
//! - History only grows in user/model pairs: a user turn is committed
//!   together with the reply recorded for it.
//! - A send that fails, or whose reply is never recorded, leaves history
//!   unchanged.

use super::{ChatBackend, ChatConfig, ChatRequest, ChatResult, ChatTurn, FragmentStream};
use log::debug;

/// Conversation state shared across sends to one backend.
pub struct ChatSession<B: ChatBackend> {
    backend: B,
    system_instruction: String,
    temperature: f32,
    history: Vec<ChatTurn>,
    pending_user_turn: Option<ChatTurn>,
}

impl<B: ChatBackend> ChatSession<B> {
    /// Starts an empty session using `config`'s persona and temperature.
    pub fn new(backend: B, config: &ChatConfig) -> Self {
        Self {
            backend,
            system_instruction: config.system_instruction.clone(),
            temperature: config.temperature,
            history: Vec::new(),
            pending_user_turn: None,
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Sends `message` and returns the reply as a fragment stream.
    ///
    /// The message becomes part of history once `record_reply` is called.
    pub async fn send_message_stream(&mut self, message: &str) -> ChatResult<FragmentStream> {
        let user_turn = ChatTurn::user(message);
        let mut contents = self.history.clone();
        contents.push(user_turn.clone());
        let request = ChatRequest {
            system_instruction: self.system_instruction.clone(),
            temperature: self.temperature,
            contents,
        };

        self.pending_user_turn = None;
        let stream = self.backend.stream_reply(&request).await?;
        self.pending_user_turn = Some(user_turn);
        Ok(stream)
    }

    /// Commits the last sent message and its accumulated reply to history.
    ///
    /// Does nothing when no send is pending. A blank reply discards the
    /// pending message instead; the service rejects empty history turns.
    pub fn record_reply(&mut self, reply: impl Into<String>) {
        let Some(user_turn) = self.pending_user_turn.take() else {
            return;
        };
        let reply = reply.into();
        if reply.trim().is_empty() {
            debug!("event=chat_history module=chat status=skipped reason=empty_reply");
            return;
        }
        self.history.push(user_turn);
        self.history.push(ChatTurn::model(reply));
        debug!(
            "event=chat_history module=chat status=ok turns={}",
            self.history.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::ChatSession;
    use crate::chat::{
        ChatBackend, ChatConfig, ChatError, ChatRequest, ChatResult, ChatRole, FragmentStream,
    };
    use async_trait::async_trait;
    use futures::{stream, StreamExt};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingBackend {
        requests: Arc<Mutex<Vec<ChatRequest>>>,
        reject: bool,
    }

    #[async_trait]
    impl ChatBackend for RecordingBackend {
        async fn stream_reply(&self, request: &ChatRequest) -> ChatResult<FragmentStream> {
            self.requests.lock().unwrap().push(request.clone());
            if self.reject {
                return Err(ChatError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(Box::pin(stream::iter(vec![Ok("ok".to_string())])))
        }
    }

    #[tokio::test]
    async fn sends_history_and_commits_after_reply() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let backend = RecordingBackend {
            requests: requests.clone(),
            reject: false,
        };
        let mut session = ChatSession::new(backend, &ChatConfig::default());

        let reply: Vec<_> = session.send_message_stream("first").await.unwrap().collect().await;
        assert_eq!(reply.len(), 1);
        assert!(session.history().is_empty());
        session.record_reply("ok");

        let _pending = session.send_message_stream("second").await.unwrap();
        let requests = requests.lock().unwrap();
        assert_eq!(requests[0].contents.len(), 1);
        assert_eq!(requests[1].contents.len(), 3);
        assert_eq!(requests[1].contents[1].role, ChatRole::Model);
        assert_eq!(requests[1].contents[2].text, "second");
        assert!((requests[1].temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn failed_send_leaves_history_untouched() {
        let backend = RecordingBackend {
            reject: true,
            ..RecordingBackend::default()
        };
        let mut session = ChatSession::new(backend, &ChatConfig::default());

        assert!(session.send_message_stream("hello").await.is_err());
        session.record_reply("ignored");
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn blank_reply_is_not_committed() {
        let mut session = ChatSession::new(RecordingBackend::default(), &ChatConfig::default());

        let _pending = session.send_message_stream("hello").await.unwrap();
        session.record_reply("  ");
        assert!(session.history().is_empty());

        session.record_reply("late");
        assert!(session.history().is_empty());
    }
}
