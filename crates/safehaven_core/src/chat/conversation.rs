//! Chat widget transcript state.
//!
//! # Responsibility
//! - Hold the ordered messages the chat widget renders.
//! - Drive one send: append the user message, stream the reply into a model
//!   placeholder, and flag failures inline.
//!
//! # Invariants
//! - The transcript always starts with the companion greeting.
//! - A failed send appends exactly one error-flagged message and never
//!   returns an error to the caller.

use super::{ChatBackend, ChatError, ChatRole, ChatSession};
use futures::StreamExt;
use log::{error, warn};

pub const GREETING: &str =
    "Hi, I'm Haven. I'm here to listen and support you emotionally. How are you feeling today?";
pub const CONNECTION_TROUBLE: &str =
    "I'm having trouble connecting right now. Please try again later.";

/// One rendered transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub is_error: bool,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            is_error: false,
        }
    }

    fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            is_error: false,
        }
    }

    fn connection_trouble() -> Self {
        Self {
            role: ChatRole::Model,
            text: CONNECTION_TROUBLE.to_string(),
            is_error: true,
        }
    }
}

/// Transcript plus the session that produces replies.
pub struct Conversation<B: ChatBackend> {
    session: Option<ChatSession<B>>,
    messages: Vec<ChatMessage>,
}

impl<B: ChatBackend> Conversation<B> {
    /// Wraps the outcome of session initialization.
    ///
    /// A failed initialization is logged once; every later send then shows
    /// the connection-trouble message.
    pub fn new(session: Result<ChatSession<B>, ChatError>) -> Self {
        let session = match session {
            Ok(session) => Some(session),
            Err(err) => {
                error!("event=chat_init module=chat status=error error={err}");
                None
            }
        };
        Self {
            session,
            messages: vec![ChatMessage::model(GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn session(&self) -> Option<&ChatSession<B>> {
        self.session.as_ref()
    }

    /// Sends `input` and streams the reply into the transcript.
    ///
    /// `on_update` receives the accumulated reply after every fragment.
    /// Returns `false` (and changes nothing) for blank input.
    pub async fn send(&mut self, input: &str, mut on_update: impl FnMut(&str)) -> bool {
        if input.trim().is_empty() {
            return false;
        }
        self.messages.push(ChatMessage::user(input));

        let Some(session) = self.session.as_mut() else {
            self.messages.push(ChatMessage::connection_trouble());
            return true;
        };

        self.messages.push(ChatMessage::model(""));
        let placeholder = self.messages.len() - 1;

        let mut stream = match session.send_message_stream(input).await {
            Ok(stream) => stream,
            Err(err) => {
                warn!("event=chat_send module=chat status=error error={err}");
                self.fail(placeholder);
                return true;
            }
        };

        let mut reply = String::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    reply.push_str(&fragment);
                    self.messages[placeholder].text.clone_from(&reply);
                    on_update(&reply);
                }
                Err(err) => {
                    warn!(
                        "event=chat_stream module=chat status=error received_chars={} error={err}",
                        reply.chars().count()
                    );
                    self.fail(placeholder);
                    return true;
                }
            }
        }

        if reply.trim().is_empty() {
            warn!("event=chat_stream module=chat status=error reason=empty_reply");
            self.fail(placeholder);
            return true;
        }
        session.record_reply(reply);
        true
    }

    /// Drops a blank placeholder and appends the error message.
    fn fail(&mut self, placeholder: usize) {
        if self.messages[placeholder].text.trim().is_empty() {
            self.messages.remove(placeholder);
        }
        self.messages.push(ChatMessage::connection_trouble());
    }
}

#[cfg(test)]
mod tests {
    use super::{Conversation, CONNECTION_TROUBLE, GREETING};
    use crate::chat::{
        ChatBackend, ChatConfig, ChatError, ChatRequest, ChatResult, ChatRole, ChatSession,
        FragmentStream,
    };
    use async_trait::async_trait;
    use futures::stream;

    struct ScriptedBackend {
        items: Vec<Result<&'static str, ()>>,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn stream_reply(&self, _request: &ChatRequest) -> ChatResult<FragmentStream> {
            let items: Vec<ChatResult<String>> = self
                .items
                .iter()
                .map(|item| match item {
                    Ok(text) => Ok(text.to_string()),
                    Err(()) => Err(ChatError::Api {
                        status: 500,
                        message: "broken".to_string(),
                    }),
                })
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn conversation(items: Vec<Result<&'static str, ()>>) -> Conversation<ScriptedBackend> {
        let session = ChatSession::new(ScriptedBackend { items }, &ChatConfig::default());
        Conversation::new(Ok(session))
    }

    #[tokio::test]
    async fn streams_reply_into_placeholder() {
        let mut chat = conversation(vec![Ok("Hel"), Ok("lo")]);
        let mut updates = Vec::new();

        assert!(chat.send("hi", |text| updates.push(text.to_string())).await);
        assert_eq!(updates, vec!["Hel", "Hello"]);
        let messages = chat.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].text, GREETING);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[2].text, "Hello");
        assert!(!messages[2].is_error);
        assert_eq!(chat.session().unwrap().history().len(), 2);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let mut chat = conversation(vec![Ok("unused")]);
        assert!(!chat.send("   ", |_| {}).await);
        assert_eq!(chat.messages().len(), 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_partial_text_and_flags_error() {
        let mut chat = conversation(vec![Ok("partial"), Err(())]);
        assert!(chat.send("hi", |_| {}).await);

        let messages = chat.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].text, "partial");
        assert_eq!(messages[3].text, CONNECTION_TROUBLE);
        assert!(messages[3].is_error);
        assert!(chat.session().unwrap().history().is_empty());
    }

    #[tokio::test]
    async fn failed_initialization_reports_trouble_on_send() {
        let mut chat: Conversation<ScriptedBackend> = Conversation::new(Err(ChatError::MissingApiKey));
        assert!(chat.send("hello", |_| {}).await);

        let messages = chat.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[2].is_error);
        assert_eq!(messages[2].text, CONNECTION_TROUBLE);
    }
}
