//! Gemini `streamGenerateContent` backend.
//!
//! # Responsibility
//! - Translate a `ChatRequest` into the Gemini REST request body.
//! - Decode the SSE response into text fragments as they arrive.
//!
//! # Invariants
//! - The API key travels in the `x-goog-api-key` header, never in the URL.
//! - Events without text (safety/usage metadata) produce no fragment.

use super::sse::SseDecoder;
use super::{ChatBackend, ChatConfig, ChatError, ChatRequest, ChatResult, FragmentStream};
use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody<'a> {
    contents: Vec<WireContent<'a>>,
    system_instruction: WireContent<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [WirePart<'a>; 1],
}

#[derive(Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u16>,
    message: Option<String>,
}

/// Streaming client for the Gemini generative language API.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    stream_url: String,
}

impl GeminiBackend {
    /// Builds a backend from `config`.
    ///
    /// # Errors
    /// - `MissingApiKey` when no non-blank key is configured.
    /// - `Transport` when the HTTP client cannot be constructed.
    pub fn new(config: &ChatConfig) -> ChatResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ChatError::MissingApiKey)?
            .to_string();
        // No overall timeout: a reply may legitimately stream for a while.
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            stream_url: stream_url(&config.endpoint, &config.model),
        })
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn stream_reply(&self, request: &ChatRequest) -> ChatResult<FragmentStream> {
        let response = self
            .client
            .post(&self.stream_url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "event=chat_send module=chat status=error http_status={}",
                status.as_u16()
            );
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        debug!("event=chat_send module=chat status=ok turns={}", request.contents.len());

        Ok(decode_fragments(response.bytes_stream()))
    }
}

fn stream_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/models/{}:streamGenerateContent?alt=sse",
        endpoint.trim().trim_end_matches('/'),
        model.trim()
    )
}

fn request_body(request: &ChatRequest) -> GenerateContentBody<'_> {
    GenerateContentBody {
        contents: request
            .contents
            .iter()
            .map(|turn| WireContent {
                role: Some(turn.role.as_str()),
                parts: [WirePart { text: &turn.text }],
            })
            .collect(),
        system_instruction: WireContent {
            role: None,
            parts: [WirePart {
                text: &request.system_instruction,
            }],
        },
        generation_config: GenerationConfig {
            temperature: request.temperature,
        },
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(message) = envelope.error.message {
            return message;
        }
    }
    let mut message: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        message.push_str("...");
    }
    message
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<ChatResult<String>>,
    done: bool,
}

impl<S> DecodeState<S> {
    fn enqueue(&mut self, events: Vec<String>) {
        self.pending
            .extend(events.iter().filter_map(|data| fragment_from_event(data)));
    }
}

/// Turns a raw SSE byte stream into text fragments.
///
/// The stream ends after the first transport error.
pub(crate) fn decode_fragments<S, T, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: AsRef<[u8]> + Send + 'static,
    E: Into<ChatError> + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.enqueue(events);
                }
                Some(Err(err)) => {
                    state.pending.push_back(Err(err.into()));
                    state.done = true;
                }
                None => {
                    let events = state.decoder.finish();
                    state.enqueue(events);
                    state.done = true;
                }
            }
        }
    }))
}

fn fragment_from_event(data: &str) -> Option<ChatResult<String>> {
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(err) => return Some(Err(ChatError::Decode(err))),
    };
    if let Some(error) = chunk.error {
        return Some(Err(ChatError::Api {
            status: error.code.unwrap_or(500),
            message: error.message.unwrap_or_default(),
        }));
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .take(1)
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(Ok(text))
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_fragments, request_body, stream_url, GeminiBackend};
    use crate::chat::{ChatConfig, ChatError, ChatRequest, ChatTurn};
    use futures::{stream, StreamExt};

    fn sse_event(text: &str) -> String {
        format!(
            "data: {{\"candidates\":[{{\"content\":{{\"role\":\"model\",\"parts\":[{{\"text\":\"{text}\"}}]}}}}]}}\r\n\r\n"
        )
    }

    #[test]
    fn missing_or_blank_api_key_is_rejected() {
        let config = ChatConfig::default();
        assert!(matches!(
            GeminiBackend::new(&config),
            Err(ChatError::MissingApiKey)
        ));
        let blank = ChatConfig {
            api_key: Some("  ".to_string()),
            ..ChatConfig::default()
        };
        assert!(matches!(
            GeminiBackend::new(&blank),
            Err(ChatError::MissingApiKey)
        ));
    }

    #[test]
    fn stream_url_targets_sse_endpoint() {
        assert_eq!(
            stream_url("https://example.test/v1beta/", "gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn request_body_carries_history_persona_and_temperature() {
        let request = ChatRequest {
            system_instruction: "persona".to_string(),
            temperature: 0.5,
            contents: vec![
                ChatTurn::user("hi"),
                ChatTurn::model("hello"),
                ChatTurn::user("how are you"),
            ],
        };
        let json = serde_json::to_value(request_body(&request)).unwrap();
        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "how are you");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "persona");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[tokio::test]
    async fn decodes_fragments_across_chunk_boundaries() {
        let body = format!("{}{}", sse_event("Hello"), sse_event(", friend"));
        let (head, tail) = body.split_at(17);
        let chunks = vec![
            Ok::<_, ChatError>(head.as_bytes().to_vec()),
            Ok(tail.as_bytes().to_vec()),
        ];

        let fragments: Vec<String> = decode_fragments(stream::iter(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["Hello", ", friend"]);
    }

    #[tokio::test]
    async fn skips_events_without_text_and_surfaces_api_errors() {
        let body = "data: {\"candidates\":[],\"usageMetadata\":{}}\n\n\
                    data: {\"error\":{\"code\":429,\"message\":\"quota\"}}\n\n";
        let chunks = vec![Ok::<_, ChatError>(body.as_bytes().to_vec())];

        let items: Vec<_> = decode_fragments(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(ChatError::Api { status: 429, message }) if message == "quota"
        ));
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let chunks = vec![
            Ok(sse_event("partial").into_bytes()),
            Err(ChatError::MissingApiKey),
            Ok(sse_event("never").into_bytes()),
        ];

        let items: Vec<_> = decode_fragments(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(items[1].is_err());
    }
}
