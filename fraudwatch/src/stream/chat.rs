use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, pin::Pin};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{config::ChatConfig, domain::prelude::*};

/// Instruction sent with every conversation turn.
pub const SYSTEM_INSTRUCTION: &str = r#"
You are "Anomalyse", a fraud support assistant.

**Style & Tone:**
- **Concise:** Keep responses UNDER 50 words.
- **Direct:** Use active voice.
- **Interactive:** Ask a question at the end to guide the next step.

**Flow:**
1. **User Choice:** The user will tell you what they want to do (Freeze, Transactions, or Contact).
2. **If 'Freeze':** Guide them to Card Settings > Freeze. Then ask: "Did you find the freeze button?"
3. **If 'Transactions':** Ask them to check the last 24 hours of activity. Then ask: "Do you see any charges you didn't make?"
4. **If 'Contact':** Provide number 1-800-942-8812.
5. **If Undecided:** Recommend freezing the card first as a safety precaution.

**Rules:**
- Do NOT ask for alert details.
- Do NOT ask for personal info.
"#;

/// Ordered text fragments of one model reply.
///
/// The stream ends after the last fragment, or right after the first `Err`
/// item. Dropping it abandons whatever has not arrived yet.
///
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat API key is missing, set GEMINI_API_KEY")]
    MissingApiKey,
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("chat stream interrupted: {0}")]
    Transport(String),
    #[error("failed to decode chat chunk: {0}")]
    Decode(String),
    #[error("chat API error: {0}")]
    Remote(String),
}

impl ChatError {
    fn is_quota(&self) -> bool {
        let quota_text = |m: &str| {
            let m = m.to_lowercase();
            m.contains("429") || m.contains("quota") || m.contains("limit exceeded")
        };
        match self {
            Self::Status { status, message } => *status == 429 || quota_text(message),
            Self::Remote(message) => quota_text(message),
            _ => false,
        }
    }

    /// Text shown to the card holder in place of a reply.
    pub fn user_message(&self) -> &'static str {
        if self.is_quota() {
            "Daily chat limit reached (20 requests/day). Please try again later or contact support."
        } else {
            "Connection error. Please call bank support directly."
        }
    }
}

/// Wire models of the generative-language REST API.
mod wire {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct Content {
        pub role: ChatRole,
        pub parts: Vec<Part>,
    }

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct Part {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub text: Option<String>,
    }

    impl Content {
        pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
            Self {
                role,
                parts: vec![Part {
                    text: Some(text.into()),
                }],
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct Instruction<'a> {
        pub parts: [InstructionPart<'a>; 1],
    }

    #[derive(Serialize, Debug)]
    pub struct InstructionPart<'a> {
        pub text: &'a str,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct GenerateRequest<'a> {
        pub system_instruction: Instruction<'a>,
        pub contents: &'a [Content],
        pub generation_config: GenerationConfig,
    }

    #[derive(Serialize, Debug)]
    pub struct GenerationConfig {
        pub temperature: f32,
    }

    #[derive(Deserialize, Debug, Default)]
    pub struct StreamChunk {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
        #[serde(default)]
        pub error: Option<RemoteError>,
    }

    #[derive(Deserialize, Debug)]
    pub struct Candidate {
        #[serde(default)]
        pub content: Option<ReplyContent>,
    }

    /// Inbound content; closing chunks may carry a role and no parts.
    #[derive(Deserialize, Debug, Default)]
    pub struct ReplyContent {
        #[serde(default)]
        pub parts: Vec<Part>,
    }

    #[derive(Deserialize, Debug)]
    pub struct RemoteError {
        #[serde(default)]
        pub message: String,
    }

    impl StreamChunk {
        pub fn text(&self) -> String {
            self.candidates
                .iter()
                .filter_map(|c| c.content.as_ref())
                .flat_map(|c| c.parts.iter())
                .filter_map(|p| p.text.as_deref())
                .collect()
        }
    }
}

use wire::{Content, GenerateRequest, GenerationConfig, Instruction, InstructionPart, StreamChunk};

/// Incremental server-sent-events reader yielding reply fragments.
struct SseReader<S> {
    body: S,
    pending: Vec<u8>,
    data: String,
    ready: VecDeque<Result<String, ChatError>>,
    finished: bool,
}

impl<S> SseReader<S> {
    fn feed(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.line(line.trim_end_matches(['\r', '\n']));
        }
    }

    fn line(&mut self, line: &str) {
        if line.is_empty() {
            self.dispatch();
        } else if let Some(data) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(data.strip_prefix(' ').unwrap_or(data));
        }
    }

    fn dispatch(&mut self) {
        let data = std::mem::take(&mut self.data);
        if data.is_empty() || data == "[DONE]" {
            return;
        }
        match serde_json::from_str::<StreamChunk>(&data) {
            Ok(StreamChunk {
                error: Some(err), ..
            }) => self.ready.push_back(Err(ChatError::Remote(err.message))),
            Ok(chunk) => {
                let text = chunk.text();
                if !text.is_empty() {
                    self.ready.push_back(Ok(text));
                }
            }
            Err(err) => self.ready.push_back(Err(ChatError::Decode(err.to_string()))),
        }
    }

    fn close(&mut self) {
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw);
            self.line(line.trim_end_matches(['\r', '\n']));
        }
        self.dispatch();
        self.finished = true;
    }
}

/// Turns a raw SSE byte stream into ordered reply fragments.
///
/// Events may be split across chunks at any byte. Transport errors, remote
/// error payloads and undecodable events terminate the stream with an `Err`.
///
pub fn sse_fragments<S, B, E>(body: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let reader = SseReader {
        body,
        pending: Vec::new(),
        data: String::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    let stream = futures::stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(item) = reader.ready.pop_front() {
                if item.is_err() {
                    reader.ready.clear();
                    reader.finished = true;
                }
                return Some((item, reader));
            }
            if reader.finished {
                return None;
            }
            match reader.body.next().await {
                Some(Ok(chunk)) => reader.feed(chunk.as_ref()),
                Some(Err(err)) => reader
                    .ready
                    .push_back(Err(ChatError::Transport(err.to_string()))),
                None => reader.close(),
            }
        }
    });

    Box::pin(stream)
}

/// A multi-turn conversation with the assistant.
///
/// Keeps the turn history so every request carries the full context.
///
pub struct ChatSession {
    http: reqwest::Client,
    config: ChatConfig,
    history: Vec<Content>,
}

impl ChatSession {
    /// Fails with [`ChatError::MissingApiKey`] when no usable key is set.
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        if config.api_key.is_none() {
            return Err(ChatError::MissingApiKey);
        }
        info!(model = %config.model, "chat session initialised");
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            history: Vec::new(),
        })
    }

    pub fn turns(&self) -> usize {
        self.history.len()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Sends `prompt` and returns the stream of reply fragments.
    ///
    /// The prompt is added to the history right away; call
    /// [`commit_reply`](Self::commit_reply) or
    /// [`discard_turn`](Self::discard_turn) once the stream is done.
    ///
    pub async fn stream_reply(&mut self, prompt: &str) -> Result<TokenStream, ChatError> {
        let api_key = self.config.api_key.as_deref().ok_or(ChatError::MissingApiKey)?;
        self.history.push(Content::text(ChatRole::User, prompt));

        let body = GenerateRequest {
            system_instruction: Instruction {
                parts: [InstructionPart {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents: &self.history,
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                self.history.pop();
                return Err(err.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.history.pop();
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat request rejected");
            return Err(ChatError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!(turns = self.history.len(), "streaming chat reply");
        Ok(sse_fragments(Box::pin(response.bytes_stream())))
    }

    pub fn commit_reply(&mut self, text: impl Into<String>) {
        self.history.push(Content::text(ChatRole::Model, text));
    }

    /// Drops the unanswered prompt left by a failed or abandoned reply.
    pub fn discard_turn(&mut self) {
        if self
            .history
            .last()
            .is_some_and(|c| c.role == ChatRole::User)
        {
            self.history.pop();
        }
    }

    /// Runs one full turn: records the prompt in `transcript`, streams the
    /// reply into it fragment by fragment and updates the history.
    ///
    /// On failure the transcript gets an error message for the card holder
    /// and the error is returned.
    ///
    pub async fn ask<F>(
        &mut self,
        prompt: &str,
        transcript: &mut ChatTranscript,
        on_fragment: F,
    ) -> Result<(), ChatError>
    where
        F: FnMut(&str),
    {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(());
        }
        transcript.push_user(prompt);

        let outcome = match self.stream_reply(prompt).await {
            Ok(stream) => transcript.consume(stream, on_fragment).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(reply) => {
                self.commit_reply(reply);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "chat turn failed");
                self.discard_turn();
                transcript.fail(&err);
                Err(err)
            }
        }
    }
}

/// The messages displayed in the chat window.
#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    pub messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn push_user(&mut self, text: &str) {
        self.messages.push(ChatMessage::user(text));
    }

    /// Appends `fragment` to the reply being streamed, opening one if needed.
    pub fn append(&mut self, fragment: &str) {
        match self.messages.last_mut() {
            Some(last) if last.role == ChatRole::Model && last.is_streaming => {
                last.text.push_str(fragment)
            }
            _ => {
                let mut reply = ChatMessage::model_placeholder();
                reply.text.push_str(fragment);
                self.messages.push(reply);
            }
        }
    }

    /// Marks the reply being streamed as complete.
    pub fn finish(&mut self) {
        if let Some(last) = self.messages.last_mut() {
            last.is_streaming = false;
        }
    }

    /// Closes any partial reply and adds the user-facing error text.
    pub fn fail(&mut self, err: &ChatError) {
        self.finish();
        let mut notice = ChatMessage::model_placeholder();
        notice.text = err.user_message().to_string();
        notice.is_streaming = false;
        self.messages.push(notice);
    }

    /// Drains `stream` in arrival order into a single reply.
    ///
    /// Returns the full reply text, or the error that terminated the stream.
    ///
    pub async fn consume<S, F>(
        &mut self,
        mut stream: S,
        mut on_fragment: F,
    ) -> Result<String, ChatError>
    where
        S: Stream<Item = Result<String, ChatError>> + Unpin,
        F: FnMut(&str),
    {
        self.messages.push(ChatMessage::model_placeholder());
        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            on_fragment(&fragment);
            self.append(&fragment);
            reply.push_str(&fragment);
        }
        self.finish();
        Ok(reply)
    }

    pub fn last_reply(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == ChatRole::Model)
    }
}
