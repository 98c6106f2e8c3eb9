//! Client side of the chat: the conversation a visitor sees and the single
//! in-flight request it is allowed to have.

pub mod http;
pub mod terminal;

use async_trait::async_trait;
use log::warn;
use thiserror::Error;

use crate::models::chat::ChatMessage;

pub const GREETING: &str =
    "Hey! I'm the site's personal assistant. Ask me anything about the owner's work, projects, or tech stack.";
pub const EMPTY_REPLY_FALLBACK: &str = "I couldn't fetch a response. Try again!";
pub const NETWORK_FAILURE_REPLY: &str = "Looks like there was a network issue. Try again!";

/// Suggested first questions, offered until the visitor has said anything.
pub static STARTERS: [&str; 4] = [
    "What does the owner specialize in?",
    "Tell me about their projects",
    "Are they open to new roles?",
    "What's their tech stack?",
];

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to chat proxy failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Whatever carries the conversation to the proxy. Returns the `reply` field
/// of the response, `None` when the proxy sent something without one.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post(&self, messages: &[ChatMessage]) -> Result<Option<String>, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ChatWidget {
    messages: Vec<ChatMessage>,
    input: String,
    loading: bool,
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatWidget {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
            input: String::new(),
            loading: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Starter prompts, only while the greeting is the sole message.
    pub fn starters(&self) -> &'static [&'static str] {
        if self.messages.len() == 1 { &STARTERS[..] } else { &[] }
    }

    /// Resolves a 1-based starter number typed by the visitor.
    pub fn starter(&self, choice: &str) -> Option<&'static str> {
        let n: usize = choice.trim().parse().ok()?;
        self.starters().get(n.checked_sub(1)?).copied()
    }

    /// Appends the user's turn and flips `loading`. Returns the full history to
    /// post, or `None` when the text is blank or a send is already in flight.
    pub fn begin_send(&mut self, text: &str) -> Option<Vec<ChatMessage>> {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.loading {
            return None;
        }
        self.messages.push(ChatMessage::user(trimmed));
        self.input.clear();
        self.loading = true;
        Some(self.messages.clone())
    }

    /// Settles the in-flight send with whatever the transport produced.
    pub fn finish_send(&mut self, outcome: Result<Option<String>, TransportError>) -> &ChatMessage {
        let content = match outcome {
            Ok(Some(reply)) if !reply.is_empty() => reply,
            Ok(_) => EMPTY_REPLY_FALLBACK.to_string(),
            Err(e) => {
                warn!("chat widget send failed: {}", e);
                NETWORK_FAILURE_REPLY.to_string()
            }
        };
        self.loading = false;
        let index = self.messages.len();
        self.messages.push(ChatMessage::assistant(content));
        &self.messages[index]
    }

    pub async fn send<T: ChatTransport + ?Sized>(
        &mut self,
        text: &str,
        transport: &T
    ) -> Option<&ChatMessage> {
        let history = self.begin_send(text)?;
        let outcome = transport.post(&history).await;
        Some(self.finish_send(outcome))
    }

    /// Sends the current input buffer.
    pub async fn submit<T: ChatTransport + ?Sized>(&mut self, transport: &T) -> Option<&ChatMessage> {
        let text = std::mem::take(&mut self.input);
        self.send(&text, transport).await
    }
}
