use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

mod openai;

pub use openai::OpenAI;

/// Chat completion payload sent for one source line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl ProviderUsage {
    /// Adds `other` into `self`; a field stays `None` only if both sides are.
    pub fn accumulate(&mut self, other: &ProviderUsage) {
        fn add(left: Option<u64>, right: Option<u64>) -> Option<u64> {
            match (left, right) {
                (None, None) => None,
                (left, right) => Some(left.unwrap_or(0) + right.unwrap_or(0)),
            }
        }
        self.prompt_tokens = add(self.prompt_tokens, other.prompt_tokens);
        self.completion_tokens = add(self.completion_tokens, other.completion_tokens);
        self.total_tokens = add(self.total_tokens, other.total_tokens);
    }
}

/// Decoded reply for one line: language code -> translated text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResponse {
    pub translations: BTreeMap<String, String>,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("HTTP error! status: {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("failed to parse translation response: {0}")]
    Parse(String),

    /// The reply decoded but its message content did not. The endpoint still
    /// billed the request, so its usage travels with the error.
    #[error("failed to parse translation response: {reason}")]
    UnusableContent {
        reason: String,
        model: Option<String>,
        usage: Option<ProviderUsage>,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl TranslateError {
    pub fn usage(&self) -> Option<&ProviderUsage> {
        match self {
            TranslateError::UnusableContent { usage, .. } => usage.as_ref(),
            _ => None,
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            TranslateError::UnusableContent { model, .. } => model.as_deref(),
            _ => None,
        }
    }
}

pub type ProviderFuture =
    Pin<Box<dyn Future<Output = Result<ProviderResponse, TranslateError>> + Send>>;

/// A chat completion endpoint able to answer one line request at a time.
pub trait Provider: Clone + Send + Sync {
    fn send(&self, request: ChatRequest) -> ProviderFuture;
}
