use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::{
    ChatRequest, Provider, ProviderFuture, ProviderResponse, ProviderUsage, TranslateError,
};
use crate::languages::normalize_code;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAI {
    key: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAI {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        if !endpoint.trim().is_empty() {
            self.endpoint = endpoint.trim().to_string();
        }
        self
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    fn credential(&self) -> Option<&str> {
        self.key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Provider for OpenAI {
    fn send(&self, request: ChatRequest) -> ProviderFuture {
        let provider = self.clone();
        Box::pin(async move { call_chat_completions(provider, request).await })
    }
}

async fn call_chat_completions(
    provider: OpenAI,
    request: ChatRequest,
) -> Result<ProviderResponse, TranslateError> {
    let key = provider
        .credential()
        .ok_or(TranslateError::MissingCredential)?;

    debug!("POST {} (model {})", provider.endpoint, request.model);
    let response = provider
        .client
        .post(&provider.endpoint)
        .header(AUTHORIZATION, authorization_value(key))
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(TranslateError::HttpStatus {
            status: status.as_u16(),
            message: extract_openai_error(&text).unwrap_or(text),
        });
    }
    let text = response.text().await?;
    extract_translations(&text, &request.model)
}

/// Stored keys carrying their own scheme (`Bearer sk-...`) are sent verbatim.
fn authorization_value(key: &str) -> String {
    if key.contains(char::is_whitespace) {
        key.to_string()
    } else {
        format!("Bearer {}", key)
    }
}

fn extract_translations(
    text: &str,
    fallback_model: &str,
) -> Result<ProviderResponse, TranslateError> {
    let payload: ChatCompletionResponse = serde_json::from_str(text)
        .map_err(|err| TranslateError::Parse(format!("invalid response JSON: {}", err)))?;
    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });

    let translations = payload
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| "no message content received".to_string())
        .and_then(parse_content);
    match translations {
        Ok(translations) => Ok(ProviderResponse {
            translations,
            model,
            usage,
        }),
        Err(reason) => Err(TranslateError::UnusableContent {
            reason,
            model,
            usage,
        }),
    }
}

/// Decodes the model's reply into code -> translation.
///
/// Single quotes are swapped for backticks before decoding, so apostrophes in
/// translations come back as backticks. Non-string and blank values count as
/// missing.
fn parse_content(content: &str) -> Result<BTreeMap<String, String>, String> {
    let normalized = content.replace('\'', "`");
    let body = strip_code_fence(normalized.trim());
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|err| format!("message content is not JSON: {}", err))?;
    let object = value
        .as_object()
        .ok_or_else(|| "message content is not an object".to_string())?;

    let mut translations = BTreeMap::new();
    for (code, value) in object {
        if let Some(text) = value.as_str().filter(|text| !text.trim().is_empty()) {
            translations.insert(normalize_code(code), text.to_string());
        }
    }
    Ok(translations)
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = match rest.find('\n') {
        Some(index) => &rest[index + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(error.message, error.kind, error.code))
}

fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message.filter(|value| !value.trim().is_empty()) {
        parts.push(message);
    }
    if let Some(kind) = kind.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_json_snapshot;

    fn completion(content: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-3.5-turbo-0125",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 31, "completion_tokens": 20, "total_tokens": 51}
        })
        .to_string()
    }

    #[test]
    fn extracts_translations_from_first_choice() {
        let body = completion(r#"{"en": "Hello", "CS": "Ahoj", "de": null}"#);
        let response = extract_translations(&body, "gpt-3.5-turbo").unwrap();
        assert_json_snapshot!(response, @r#"
        {
          "translations": {
            "cs": "Ahoj",
            "en": "Hello"
          },
          "model": "gpt-3.5-turbo-0125",
          "usage": {
            "prompt_tokens": 31,
            "completion_tokens": 20,
            "total_tokens": 51
          }
        }
        "#);
    }

    #[test]
    fn apostrophes_become_backticks() {
        let translations = parse_content(r#"{"en": "It's fine", "fr": "C'est bon"}"#).unwrap();
        assert_eq!(translations["en"], "It`s fine");
        assert_eq!(translations["fr"], "C`est bon");
    }

    #[test]
    fn single_quoted_object_is_a_parse_error() {
        let err = parse_content("{'en': 'Hello'}").unwrap_err();
        assert!(err.contains("not JSON"));
    }

    #[test]
    fn blank_and_non_string_values_count_as_missing() {
        let translations =
            parse_content(r#"{"en": "", "pl": "   ", "cs": 5, "de": ["Hallo"], "sk": "Ahoj"}"#)
                .unwrap();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations["sk"], "Ahoj");
    }

    #[test]
    fn unusable_content_keeps_billed_usage_and_model() {
        let body = completion("Sorry, I cannot help with that.");
        let err = extract_translations(&body, "gpt-3.5-turbo").unwrap_err();
        assert!(matches!(err, TranslateError::UnusableContent { .. }));
        assert_eq!(err.usage().and_then(|usage| usage.total_tokens), Some(51));
        assert_eq!(err.model(), Some("gpt-3.5-turbo-0125"));
        assert!(err.to_string().starts_with("failed to parse translation response"));
    }

    #[test]
    fn fenced_json_is_accepted() {
        let translations = parse_content("```json\n{\"en\": \"Hello\"}\n```").unwrap();
        assert_eq!(translations["en"], "Hello");
    }

    #[test]
    fn non_object_content_is_a_parse_error() {
        assert!(parse_content("[\"Hello\"]").is_err());
        assert!(parse_content("Sorry, I cannot help with that.").is_err());
    }

    #[test]
    fn missing_choices_or_content_is_a_parse_error() {
        let err = extract_translations(r#"{"choices": []}"#, "m").unwrap_err();
        assert!(err.to_string().contains("no message content"));
        assert_eq!(err.model(), Some("m"));
        let err = extract_translations("<html>", "m").unwrap_err();
        assert!(matches!(err, TranslateError::Parse(_)));
        assert_eq!(err.usage(), None);
    }

    #[test]
    fn model_falls_back_to_requested_one() {
        let body = r#"{"choices": [{"message": {"content": "{\"en\": \"Hi\"}"}}]}"#;
        let response = extract_translations(body, "gpt-3.5-turbo").unwrap();
        assert_eq!(response.model.as_deref(), Some("gpt-3.5-turbo"));
        assert_eq!(response.usage, None);
    }

    #[test]
    fn error_body_is_summarised() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        assert_eq!(
            extract_openai_error(body).as_deref(),
            Some("Incorrect API key provided | type: invalid_request_error | code: invalid_api_key")
        );
        assert_eq!(extract_openai_error("not json"), None);
    }

    #[test]
    fn authorization_adds_bearer_scheme_only_when_missing() {
        assert_eq!(authorization_value("sk-abc"), "Bearer sk-abc");
        assert_eq!(authorization_value("Bearer sk-abc"), "Bearer sk-abc");
    }

    #[tokio::test]
    async fn missing_credential_fails_without_network() {
        let provider = OpenAI::new(Some("   ".to_string())).with_endpoint("http://127.0.0.1:9/");
        let request = ChatRequest {
            model: "m".to_string(),
            messages: Vec::new(),
            temperature: 0.1,
        };
        assert!(!provider.has_credential());
        let err = provider.send(request).await.unwrap_err();
        assert!(matches!(err, TranslateError::MissingCredential));
    }

    #[test]
    fn credential_presence_ignores_blank_keys() {
        assert!(OpenAI::new(Some("sk-abc".to_string())).has_credential());
        assert!(!OpenAI::new(None).has_credential());
    }

    #[tokio::test]
    async fn truncated_success_body_is_a_network_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0u8; 4096];
            let _ = socket.read(&mut buffer).await;
            let head = "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 500\r\n\r\n{\"choices\"";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let provider = OpenAI::new(Some("sk-abc".to_string()))
            .with_endpoint(format!("http://{}/v1/chat/completions", addr));
        let request = ChatRequest {
            model: "m".to_string(),
            messages: Vec::new(),
            temperature: 0.1,
        };
        let err = provider.send(request).await.unwrap_err();
        assert!(matches!(err, TranslateError::Network(_)), "{err}");
    }
}
