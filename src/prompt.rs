use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::languages::LanguageCatalog;
use crate::providers::{ChatMessage, ChatRequest};
use crate::settings::OpenAISettings;

const LINE_PROMPT_TEMPLATE: &str = include_str!("prompts/translate_line.tera");

/// Builds the chat completion payload asking for `line` in every catalog
/// language at once. `line` must already be trimmed and non-empty.
pub fn build_request(
    line: &str,
    catalog: &LanguageCatalog,
    openai: &OpenAISettings,
) -> Result<ChatRequest> {
    let content = render_line_prompt(line, catalog)?;
    Ok(ChatRequest {
        model: openai.model.clone(),
        messages: vec![ChatMessage {
            role: openai.role.clone(),
            content,
        }],
        temperature: openai.temperature,
    })
}

pub fn render_line_prompt(line: &str, catalog: &LanguageCatalog) -> Result<String> {
    let codes: Vec<&str> = catalog.codes().collect();
    let codes = serde_json::to_string(&codes).with_context(|| "failed to encode language codes")?;
    let mut context = TeraContext::new();
    context.insert("line", line);
    context.insert("codes", &codes);
    let rendered = Tera::one_off(LINE_PROMPT_TEMPLATE, &context, false)
        .with_context(|| "failed to render line prompt")?;
    Ok(rendered.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn catalog() -> LanguageCatalog {
        LanguageCatalog::new([("en", "English"), ("cs", "český"), ("de", "Deutsch")]).unwrap()
    }

    #[test]
    fn line_prompt_lists_every_catalog_code() {
        let prompt = render_line_prompt("Good morning", &catalog()).unwrap();
        assert_snapshot!(prompt, @r#"Translate "Good morning" TO ["en","cs","de"]. Return Object with results."#);
    }

    #[test]
    fn request_uses_configured_model_role_and_temperature() {
        let openai = OpenAISettings {
            model: "gpt-4o-mini".to_string(),
            role: "system".to_string(),
            temperature: 0.0,
            ..OpenAISettings::default()
        };
        let request = build_request("Hi", &catalog(), &openai).unwrap();
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "system");
    }
}
