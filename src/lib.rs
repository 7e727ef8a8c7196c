use anyhow::{Context, Result};
use std::path::Path;

pub mod cache;
pub mod credential;
pub mod format;
pub mod languages;
pub mod logging;
mod paths;
pub mod prompt;
pub mod providers;
pub mod settings;
#[cfg(test)]
mod test_util;
mod translator;

pub use cache::{FAILED_PLACEHOLDER, NOT_AVAILABLE_PLACEHOLDER};
pub use providers::{OpenAI, Provider, ProviderUsage};
pub use translator::{PipelineError, Translator, split_lines};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub lang: Option<String>,
    pub model: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
    pub show_enabled_languages: bool,
    pub all_languages: bool,
    pub with_using_tokens: bool,
    pub with_using_model: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionOutput {
    pub text: String,
    pub diagnostics: Vec<String>,
}

/// Loads settings and the credential, and builds a session bound to the
/// configured endpoint.
pub fn build_translator(config: &Config) -> Result<Translator<OpenAI>> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    if let Some(model) = config.model.as_deref().map(str::trim) {
        if !model.is_empty() {
            settings.openai.model = model.to_string();
        }
    }
    let key = credential::load_credential(config.key.as_deref())?;
    let provider = OpenAI::new(key).with_endpoint(settings.openai.api.clone());
    let translator = Translator::new(provider, settings);
    match config.lang.as_deref() {
        Some(lang) => translator
            .with_current_lang(lang)
            .with_context(|| "invalid --lang"),
        None => Ok(translator),
    }
}

pub async fn run(config: Config, input: Option<String>) -> Result<ExecutionOutput> {
    let mut translator = build_translator(&config)?;

    if config.show_enabled_languages {
        return Ok(ExecutionOutput {
            text: format_show_output(&translator),
            diagnostics: Vec::new(),
        });
    }

    let input = input.unwrap_or_default();
    let result = translator.translate_all(&input).await;
    let diagnostics = translator.diagnostics().to_vec();
    result?;

    let text = if config.all_languages {
        format_all_languages(&mut translator)
    } else {
        translator.output().to_string()
    };

    Ok(ExecutionOutput {
        text: append_meta_lines(
            text,
            &translator,
            config.with_using_model,
            config.with_using_tokens,
        ),
        diagnostics,
    })
}

/// Renders every catalog language under a `[code] name` header. The active
/// language is restored afterwards.
pub fn format_all_languages<P: Provider>(translator: &mut Translator<P>) -> String {
    let active = translator.current_lang().to_string();
    let codes: Vec<(String, String)> = translator
        .settings()
        .languages
        .iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect();
    let blocks = codes
        .iter()
        .map(|(code, name)| format!("[{}] {}\n{}", code, name, translator.select_language(code)))
        .collect::<Vec<_>>();
    translator.select_language(&active);
    blocks.join("\n\n")
}

pub fn format_show_output<P: Provider>(translator: &Translator<P>) -> String {
    translator
        .settings()
        .languages
        .iter()
        .map(|(code, name)| {
            let marker = if code == translator.current_lang() { "*" } else { " " };
            format!("{} {}\t{}", marker, code, name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn append_meta_lines<P: Provider>(
    mut output: String,
    translator: &Translator<P>,
    with_using_model: bool,
    with_using_tokens: bool,
) -> String {
    let mut meta_lines = Vec::new();

    if with_using_model {
        let model = translator.model().unwrap_or("unavailable");
        meta_lines.push(format!("model: {}", model));
    }

    if with_using_tokens {
        meta_lines.push(format_usage(translator.usage()));
    }

    if !meta_lines.is_empty() {
        output.push('\n');
        output.push_str(&meta_lines.join("\n"));
    }

    output
}

pub fn format_usage(usage: Option<&ProviderUsage>) -> String {
    let Some(usage) = usage else {
        return "tokens: unavailable".to_string();
    };
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });

    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt={}", prompt));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion={}", completion));
    }
    if let Some(total) = total {
        parts.push(format!("total={}", total));
    }

    if parts.is_empty() {
        "tokens: unavailable".to_string()
    } else {
        format!("tokens: {}", parts.join(", "))
    }
}
