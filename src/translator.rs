use tracing::{info, warn};

use crate::cache::{LineOutcome, TranslationCache};
use crate::format::format_entries;
use crate::languages::normalize_code;
use crate::prompt::build_request;
use crate::providers::{Provider, ProviderResponse, ProviderUsage, TranslateError};
use crate::settings::Settings;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("nothing to translate: input has no non-empty lines")]
    EmptyInput,

    #[error("no translation available for '{0}'")]
    NoTranslation(String),

    #[error("unknown language code '{0}'")]
    UnknownLanguage(String),
}

/// One translation session: owns the provider (and with it the credential),
/// the per-language cache and the active language.
#[derive(Debug, Clone)]
pub struct Translator<P: Provider> {
    provider: P,
    settings: Settings,
    current_lang: String,
    cache: TranslationCache,
    output: String,
    diagnostics: Vec<String>,
    usage: Option<ProviderUsage>,
    model: Option<String>,
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: P, settings: Settings) -> Self {
        let current_lang = settings.default_lang.clone();
        Self {
            provider,
            settings,
            current_lang,
            cache: TranslationCache::default(),
            output: String::new(),
            diagnostics: Vec::new(),
            usage: None,
            model: None,
        }
    }

    pub fn with_current_lang(mut self, code: &str) -> Result<Self, PipelineError> {
        let code = normalize_code(code);
        if !self.settings.languages.contains(&code) {
            return Err(PipelineError::UnknownLanguage(code));
        }
        self.current_lang = code;
        Ok(self)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn current_lang(&self) -> &str {
        &self.current_lang
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Formatted block last shown for the active language.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Failure messages collected during the last translate run.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn usage(&self) -> Option<&ProviderUsage> {
        self.usage.as_ref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Translates every non-blank line of `input`, one request at a time,
    /// and returns the formatted block of the active language.
    pub async fn translate_all(&mut self, input: &str) -> Result<String, PipelineError> {
        self.cache.clear();
        self.output.clear();
        self.diagnostics.clear();
        self.usage = None;
        self.model = None;

        let lines = split_lines(input);
        if lines.is_empty() {
            self.report(PipelineError::EmptyInput.to_string());
            return Err(PipelineError::EmptyInput);
        }

        let total = lines.len();
        let mut credential_reported = false;
        for (index, line) in lines.iter().enumerate() {
            info!("translating line {}/{}", index + 1, total);
            let outcome = match self.send(line, &mut credential_reported).await {
                Some(response) => LineOutcome::Translated(response.translations),
                None => LineOutcome::Failed,
            };
            self.cache.record(&self.settings.languages, line, &outcome);
        }

        let entries = self
            .cache
            .language(&self.current_lang)
            .ok_or_else(|| PipelineError::NoTranslation(self.current_lang.clone()))?;
        self.output = format_entries(entries);
        Ok(self.output.clone())
    }

    /// Switches the active language and re-renders it from the cache.
    /// Returns an empty string when nothing is cached for `code`.
    pub fn select_language(&mut self, code: &str) -> String {
        self.current_lang = normalize_code(code);
        self.output = self
            .cache
            .language(&self.current_lang)
            .map(format_entries)
            .unwrap_or_default();
        self.output.clone()
    }

    /// Builds and sends the request for one line. Every failure is logged,
    /// recorded as a diagnostic and turned into `None`.
    async fn send(
        &mut self,
        line: &str,
        credential_reported: &mut bool,
    ) -> Option<ProviderResponse> {
        let request = match build_request(line, &self.settings.languages, &self.settings.openai) {
            Ok(request) => request,
            Err(err) => {
                warn!("failed to build request: {:#}", err);
                self.report(format!("\"{}\": {:#}", line, err));
                return None;
            }
        };

        match self.provider.send(request).await {
            Ok(response) => {
                self.track(response.model.as_deref(), response.usage.as_ref());
                Some(response)
            }
            Err(TranslateError::MissingCredential) => {
                if !*credential_reported {
                    *credential_reported = true;
                    warn!("no API key configured");
                    self.report(format!(
                        "{}; store one with --save-key or set OPENAI_API_KEY",
                        TranslateError::MissingCredential
                    ));
                }
                None
            }
            Err(err) => {
                self.track(err.model(), err.usage());
                warn!("translation request failed: {}", err);
                self.report(format!("\"{}\": {}", line, err));
                None
            }
        }
    }

    /// Adds what the endpoint billed for one request to the run totals.
    fn track(&mut self, model: Option<&str>, usage: Option<&ProviderUsage>) {
        if let Some(usage) = usage {
            self.usage
                .get_or_insert_with(ProviderUsage::default)
                .accumulate(usage);
        }
        if let Some(model) = model {
            self.model = Some(model.to_string());
        }
    }

    fn report(&mut self, message: String) {
        self.diagnostics.push(message);
    }
}

/// Splits input on line boundaries, trimming and dropping blank lines.
pub fn split_lines(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
