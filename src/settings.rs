use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::languages::{LanguageCatalog, normalize_code};
use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub languages: LanguageCatalog,
    pub default_lang: String,
    pub openai: OpenAISettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAISettings {
    pub api: String,
    pub model: String,
    pub role: String,
    pub temperature: f64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            role: "user".to_string(),
            temperature: 0.1,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            languages: default_catalog(),
            default_lang: "pl".to_string(),
            openai: OpenAISettings::default(),
        }
    }
}

const DEFAULT_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("cs", "český"),
    ("de", "Deutsch"),
    ("pl", "Polski"),
    ("uk", "українська"),
    ("sk", "slovenský"),
];

fn default_catalog() -> LanguageCatalog {
    LanguageCatalog::from_static(DEFAULT_LANGUAGES)
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    default_lang: Option<String>,
    languages: Option<toml::Table>,
    openai: Option<OpenAISettingsFile>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAISettingsFile {
    api: Option<String>,
    model: Option<String>,
    role: Option<String>,
    temperature: Option<f64>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = paths::settings_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings
                .merge(parsed)
                .with_context(|| format!("invalid settings: {}", path.display()))?;
        }
    }

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(table) = incoming.languages {
            self.languages = catalog_from_table(table)?;
        }
        if let Some(code) = incoming.default_lang {
            let code = normalize_code(&code);
            if !code.is_empty() {
                self.default_lang = code;
            }
        }
        if let Some(openai) = incoming.openai {
            if let Some(api) = openai.api {
                if !api.trim().is_empty() {
                    self.openai.api = api.trim().to_string();
                }
            }
            if let Some(model) = openai.model {
                if !model.trim().is_empty() {
                    self.openai.model = model.trim().to_string();
                }
            }
            if let Some(role) = openai.role {
                if !role.trim().is_empty() {
                    self.openai.role = role.trim().to_string();
                }
            }
            if let Some(temperature) = openai.temperature {
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(anyhow!(
                        "openai.temperature must be between 0 and 2 (got {})",
                        temperature
                    ));
                }
                self.openai.temperature = temperature;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.languages.contains(&self.default_lang) {
            return Err(anyhow!(
                "default_lang '{}' is not in the language catalog",
                self.default_lang
            ));
        }
        Ok(())
    }
}

fn catalog_from_table(table: toml::Table) -> Result<LanguageCatalog> {
    let mut entries = Vec::with_capacity(table.len());
    for (code, value) in table {
        let name = value
            .as_str()
            .ok_or_else(|| anyhow!("language '{}' must map to a display name string", code))?;
        entries.push((code, name.to_string()));
    }
    LanguageCatalog::new(entries)
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = paths::settings_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}
