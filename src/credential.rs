use anyhow::{Context, Result};
use std::fs;

use crate::paths;

/// Fixed key the API key is stored under in the credential store.
pub const CREDENTIAL_KEY: &str = "openai-apikey";
const CREDENTIAL_ENV: &str = "OPENAI_API_KEY";

/// Resolves the API key once at startup: explicit override, then
/// `OPENAI_API_KEY`, then the local credential store.
pub fn load_credential(override_key: Option<&str>) -> Result<Option<String>> {
    if let Some(key) = override_key.and_then(non_blank) {
        return Ok(Some(key));
    }
    if let Some(key) = std::env::var(CREDENTIAL_ENV).ok().as_deref().and_then(non_blank) {
        return Ok(Some(key));
    }
    read_stored_credential()
}

pub fn save_credential(key: &str) -> Result<()> {
    let path = paths::credentials_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let mut table = read_store()?;
    table.insert(
        CREDENTIAL_KEY.to_string(),
        toml::Value::String(key.trim().to_string()),
    );
    let content = toml::to_string(&table).with_context(|| "failed to encode credentials")?;
    fs::write(&path, content)
        .with_context(|| format!("failed to write credentials: {}", path.display()))?;
    Ok(())
}

fn read_stored_credential() -> Result<Option<String>> {
    let table = read_store()?;
    Ok(table
        .get(CREDENTIAL_KEY)
        .and_then(|value| value.as_str())
        .and_then(non_blank))
}

fn read_store() -> Result<toml::Table> {
    let path = paths::credentials_path();
    if !path.exists() {
        return Ok(toml::Table::new());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read credentials: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("failed to parse credentials: {}", path.display()))
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn missing_store_yields_no_credential() {
        with_temp_home(|_| {
            assert_eq!(load_credential(None).unwrap(), None);
        });
    }

    #[test]
    fn saved_credential_is_loaded_back() {
        with_temp_home(|home| {
            save_credential("  sk-test  ").unwrap();
            assert_eq!(load_credential(None).unwrap().as_deref(), Some("sk-test"));
            let raw = fs::read_to_string(home.join(".llm-line-translator/credentials.toml"))
                .unwrap();
            assert!(raw.contains("openai-apikey"));
        });
    }

    #[test]
    fn override_wins_and_blank_override_is_ignored() {
        with_temp_home(|_| {
            save_credential("stored").unwrap();
            assert_eq!(
                load_credential(Some("flag")).unwrap().as_deref(),
                Some("flag")
            );
            assert_eq!(
                load_credential(Some("   ")).unwrap().as_deref(),
                Some("stored")
            );
        });
    }
}
