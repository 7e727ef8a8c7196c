use anyhow::{Result, anyhow};

/// Ordered catalog of target languages (code -> display name).
///
/// Order is the order the codes were configured in; it drives both the prompt
/// sent for every line and the listing printed by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageCatalog {
    entries: Vec<(String, String)>,
}

impl LanguageCatalog {
    pub fn new<I, C, N>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        let mut catalog = Self {
            entries: Vec::new(),
        };
        for (code, name) in entries {
            let code = normalize_code(&code.into());
            if code.is_empty() {
                return Err(anyhow!("language code is empty"));
            }
            if catalog.contains(&code) {
                return Err(anyhow!("language code '{}' is listed twice", code));
            }
            catalog.entries.push((code, name.into()));
        }
        if catalog.entries.is_empty() {
            return Err(anyhow!("language catalog is empty"));
        }
        Ok(catalog)
    }

    /// Built-in catalog; `entries` must already be normalized and unique.
    pub(crate) fn from_static(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(code, name)| (code.as_str(), name.as_str()))
    }

    pub fn contains(&self, code: &str) -> bool {
        let code = normalize_code(code);
        self.entries.iter().any(|(known, _)| *known == code)
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        let code = normalize_code(code);
        self.entries
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, name)| name.as_str())
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keeps_configured_order() {
        let catalog =
            LanguageCatalog::new([("en", "English"), ("cs", "český"), ("de", "Deutsch")]).unwrap();
        assert_eq!(catalog.codes().collect::<Vec<_>>(), vec!["en", "cs", "de"]);
        assert_eq!(catalog.name("CS"), Some("český"));
        assert!(catalog.contains(" de "));
        assert!(!catalog.contains("pl"));
    }

    #[test]
    fn catalog_rejects_empty_and_duplicates() {
        let empty: Vec<(String, String)> = Vec::new();
        assert!(LanguageCatalog::new(empty).is_err());
        assert!(LanguageCatalog::new([("en", "English"), ("EN", "English")]).is_err());
        assert!(LanguageCatalog::new([("  ", "Blank")]).is_err());
    }
}
