//! Client configuration loaded from environment variables.

use std::path::PathBuf;

use cove_lang::LanguageConfig;

const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Viewer language code, the translation target.
    /// Env: `COVE_LOCALE`, then `LANG` (`fr_FR.UTF-8` -> `fr`)
    /// Default: `en`
    pub locale: String,

    /// Directory holding the local database and object store.
    /// Env: `COVE_DATA_DIR`
    /// Default: the platform data directory for Cove.
    pub data_dir: Option<PathBuf>,

    /// Public prefix for object download URLs.
    /// Env: `COVE_OBJECT_BASE_URL`
    /// Default: unset (`file://` URLs).
    pub object_base_url: Option<String>,

    pub language: LanguageConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            data_dir: None,
            object_base_url: None,
            language: LanguageConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        config.language = LanguageConfig::from_env();
        config
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        let locale = lookup("COVE_LOCALE").or_else(|| lookup("LANG"));
        if let Some(raw) = locale {
            match locale_language(&raw) {
                Some(code) => config.locale = code,
                None => tracing::warn!(value = %raw, "Invalid locale, using default"),
            }
        }

        if let Some(dir) = lookup("COVE_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = Some(PathBuf::from(dir.trim()));
            }
        }

        if let Some(url) = lookup("COVE_OBJECT_BASE_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.object_base_url = Some(url.to_string());
            } else {
                tracing::warn!(value = %url, "Invalid COVE_OBJECT_BASE_URL, ignoring");
            }
        }

        config
    }
}

/// Language part of a POSIX or BCP-47 locale: `pt_BR.UTF-8` and `pt-BR`
/// both give `pt`. `C` and `POSIX` carry no language.
fn locale_language(raw: &str) -> Option<String> {
    let code = raw
        .trim()
        .split(['_', '-', '.', '@'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    let valid = (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic());
    valid.then_some(code)
}
