//! Language-service configuration loaded from environment variables.

use std::time::Duration;

use cove_shared::constants::LANGUAGE_MODEL;

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Clone)]
pub struct LanguageConfig {
    /// Bearer key for the completions API.
    /// Env: `COVE_LANG_API_KEY`
    /// Default: empty (every call fails with "not configured").
    pub api_key: String,

    /// API root; `/chat/completions` is appended.
    /// Env: `COVE_LANG_BASE_URL`
    /// Default: [`DEFAULT_BASE_URL`]
    pub base_url: String,

    /// Model name sent with every request.
    /// Env: `COVE_LANG_MODEL`
    /// Default: `llama3-8b-8192`
    pub model: String,

    /// Per-request timeout.
    /// Env: `COVE_LANG_TIMEOUT_SECS`
    /// Default: 20 seconds.
    pub timeout: Duration,
}

impl std::fmt::Debug for LanguageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: LANGUAGE_MODEL.to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl LanguageConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(key) = lookup("COVE_LANG_API_KEY") {
            config.api_key = key.trim().to_string();
        }

        if let Some(url) = lookup("COVE_LANG_BASE_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.base_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid COVE_LANG_BASE_URL, using default");
            }
        }

        if let Some(model) = lookup("COVE_LANG_MODEL") {
            if !model.trim().is_empty() {
                config.model = model.trim().to_string();
            }
        }

        if let Some(val) = lookup("COVE_LANG_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid COVE_LANG_TIMEOUT_SECS, using default"),
            }
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}
