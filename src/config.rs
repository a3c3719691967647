use std::env;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const REDACT_PLACEHOLDER: &str = "****";

const DEFAULT_API_BASE: &str = "https://api.openai.com";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_EMBED_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_INDEX_DIR: &str = "docs_index";

/// A string that must never appear in logs or debug output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACT_PLACEHOLDER)
    }
}

/// Runtime settings for the function host, read once from the environment.
#[derive(Debug, Clone)]
pub struct FuncSettings {
    pub api_key: Secret,
    pub api_base: String,
    pub chat_model: String,
    pub embed_model: String,
    pub index_dir: PathBuf,
    /// Number of chunks retrieved per question.
    pub retrieve_k: usize,
}

impl FuncSettings {
    /// Reads settings from the process environment.
    ///
    /// `OPENAI_API_KEY` is mandatory; everything else has a default so the
    /// deployed package runs without extra app settings.
    pub fn from_env() -> Result<Self, SettingsError> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(SettingsError::MissingApiKey)?;

        Ok(FuncSettings {
            api_key: Secret::new(api_key),
            api_base: env_or("ASKDOCS_API_BASE", DEFAULT_API_BASE),
            chat_model: env_or("ASKDOCS_CHAT_MODEL", DEFAULT_CHAT_MODEL),
            embed_model: env_or("ASKDOCS_EMBED_MODEL", DEFAULT_EMBED_MODEL),
            index_dir: PathBuf::from(env_or("ASKDOCS_INDEX_DIR", DEFAULT_INDEX_DIR)),
            retrieve_k: 1,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("API key is missing")]
    MissingApiKey,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("sk-very-secret");
        assert_eq!(format!("{:?}", secret), "****");
    }

    #[test]
    fn secret_exposes_inner_value() {
        let secret = Secret::new("sk-value");
        assert_eq!(secret.expose(), "sk-value");
    }
}
