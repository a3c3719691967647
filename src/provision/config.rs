//! Stack configuration bundle.
//!
//! Keys mirror the deployment's configuration surface: `sitePath`,
//! `appPath`, `indexDocument`, `errorDocument`, plus the secret
//! `openaiToken`. Everything but the secret has a default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::config::Secret;

const TOKEN_ENV_VARS: [&str; 2] = ["ASKDOCS_OPENAI_TOKEN", "OPENAI_API_KEY"];

#[derive(Debug, Clone)]
pub struct StackConfig {
    pub site_path: PathBuf,
    pub app_path: PathBuf,
    pub index_document: String,
    pub error_document: String,
    pub openai_token: Secret,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
struct StackConfigFile {
    site_path: Option<PathBuf>,
    app_path: Option<PathBuf>,
    index_document: Option<String>,
    error_document: Option<String>,
    openai_token: Option<String>,
}

impl StackConfig {
    /// Loads the bundle from an optional TOML file; the secret may instead
    /// come from the environment. A missing secret is fatal before any
    /// resource is declared.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read stack config {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("Failed to parse stack config {}", path.display()))?
            }
            None => StackConfigFile::default(),
        };

        let openai_token = file
            .openai_token
            .or_else(token_from_env)
            .map(Secret::new)
            .context("openaiToken is not configured (set it in the stack config or OPENAI_API_KEY)")?;

        Ok(StackConfig {
            site_path: file.site_path.unwrap_or_else(|| PathBuf::from("./www")),
            app_path: file.app_path.unwrap_or_else(|| PathBuf::from("./app")),
            index_document: file
                .index_document
                .unwrap_or_else(|| "index.html".to_string()),
            error_document: file
                .error_document
                .unwrap_or_else(|| "error.html".to_string()),
            openai_token,
        })
    }
}

fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .find_map(|var| env::var(var).ok())
        .filter(|value| !value.trim().is_empty())
}
