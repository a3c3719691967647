use std::sync::Arc;

use thiserror::Error;

use crate::config::{FuncSettings, SettingsError};
use crate::index::VectorIndex;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::qa::RetrievalQa;

/// Process-wide state shared by every request.
///
/// The pipeline is built exactly once, before the listener binds, and is
/// read-only afterwards; requests never re-initialize it.
pub struct AppState {
    pub settings: FuncSettings,
    pub qa: Arc<RetrievalQa>,
}

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to load vector index: {0}")]
    Index(#[source] anyhow::Error),
}

impl AppState {
    /// Initializes the application state from the process environment.
    ///
    /// A missing `OPENAI_API_KEY` or an unreadable index aborts startup; no
    /// request is ever served from a partially-built process.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let settings = FuncSettings::from_env()?;
        Self::with_settings(settings).await
    }

    pub async fn with_settings(settings: FuncSettings) -> Result<Arc<Self>, InitializationError> {
        let index =
            VectorIndex::load(&settings.index_dir).map_err(InitializationError::Index)?;
        tracing::info!(
            "Loaded vector index: {} entries, model {}",
            index.len(),
            index.model()
        );

        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            settings.api_base.clone(),
            settings.api_key.clone(),
        ));
        match provider.health_check().await {
            Ok(true) => {}
            _ => tracing::warn!("LLM provider unreachable at startup; requests will fail downstream"),
        }

        let qa = Arc::new(RetrievalQa::new(provider, index, &settings));

        Ok(Arc::new(AppState { settings, qa }))
    }

    /// Builds state around an already-constructed pipeline. Lets tests swap
    /// in a provider double without touching the environment.
    pub fn with_pipeline(settings: FuncSettings, qa: Arc<RetrievalQa>) -> Arc<Self> {
        Arc::new(AppState { settings, qa })
    }
}
