//! Retrieval-QA pipeline: embed the prompt, look up the closest chunk in the
//! precomputed index, then ask the chat model to answer from that context.

use std::sync::Arc;

use crate::config::FuncSettings;
use crate::errors::ApiError;
use crate::index::VectorIndex;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

const CHAT_TEMPERATURE: f64 = 0.0;
const CHAT_MAX_TOKENS: i32 = 100;

/// One pipeline instance is built per process and shared across requests.
/// It holds no mutable state after construction.
pub struct RetrievalQa {
    provider: Arc<dyn LlmProvider>,
    index: VectorIndex,
    chat_model: String,
    embed_model: String,
    retrieve_k: usize,
}

impl RetrievalQa {
    pub fn new(provider: Arc<dyn LlmProvider>, index: VectorIndex, settings: &FuncSettings) -> Self {
        Self {
            provider,
            index,
            chat_model: settings.chat_model.clone(),
            embed_model: settings.embed_model.clone(),
            retrieve_k: settings.retrieve_k,
        }
    }

    /// Runs an already-formatted prompt through the pipeline and returns the
    /// model's answer text.
    pub async fn run(&self, prompt: &str) -> Result<String, ApiError> {
        let embeddings = self
            .provider
            .embed(&[prompt.to_string()], &self.embed_model)
            .await?;
        let query = embeddings
            .first()
            .ok_or_else(|| ApiError::Internal("Embedding response was empty".to_string()))?;

        let hits = self.index.search(query, self.retrieve_k)?;
        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let messages = vec![
            ChatMessage::system(format!(
                "Answer the question using only this context:\n{}",
                context
            )),
            ChatMessage::user(prompt.to_string()),
        ];
        let request = ChatRequest::new(messages)
            .with_temperature(CHAT_TEMPERATURE)
            .with_max_tokens(CHAT_MAX_TOKENS);

        self.provider.chat(request, &self.chat_model).await
    }
}
