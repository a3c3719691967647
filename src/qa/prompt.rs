//! The fixed prompt template every question is wrapped in before it reaches
//! the retrieval pipeline.

/// Formats a user question into the chatbot prompt.
///
/// A question that already ends in `?` produces a doubled `??`; the deployed
/// pipeline has always worked this way, so it stays.
pub fn format_question(query: &str) -> String {
    format!("respond as succinctly as possible. {}?", query)
}
