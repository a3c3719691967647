//! Precomputed vector index.
//!
//! The index is built offline (embedding the docs corpus) and shipped with
//! the function package as `index.json`. At runtime it is read-only: load
//! once, then similarity lookups per question.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::vector_math::rank_descending_by_cosine;

const INDEX_FILE: &str = "index.json";

/// One embedded chunk of the docs corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// The text content of the chunk.
    pub text: String,
    /// Source identifier (URL, filename, etc.).
    pub source: String,
    /// Embedding vector, one per chunk.
    pub embedding: Vec<f32>,
}

/// Result of a similarity lookup.
#[derive(Debug, Clone)]
pub struct IndexSearchResult {
    pub text: String,
    pub source: String,
    /// Similarity score (higher = better).
    pub score: f32,
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// An in-memory, read-only vector index.
pub struct VectorIndex {
    model: String,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Loads the index from `<dir>/index.json`.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(INDEX_FILE);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read index file {}", path.display()))?;
        let file: IndexFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse index file {}", path.display()))?;

        Self::from_entries(file.model, file.dimension, file.entries)
    }

    /// Builds an index from already-embedded entries, validating dimensions.
    pub fn from_entries(
        model: String,
        dimension: usize,
        entries: Vec<IndexEntry>,
    ) -> anyhow::Result<Self> {
        for (idx, entry) in entries.iter().enumerate() {
            if entry.embedding.len() != dimension {
                anyhow::bail!(
                    "Index entry {} ({}) has dimension {}, expected {}",
                    idx,
                    entry.source,
                    entry.embedding.len(),
                    dimension
                );
            }
        }

        Ok(Self {
            model,
            dimension,
            entries,
        })
    }

    /// Embedding model the index was built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the `k` entries most similar to the query embedding,
    /// best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexSearchResult>, ApiError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let candidates: Vec<Vec<f32>> = self
            .entries
            .iter()
            .map(|entry| entry.embedding.clone())
            .collect();
        let ranked = rank_descending_by_cosine(query, &candidates)?;

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| IndexSearchResult {
                text: self.entries[idx].text.clone(),
                source: self.entries[idx].source.clone(),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            text: text.to_string(),
            source: "docs".to_string(),
            embedding,
        }
    }

    #[test]
    fn search_returns_most_similar_entry_first() {
        let index = VectorIndex::from_entries(
            "test-model".to_string(),
            2,
            vec![
                entry("about cats", vec![0.1, 0.9]),
                entry("about dogs", vec![0.9, 0.1]),
            ],
        )
        .expect("index should build");

        let results = index.search(&[1.0, 0.0], 1).expect("search should work");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "about dogs");
    }

    #[test]
    fn mismatched_dimension_is_rejected_at_load() {
        let result = VectorIndex::from_entries(
            "test-model".to_string(),
            3,
            vec![entry("short", vec![1.0, 0.0])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_index_json_from_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw = serde_json::json!({
            "model": "test-model",
            "dimension": 2,
            "entries": [
                { "text": "hello", "source": "docs", "embedding": [1.0, 0.0] }
            ]
        });
        std::fs::write(dir.path().join("index.json"), raw.to_string()).expect("write");

        let index = VectorIndex::load(dir.path()).expect("load should work");
        assert_eq!(index.len(), 1);
        assert_eq!(index.model(), "test-model");
        assert_eq!(index.dimension(), 2);
    }
}
