use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::errors::ApiError;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, ApiError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(ApiError::BadRequest(
            "Vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(ApiError::BadRequest(format!(
            "Vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }

    let query_view = ArrayView1::from(query);
    let candidate_view = ArrayView1::from(candidate);

    let dot = query_view.dot(&candidate_view);
    let denom = l2_norm(query_view) * l2_norm(candidate_view);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}

/// Ranks candidates by cosine similarity to the query, best first.
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<(usize, f32)>, ApiError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}

fn l2_norm(vector: ArrayView1<'_, f32>) -> f32 {
    vector.dot(&vector).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        let score = cosine_similarity(&vec, &vec).expect("cosine should work");
        assert!(approx_eq(score, 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).expect("cosine should work");
        assert!(approx_eq(score, 0.0));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0]).is_err());
    }

    #[test]
    fn ranking_returns_highest_similarity_first() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.9, 0.0]];
        let ranked = rank_descending_by_cosine(&query, &candidates).expect("ranking should work");

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[2].0, 1);
    }
}
