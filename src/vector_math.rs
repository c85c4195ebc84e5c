use std::cmp::Ordering;

/// Cosine similarity in `[-1, 1]`.
///
/// Degenerate inputs (empty, mismatched lengths, or a zero-norm side) score
/// 0 instead of failing, so a collapsed embedding never poisons a ranking.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    if query.is_empty() || query.len() != candidate.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut query_norm = 0.0f64;
    let mut candidate_norm = 0.0f64;
    for (q, c) in query.iter().zip(candidate.iter()) {
        let (q, c) = (f64::from(*q), f64::from(*c));
        dot += q * c;
        query_norm += q * q;
        candidate_norm += c * c;
    }

    let denom = query_norm.sqrt() * candidate_norm.sqrt();
    if denom <= f64::from(f32::EPSILON) {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0) as f32
}

/// Scores every candidate and sorts by descending similarity.
///
/// The sort is stable, so equal scores keep candidate order: earlier
/// candidates win ties.
pub fn rank_descending_by_cosine<'a, I>(query: &[f32], candidates: I) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scores: Vec<(usize, f32)> = candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, cosine_similarity(query, candidate)))
        .collect();

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    scores
}

pub fn is_finite_vector(vector: &[f32]) -> bool {
    vector.iter().all(|v| v.is_finite())
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
        assert!(approx_eq(cosine_similarity(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn cosine_is_negative_for_opposite_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]), -1.0));
    }

    #[test]
    fn zero_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn mismatched_lengths_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn ranking_returns_highest_similarity_first() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.9, 0.0]];
        let ranked = rank_descending_by_cosine(&query, candidates.iter().map(Vec::as_slice));

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[2].0, 1);
    }

    #[test]
    fn ranking_breaks_ties_by_candidate_order() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![2.0, 0.0], vec![5.0, 0.0]];
        let ranked = rank_descending_by_cosine(&query, candidates.iter().map(Vec::as_slice));

        let order: Vec<usize> = ranked.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn finite_check_rejects_nan_and_infinity() {
        assert!(is_finite_vector(&[0.1, -2.0]));
        assert!(!is_finite_vector(&[0.1, f32::NAN]));
        assert!(!is_finite_vector(&[f32::INFINITY]));
    }
}
