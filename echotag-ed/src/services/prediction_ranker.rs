//! Filter, sort and truncate a label distribution
//!
//! Order of operations is fixed: drop scores below the threshold, stable-sort
//! descending by score (ties keep classifier label order), keep at most
//! `top_k`.

use crate::models::Prediction;

/// Rank one classifier distribution
///
/// Non-finite scores are dropped. `threshold = None` keeps every finite score.
pub fn rank_predictions(
    distribution: Vec<Prediction>,
    top_k: usize,
    threshold: Option<f32>,
) -> Vec<Prediction> {
    let mut kept: Vec<Prediction> = distribution
        .into_iter()
        .filter(|p| p.score.is_finite())
        .filter(|p| threshold.map_or(true, |t| p.score >= t))
        .collect();

    // sort_by is stable
    kept.sort_by(|a, b| b.score.total_cmp(&a.score));
    kept.truncate(top_k);
    kept
}
