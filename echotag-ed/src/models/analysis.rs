//! Classification result types
//!
//! Scores are kept at full precision internally; they are rounded to four
//! decimals only when serialized, so threshold comparisons and averages never
//! see rounding error.

use serde::{Deserialize, Serialize, Serializer};

use crate::services::AnalysisError;

/// Decimal places used for scores on the wire
const SCORE_DECIMALS: i32 = 4;

/// Round to `decimals` places (half away from zero)
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn serialize_score_f32<S: Serializer>(score: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*score as f64, SCORE_DECIMALS))
}

fn serialize_score_f64<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*score, SCORE_DECIMALS))
}

/// One (label, score) pair from the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    #[serde(serialize_with = "serialize_score_f32")]
    pub score: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Ranked events for one window, keyed by the window start time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Window start time in seconds
    pub time: f64,
    /// Filtered, sorted, truncated predictions (may be empty)
    pub events: Vec<Prediction>,
}

/// Cross-window statistics for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStat {
    pub label: String,
    /// Number of timeline entries whose events contain this label
    pub occurrences: usize,
    /// Mean score of this label over those entries
    #[serde(serialize_with = "serialize_score_f64")]
    pub average_score: f64,
}

/// Summary block of a timeline analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_segments: usize,
    pub duration_seconds: f64,
    pub segment_duration: f64,
    pub overlap: f64,
    /// Every label seen, ranked by occurrences, then average score, then label
    pub most_common_events: Vec<SummaryStat>,
}

/// Timeline plus summary for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub timeline: Vec<TimelineEntry>,
    pub summary: AnalysisSummary,
}

/// Parameters of a timeline analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineParams {
    /// Window length in seconds (> 0)
    pub segment_duration: f64,
    /// Fractional overlap between consecutive windows, in [0, 1)
    pub overlap: f64,
    /// Maximum events kept per window (> 0)
    pub top_k: usize,
    /// Minimum score kept, in [0, 1]
    pub threshold: f32,
}

impl TimelineParams {
    /// Check every parameter; the first violation is reported
    pub fn validate(&self) -> Result<(), AnalysisError> {
        validate_segment_duration(self.segment_duration)?;
        validate_overlap(self.overlap)?;
        validate_top_k(self.top_k)?;
        validate_threshold(self.threshold)
    }
}

pub(crate) fn validate_segment_duration(segment_duration: f64) -> Result<(), AnalysisError> {
    if !segment_duration.is_finite() || segment_duration <= 0.0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "segment_duration must be a positive number of seconds, got {}",
            segment_duration
        )));
    }
    Ok(())
}

pub(crate) fn validate_overlap(overlap: f64) -> Result<(), AnalysisError> {
    if !(0.0..1.0).contains(&overlap) {
        return Err(AnalysisError::InvalidParameter(format!(
            "overlap must be in [0, 1), got {}",
            overlap
        )));
    }
    Ok(())
}

pub(crate) fn validate_top_k(top_k: usize) -> Result<(), AnalysisError> {
    if top_k == 0 {
        return Err(AnalysisError::InvalidParameter(
            "top_k must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_threshold(threshold: f32) -> Result<(), AnalysisError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(AnalysisError::InvalidParameter(format!(
            "threshold must be in [0, 1], got {}",
            threshold
        )));
    }
    Ok(())
}

/// What a batch item persists: a timeline or a whole-file prediction list
#[derive(Debug, Clone, PartialEq)]
pub enum ItemResult {
    Timeline(AnalysisResult),
    Predictions(Vec<Prediction>),
}

impl ItemResult {
    /// Storage tag for the `mode` column
    pub fn mode(&self) -> &'static str {
        match self {
            ItemResult::Timeline(_) => "timeline",
            ItemResult::Predictions(_) => "whole_file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_rounded_only_on_serialization() {
        let prediction = Prediction::new("Speech", 0.853_271_8);
        assert!((prediction.score - 0.853_271_8).abs() < 1e-7);

        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["score"], serde_json::json!(0.8533));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.999_96, 4), 1.0);
        assert_eq!(round_to(-0.5, 0), -1.0);
    }

    #[test]
    fn test_timeline_params_validation() {
        let params = TimelineParams {
            segment_duration: 1.0,
            overlap: 0.5,
            top_k: 3,
            threshold: 0.1,
        };
        assert!(params.validate().is_ok());

        assert!(TimelineParams { overlap: 1.0, ..params }.validate().is_err());
        assert!(TimelineParams { overlap: -0.1, ..params }.validate().is_err());
        assert!(TimelineParams { segment_duration: 0.0, ..params }.validate().is_err());
        assert!(TimelineParams { segment_duration: f64::NAN, ..params }.validate().is_err());
        assert!(TimelineParams { top_k: 0, ..params }.validate().is_err());
        assert!(TimelineParams { threshold: 1.5, ..params }.validate().is_err());
        assert!(TimelineParams { threshold: 1.0, ..params }.validate().is_ok());
    }

    #[test]
    fn test_item_result_mode() {
        assert_eq!(ItemResult::Predictions(Vec::new()).mode(), "whole_file");
    }
}
