//! Batch request options, item lifecycle and batch report

use echotag_common::ItemStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{validate_threshold, validate_top_k, TimelineParams};
use crate::services::AnalysisError;

fn default_threshold() -> f32 {
    0.1
}

fn default_top_k() -> usize {
    3
}

fn default_analyze_timeline() -> bool {
    true
}

fn default_segment_duration() -> f64 {
    10.0
}

/// Per-batch analysis options
///
/// Field names and defaults are part of the `/fetch-and-process-paths` wire
/// contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchOptions {
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_analyze_timeline")]
    pub analyze_timeline: bool,
    #[serde(default = "default_segment_duration")]
    pub segment_duration: f64,
    #[serde(default)]
    pub overlap: f64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            top_k: default_top_k(),
            analyze_timeline: default_analyze_timeline(),
            segment_duration: default_segment_duration(),
            overlap: 0.0,
        }
    }
}

impl BatchOptions {
    /// Reject bad parameters before any item is touched
    ///
    /// Segment duration and overlap are only checked in timeline mode.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.analyze_timeline {
            self.timeline_params().validate()
        } else {
            validate_top_k(self.top_k)?;
            validate_threshold(self.threshold)
        }
    }

    pub fn timeline_params(&self) -> TimelineParams {
        TimelineParams {
            segment_duration: self.segment_duration,
            overlap: self.overlap,
            top_k: self.top_k,
            threshold: self.threshold,
        }
    }
}

/// One requested path and where it is in its lifecycle
///
/// Only the orchestrator's local view; the result store holds the
/// authoritative status.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    file_path: String,
    status: ItemStatus,
    error: Option<String>,
}

impl BatchItem {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            status: ItemStatus::Pending,
            error: None,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `pending` → `processing`; returns false on any other source state
    pub fn mark_processing(&mut self) -> bool {
        if self.status != ItemStatus::Pending {
            return false;
        }
        self.status = ItemStatus::Processing;
        true
    }

    /// `processing` → `completed`
    pub fn mark_completed(&mut self) -> bool {
        if self.status != ItemStatus::Processing {
            return false;
        }
        self.status = ItemStatus::Completed;
        true
    }

    /// Any non-terminal state → `failed`, recording the reason
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ItemStatus::Failed;
        self.error = Some(reason.into());
        true
    }
}

/// A failed item with its human-readable reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    pub file_path: String,
    pub error: String,
}

/// Outcome of one `process_batch` call
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub total_files: usize,
    /// Successfully persisted paths, in request order
    pub processed_files: Vec<String>,
    /// Distinct time blocks of successful items, first-seen order
    pub processed_time_blocks: Vec<String>,
    /// Failed paths with reasons, in request order
    pub failed: Vec<FailedItem>,
    /// Wall-clock time of the whole batch
    pub execution_time_seconds: f64,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.processed_files.len()
    }

    pub fn errors(&self) -> usize {
        self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn message(&self) -> String {
        format!(
            "Processed {} of {} files successfully",
            self.processed(),
            self.total_files
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_from_empty_json() {
        let options: BatchOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, BatchOptions::default());
        assert_eq!(options.top_k, 3);
        assert!((options.threshold - 0.1).abs() < f32::EPSILON);
        assert!(options.analyze_timeline);
        assert_eq!(options.segment_duration, 10.0);
        assert_eq!(options.overlap, 0.0);
    }

    #[test]
    fn test_whole_file_mode_ignores_timeline_parameters() {
        let options = BatchOptions {
            analyze_timeline: false,
            overlap: 1.5,
            ..BatchOptions::default()
        };
        assert!(options.validate().is_ok());

        let timeline = BatchOptions {
            analyze_timeline: true,
            ..options
        };
        assert!(timeline.validate().is_err());
    }

    #[test]
    fn test_item_lifecycle() {
        let mut item = BatchItem::new("files/a/b/c/audio.wav");
        assert_eq!(item.status(), ItemStatus::Pending);
        assert!(!item.mark_completed());

        assert!(item.mark_processing());
        assert!(item.mark_completed());
        assert_eq!(item.status(), ItemStatus::Completed);

        // Terminal
        assert!(!item.mark_failed("late"));
        assert!(item.error().is_none());
    }

    #[test]
    fn test_failure_records_reason() {
        let mut item = BatchItem::new("x");
        assert!(item.mark_processing());
        assert!(item.mark_failed("fetch failed"));
        assert_eq!(item.status(), ItemStatus::Failed);
        assert_eq!(item.error(), Some("fetch failed"));
        assert!(!item.mark_processing());
    }

    #[test]
    fn test_report_message() {
        let report = BatchReport {
            batch_id: Uuid::nil(),
            total_files: 2,
            processed_files: vec!["b".into()],
            processed_time_blocks: vec!["14-30".into()],
            failed: vec![FailedItem {
                file_path: "a".into(),
                error: "not found".into(),
            }],
            execution_time_seconds: 0.25,
        };
        assert_eq!(report.processed(), 1);
        assert_eq!(report.errors(), 1);
        assert!(!report.is_success());
        assert_eq!(report.message(), "Processed 1 of 2 files successfully");
    }
}
