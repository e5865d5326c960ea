//! Timeline aggregation
//!
//! Classifies every window in order, ranks each distribution, and folds the
//! resulting timeline into per-label summary statistics.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::classifier::Classifier;
use crate::models::{
    AnalysisResult, AnalysisSummary, AudioBuffer, SummaryStat, TimelineEntry, TimelineParams,
    Window,
};
use crate::services::{rank_predictions, segment, AnalysisError};

/// Validate, segment and aggregate in one call
pub async fn analyze_timeline(
    buffer: &AudioBuffer,
    classifier: &dyn Classifier,
    params: &TimelineParams,
) -> Result<AnalysisResult, AnalysisError> {
    params.validate()?;
    let windows = segment(buffer, params.segment_duration, params.overlap)?;
    aggregate(buffer, &windows, classifier, params).await
}

/// Classify each window of `buffer` and build the timeline and summary
///
/// Exactly one [`TimelineEntry`] is produced per window, in window order; an
/// entry whose predictions were all filtered out has empty `events`. The
/// first classifier failure aborts the whole analysis.
pub async fn aggregate(
    buffer: &AudioBuffer,
    windows: &[Window],
    classifier: &dyn Classifier,
    params: &TimelineParams,
) -> Result<AnalysisResult, AnalysisError> {
    params.validate()?;

    let mut timeline = Vec::with_capacity(windows.len());
    for window in windows {
        let samples = buffer.window_samples(window)?;
        let distribution = classifier.classify(samples).await?;
        let events = rank_predictions(distribution, params.top_k, Some(params.threshold));

        timeline.push(TimelineEntry {
            time: window.start_time,
            events,
        });
    }

    let summary = summarize(&timeline, buffer.duration_seconds(), params);
    Ok(AnalysisResult { timeline, summary })
}

/// Per-label occurrence counts and mean scores across a timeline
///
/// Labels are ranked by occurrences desc, then average score desc, then label
/// asc. An empty timeline gives zero segments and no events.
pub fn summarize(
    timeline: &[TimelineEntry],
    duration_seconds: f64,
    params: &TimelineParams,
) -> AnalysisSummary {
    let mut totals: HashMap<&str, (usize, f64)> = HashMap::new();
    for entry in timeline {
        for event in &entry.events {
            let slot = totals.entry(event.label.as_str()).or_insert((0, 0.0));
            slot.0 += 1;
            slot.1 += event.score as f64;
        }
    }

    let mut most_common_events: Vec<SummaryStat> = totals
        .into_iter()
        .map(|(label, (occurrences, total))| SummaryStat {
            label: label.to_string(),
            occurrences,
            average_score: total / occurrences as f64,
        })
        .collect();

    most_common_events.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then_with(|| {
                b.average_score
                    .partial_cmp(&a.average_score)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.label.cmp(&b.label))
    });

    AnalysisSummary {
        total_segments: timeline.len(),
        duration_seconds,
        segment_duration: params.segment_duration,
        overlap: params.overlap,
        most_common_events,
    }
}
