//! Fixed-duration window segmentation
//!
//! Windows start at `i * step` where `step = segment_duration * (1 - overlap)`.
//! Start times are computed by multiplication and rounded to microseconds so
//! they do not drift over long files. Only windows that fit entirely inside
//! the buffer are emitted; there is no padding and no partial last window.
//! Each window holds `floor(segment_duration * rate)` samples, so a window
//! that fits in time always fits in samples.

use crate::models::analysis::{validate_overlap, validate_segment_duration};
use crate::models::{AudioBuffer, Window};
use crate::services::AnalysisError;

/// Slack allowed when comparing a window end to the buffer duration
const END_TOLERANCE_SECS: f64 = 1e-6;

/// Smallest step accepted; anything below would emit millions of windows per second
const MIN_STEP_SECS: f64 = 1e-6;

/// Most windows a single request may produce
pub const MAX_WINDOWS: usize = 100_000;

/// Slack in samples so `0.57 * 100` still counts as 57 samples
const SAMPLE_TOLERANCE: f64 = 1e-6;

/// Round to six decimal places
pub(crate) fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Split `buffer` into windows of `segment_duration` seconds overlapping by `overlap`
///
/// A buffer shorter than one window yields an empty vector, not an error.
pub fn segment(
    buffer: &AudioBuffer,
    segment_duration: f64,
    overlap: f64,
) -> Result<Vec<Window>, AnalysisError> {
    validate_segment_duration(segment_duration)?;
    validate_overlap(overlap)?;

    let step = segment_duration * (1.0 - overlap);
    if step < MIN_STEP_SECS {
        return Err(AnalysisError::InvalidParameter(format!(
            "segment step {} s is too small (segment_duration {} s, overlap {})",
            step, segment_duration, overlap
        )));
    }

    let rate = buffer.sample_rate() as f64;
    let sample_count = (segment_duration * rate + SAMPLE_TOLERANCE).floor() as usize;
    if sample_count == 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "segment_duration {} s is shorter than one sample at {} Hz",
            segment_duration,
            buffer.sample_rate()
        )));
    }

    let duration = buffer.duration_seconds();
    let total_samples = buffer.len();

    let expected = if duration + END_TOLERANCE_SECS < segment_duration {
        0
    } else {
        ((duration + END_TOLERANCE_SECS - segment_duration) / step).floor() as usize + 1
    };
    if expected > MAX_WINDOWS {
        return Err(AnalysisError::InvalidParameter(format!(
            "{} s of audio at segment_duration {} s and overlap {} gives {} windows (limit {})",
            duration, segment_duration, overlap, expected, MAX_WINDOWS
        )));
    }

    let mut windows = Vec::with_capacity(expected);

    for i in 0usize.. {
        let start_time = round6(i as f64 * step);
        if start_time + segment_duration > duration + END_TOLERANCE_SECS {
            break;
        }

        // start_time + d <= duration keeps this within one sample of the end
        let sample_offset =
            ((start_time * rate).round() as usize).min(total_samples.saturating_sub(sample_count));

        windows.push(Window {
            start_time,
            duration: segment_duration,
            sample_offset,
            sample_count,
        });
    }

    tracing::debug!(
        windows = windows.len(),
        duration_seconds = duration,
        segment_duration,
        overlap,
        "Segmented audio buffer"
    );

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(seconds: f64, rate: u32) -> AudioBuffer {
        let len = (seconds * rate as f64).round() as usize;
        AudioBuffer::new(vec![0.0; len], rate).unwrap()
    }

    #[test]
    fn test_five_seconds_half_overlap() {
        let windows = segment(&buffer(5.0, 16_000), 1.0, 0.5).unwrap();
        let times: Vec<f64> = windows.iter().map(|w| w.start_time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0]);

        let last = windows.last().unwrap();
        assert_eq!(last.sample_offset + last.sample_count, 80_000);
    }

    #[test]
    fn test_no_overlap_exact_fit() {
        let windows = segment(&buffer(30.0, 16_000), 10.0, 0.0).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].start_time, 20.0);
        assert_eq!(windows[2].sample_offset, 320_000);
    }

    #[test]
    fn test_partial_last_window_dropped() {
        let windows = segment(&buffer(25.0, 16_000), 10.0, 0.0).unwrap();
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn test_short_buffer_yields_no_windows() {
        assert!(segment(&buffer(0.4, 16_000), 1.0, 0.0).unwrap().is_empty());
        assert!(segment(&buffer(0.0, 16_000), 1.0, 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let b = buffer(5.0, 16_000);
        assert!(matches!(segment(&b, 1.0, 1.0), Err(AnalysisError::InvalidParameter(_))));
        assert!(matches!(segment(&b, 0.0, 0.0), Err(AnalysisError::InvalidParameter(_))));
        assert!(matches!(segment(&b, -1.0, 0.0), Err(AnalysisError::InvalidParameter(_))));
        assert!(matches!(segment(&b, 1.0, -0.2), Err(AnalysisError::InvalidParameter(_))));
    }

    #[test]
    fn test_window_shorter_than_one_sample_rejected() {
        let b = buffer(1.0, 100);
        assert!(matches!(segment(&b, 0.001, 0.0), Err(AnalysisError::InvalidParameter(_))));
    }

    #[test]
    fn test_start_times_do_not_drift() {
        // 0.1 s steps over ten minutes: accumulated addition would drift
        let windows = segment(&buffer(600.0, 1_000), 0.2, 0.5).unwrap();
        for (i, window) in windows.iter().enumerate() {
            assert_eq!(window.start_time, round6(i as f64 * 0.1));
        }
        assert_eq!(windows.last().unwrap().start_time, 599.8);
    }

    #[test]
    fn test_fractional_sample_windows_kept() {
        // 0.25 s at 10 Hz is 2.5 samples
        let b = AudioBuffer::new(vec![0.0; 10], 10).unwrap();
        let windows = segment(&b, 0.25, 0.0).unwrap();
        let times: Vec<f64> = windows.iter().map(|w| w.start_time).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75]);
        for window in &windows {
            assert_eq!(window.sample_count, 2);
            assert!(window.sample_offset + window.sample_count <= 10);
        }
        assert_eq!(windows[3].sample_offset, 8);
    }

    #[test]
    fn test_window_count_limit() {
        let b = buffer(60.0, 16_000);
        let err = segment(&b, 0.001, 0.99).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidParameter(msg) if msg.contains("limit")));

        // Just under the limit is still accepted
        let b = buffer(100.0, 1_000);
        let windows = segment(&b, 0.002, 0.5).unwrap();
        assert_eq!(windows.len(), 99_999);
    }
}
