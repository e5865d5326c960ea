//! Audio buffer and window types
//!
//! An [`AudioBuffer`] is the decoded, mono, resampled waveform of one file.
//! A [`Window`] is a view into it used as the unit of timeline classification.

use crate::services::AnalysisError;

/// Immutable mono sample buffer at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a buffer, rejecting a zero sample rate
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidParameter(
                "sample rate must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds (`len / sample_rate`)
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample range covered by `window`
    ///
    /// Fails if the window was built for a different (shorter) buffer.
    pub fn window_samples(&self, window: &Window) -> Result<&[f32], AnalysisError> {
        let end = window.sample_offset + window.sample_count;
        self.samples
            .get(window.sample_offset..end)
            .ok_or_else(|| {
                AnalysisError::InvalidParameter(format!(
                    "window at {:.6}s covers samples {}..{} but buffer has {}",
                    window.start_time,
                    window.sample_offset,
                    end,
                    self.samples.len()
                ))
            })
    }
}

/// Time-bounded slice of an [`AudioBuffer`]
///
/// Invariant (upheld by the segmenter): `sample_offset + sample_count` never
/// exceeds the source buffer length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Start time in seconds (exact multiple of the step, rounded to 1e-6)
    pub start_time: f64,
    /// Window length in seconds
    pub duration: f64,
    /// First sample index in the source buffer
    pub sample_offset: usize,
    /// Number of samples in the window
    pub sample_count: usize,
}

impl Window {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}
