//! Decoded audio → classifier-ready buffer
//!
//! Resamples to the classifier rate with rubato's sinc interpolator, then
//! peak-normalises to [-1, 1].

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::models::AudioBuffer;
use crate::utils::{DecodeError, DecodedAudio};

/// Frames fed to the resampler per call
const RESAMPLE_CHUNK: usize = 8192;

/// Prepares decoded audio for a classifier with a fixed input rate
#[derive(Debug, Clone, Copy)]
pub struct AudioPreprocessor {
    target_rate: u32,
}

impl AudioPreprocessor {
    pub fn new(target_rate: u32) -> Self {
        Self { target_rate }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Resample and normalise `decoded` into an [`AudioBuffer`]
    pub fn prepare(&self, decoded: DecodedAudio) -> Result<AudioBuffer, DecodeError> {
        let mut samples = resample(&decoded.samples, decoded.sample_rate, self.target_rate)?;
        peak_normalize(&mut samples);

        AudioBuffer::new(samples, self.target_rate)
            .map_err(|e| DecodeError::Resample(e.to_string()))
    }
}

/// Mono sinc resampling; returns the input unchanged when rates match
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, DecodeError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(DecodeError::Resample(format!(
            "cannot resample from {} Hz to {} Hz",
            from_rate, to_rate
        )));
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| DecodeError::Resample(format!("failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK);
    for chunk in &mut chunks {
        let resampled = resampler
            .process(&[chunk][..], None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&resampled[0]);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let resampled = resampler
            .process_partial(Some(&[tail][..]), None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&resampled[0]);
    }

    // Flush the filter delay with silence
    for _ in 0..4 {
        if output.len() >= expected + delay {
            break;
        }
        let resampled = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        if resampled[0].is_empty() {
            break;
        }
        output.extend_from_slice(&resampled[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);

    tracing::debug!(
        from_rate,
        to_rate,
        input_samples = samples.len(),
        output_samples = output.len(),
        "Resampled audio"
    );

    Ok(output)
}

/// Scale so the largest absolute sample is 1.0; silence is left alone
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0f32, |max, s| max.max(s.abs()));

    if peak > 0.0 {
        for sample in samples.iter_mut() {
            *sample /= peak;
        }
    }
}
