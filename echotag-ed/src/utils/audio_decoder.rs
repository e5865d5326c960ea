//! In-memory audio decoding
//!
//! Decodes uploaded or fetched bytes to mono f32 PCM using symphonia
//! (WAV, MP3, FLAC, OGG/Vorbis, AAC/M4A).

use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Upload extensions accepted by the analysis endpoints
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a"];

/// Decoding failures
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Container not recognised, no audio track, or no codec for it
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Recognised container whose packets could not be decoded
    #[error("Corrupt audio data: {0}")]
    CorruptData(String),

    /// Sample rate conversion failed
    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Decoded audio at its source rate
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples (channels averaged)
    pub samples: Vec<f32>,
    /// Source sample rate in Hz
    pub sample_rate: u32,
    /// Source channel count
    pub channels: usize,
    /// Source duration in seconds
    pub duration_seconds: f64,
}

/// Lowercased extension of `filename`, if any
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether `filename` carries one of [`SUPPORTED_EXTENSIONS`] (case-insensitive)
pub fn is_supported_extension(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Decode `bytes` to mono f32 samples
///
/// `extension` is only a probe hint; the container is detected from content.
/// Packets that fail to decode are skipped with a warning. If every packet
/// failed the data is reported corrupt.
pub fn decode_audio_bytes(
    bytes: Vec<u8>,
    extension: Option<&str>,
) -> Result<DecodedAudio, DecodeError> {
    let byte_len = bytes.len();
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(format!("probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::UnsupportedFormat("no audio track found".to_string()))?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    let declared_rate = track.codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(format!("no decoder for track: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut decoded_rate = declared_rate;
    let mut decoded_channels = channels;
    let mut skipped_packets = 0usize;
    let mut last_error: Option<String> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(DecodeError::CorruptData(format!("error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = %e, "Skipping undecodable packet");
                skipped_packets += 1;
                last_error = Some(e.to_string());
                continue;
            }
            Err(e) => {
                return Err(DecodeError::CorruptData(format!("decoder failure: {}", e)));
            }
        };

        let spec = *decoded.spec();
        decoded_rate = Some(spec.rate);
        decoded_channels = spec.channels.count().max(1);

        let needs_buffer = sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * decoded_channels);
        if needs_buffer {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    if interleaved.is_empty() && skipped_packets > 0 {
        return Err(DecodeError::CorruptData(format!(
            "all {} packets failed to decode (last error: {})",
            skipped_packets,
            last_error.unwrap_or_default()
        )));
    }

    let sample_rate = decoded_rate
        .filter(|rate| *rate > 0)
        .ok_or_else(|| DecodeError::CorruptData("sample rate unknown".to_string()))?;

    let samples = downmix_to_mono(&interleaved, decoded_channels);
    let duration_seconds = samples.len() as f64 / sample_rate as f64;

    tracing::debug!(
        bytes = byte_len,
        sample_rate,
        channels = decoded_channels,
        skipped_packets,
        duration_seconds = format!("{:.2}", duration_seconds),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels: decoded_channels,
        duration_seconds,
    })
}

/// Average interleaved channels into one
fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}
