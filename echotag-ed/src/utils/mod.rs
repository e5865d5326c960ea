//! Utility modules for echotag-ed

pub mod audio_decoder;
pub mod db_retry;

pub use audio_decoder::{decode_audio_bytes, is_supported_extension, DecodeError, DecodedAudio};
pub use db_retry::retry_on_lock;
