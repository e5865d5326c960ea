//! # echotag common library
//!
//! Shared code for the echotag services:
//! - Error type used across crates
//! - Configuration file discovery and root folder resolution
//! - Batch progress events and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EchotagEvent, EventBus, ItemStatus};
