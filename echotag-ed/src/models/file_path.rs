//! Recording path layout
//!
//! Recorder uploads are stored as `files/{device_id}/{date}/{time_block}/{file}`.

use serde::{Deserialize, Serialize};

/// Placeholder used for every component of a path that does not match the layout
pub const UNKNOWN: &str = "unknown";

/// Device, date and time block extracted from a recording path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePathInfo {
    pub device_id: String,
    pub date: String,
    pub time_block: String,
}

impl FilePathInfo {
    /// Parse a recording path
    ///
    /// Paths with fewer than five segments, or with an empty device, date or
    /// time block segment, yield [`FilePathInfo::unknown`].
    pub fn parse(file_path: &str) -> Self {
        let parts: Vec<&str> = file_path.split('/').collect();
        if parts.len() < 5 {
            return Self::unknown();
        }

        let (device_id, date, time_block) = (parts[1], parts[2], parts[3]);
        if device_id.is_empty() || date.is_empty() || time_block.is_empty() {
            return Self::unknown();
        }

        Self {
            device_id: device_id.to_string(),
            date: date.to_string(),
            time_block: time_block.to_string(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            device_id: UNKNOWN.to_string(),
            date: UNKNOWN.to_string(),
            time_block: UNKNOWN.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.device_id == UNKNOWN && self.date == UNKNOWN && self.time_block == UNKNOWN
    }
}
