//! Audio output format selection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::video::FormatOption;

/// File extension of every encoded output.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Format used when a request does not name one.
pub const DEFAULT_FORMAT: &str = "mp3-320";

/// Bitrates offered to clients, highest first.
pub const SUPPORTED_BITRATES: [u32; 3] = [320, 256, 128];

/// Bitrate used for any suffix outside [`SUPPORTED_BITRATES`].
const FALLBACK_BITRATE: u32 = 128;

/// Errors produced while parsing a format selector such as `mp3-320`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Unsupported audio container: {0}")]
    UnsupportedContainer(String),

    #[error("Invalid bitrate in format selector: {0}")]
    InvalidBitrate(String),
}

/// Target encoding for a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AudioFormat {
    /// Audio bitrate in kbps
    pub bitrate_kbps: u32,
}

impl AudioFormat {
    /// Parse an optional selector, falling back to [`DEFAULT_FORMAT`].
    pub fn from_selector(selector: Option<&str>) -> Result<Self, FormatError> {
        match selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s.parse(),
            None => DEFAULT_FORMAT.parse(),
        }
    }

    /// Selector string as shown to clients (`mp3-<bitrate>`).
    pub fn selector(&self) -> String {
        format!("{}-{}", AUDIO_EXTENSION, self.bitrate_kbps)
    }

    /// Bitrate formatted for ffmpeg (`320k`).
    pub fn ffmpeg_bitrate(&self) -> String {
        format!("{}k", self.bitrate_kbps)
    }

    /// The fixed list of formats advertised by the video-info endpoint.
    pub fn options() -> Vec<FormatOption> {
        SUPPORTED_BITRATES
            .iter()
            .map(|&bitrate_kbps| {
                let format = AudioFormat { bitrate_kbps };
                FormatOption {
                    id: format.selector(),
                    label: format!("MP3 {}kbps", bitrate_kbps),
                    quality: format!("{}kbps", bitrate_kbps),
                    kind: "audio".to_string(),
                }
            })
            .collect()
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self { bitrate_kbps: 320 }
    }
}

impl FromStr for AudioFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (container, bitrate) = s
            .split_once('-')
            .ok_or_else(|| FormatError::InvalidBitrate(s.to_string()))?;

        if !container.eq_ignore_ascii_case(AUDIO_EXTENSION) {
            return Err(FormatError::UnsupportedContainer(container.to_string()));
        }

        let requested: u32 = bitrate
            .trim_end_matches(|c| c == 'k' || c == 'K')
            .parse()
            .map_err(|_| FormatError::InvalidBitrate(s.to_string()))?;

        let bitrate_kbps = if SUPPORTED_BITRATES.contains(&requested) {
            requested
        } else {
            FALLBACK_BITRATE
        };

        Ok(Self { bitrate_kbps })
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector())
    }
}
