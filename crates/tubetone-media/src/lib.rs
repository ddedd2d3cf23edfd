//! yt-dlp wrappers for audio extraction and metadata lookup.
//!
//! This crate provides:
//! - The [`AudioFetcher`] seam used by the job engine, with a yt-dlp + FFmpeg
//!   implementation that extracts and encodes the audio track to MP3
//! - Progress parsing from yt-dlp's `--newline` output
//! - An ordered chain of [`MetadataProvider`]s (yt-dlp, then oEmbed)

pub mod download;
pub mod error;
pub mod fetcher;
pub mod metadata;
pub mod progress;

pub use download::{YtDlpConfig, YtDlpFetcher};
pub use error::{MediaError, MediaResult};
pub use fetcher::{AudioFetcher, FetchRequest, ProgressSink};
pub use metadata::{
    MetadataProvider, MetadataResolver, OEmbedMetadataProvider, ResolvedMetadata,
    YtDlpMetadataProvider,
};
pub use progress::parse_download_progress;
