//! The fetch/encode seam used by the job engine.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use tubetone_models::{watch_url, AudioFormat};

use crate::error::MediaResult;

/// Everything an [`AudioFetcher`] needs to produce one output file.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Source URL as submitted by the client, for logs only
    pub url: String,
    /// Validated video ID
    pub source_id: String,
    /// Destination file; the fetcher must write the encoded audio here
    pub output_path: PathBuf,
    /// Target encoding
    pub format: AudioFormat,
}

impl FetchRequest {
    /// URL handed to external tools, rebuilt from the validated ID.
    pub fn source_url(&self) -> String {
        watch_url(&self.source_id)
    }
}

/// Channel for informational progress percentages.
///
/// Reports are best-effort: a sink whose receiver is gone silently drops them.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    sender: Option<mpsc::UnboundedSender<u8>>,
}

impl ProgressSink {
    /// Create a sink and the receiver its reports arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<u8>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// A sink that discards every report.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Report a percentage (clamped to 100).
    pub fn report(&self, percent: u8) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(percent.min(100));
        }
    }
}

/// External fetch + transcode capability.
///
/// Implementations resolve once the output file has been fully written, or
/// fail with a [`crate::MediaError`] whose message is shown to clients.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fetch the source's audio track and encode it to `request.output_path`.
    async fn fetch(&self, request: &FetchRequest, progress: ProgressSink) -> MediaResult<()>;
}
