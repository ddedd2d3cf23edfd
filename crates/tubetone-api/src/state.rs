//! Application state.

use std::sync::Arc;

use tubetone_jobs::{JobEngine, JobStore};
use tubetone_media::{AudioFetcher, MediaResult, MetadataResolver, YtDlpFetcher};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<JobStore>,
    pub engine: Arc<JobEngine>,
    pub metadata: Arc<MetadataResolver>,
}

impl AppState {
    /// Create application state backed by yt-dlp.
    pub fn new(config: ApiConfig) -> MediaResult<Self> {
        let fetcher = YtDlpFetcher::new(config.ytdlp_config());
        let metadata = MetadataResolver::with_defaults(config.ytdlp_config(), config.metadata_timeout)?;
        Ok(Self::with_components(config, Arc::new(fetcher), metadata))
    }

    /// Create application state from explicit components.
    pub fn with_components(
        config: ApiConfig,
        fetcher: Arc<dyn AudioFetcher>,
        metadata: MetadataResolver,
    ) -> Self {
        let store = Arc::new(JobStore::new());
        let engine = JobEngine::new(Arc::clone(&store), fetcher, config.engine_config());

        Self {
            config,
            store,
            engine: Arc::new(engine),
            metadata: Arc::new(metadata),
        }
    }
}
