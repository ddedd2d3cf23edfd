//! Video metadata lookup.
//!
//! Providers are tried in order until one answers. The default chain asks
//! yt-dlp first (full metadata) and falls back to YouTube's oEmbed endpoint
//! (title and author only) when yt-dlp is unavailable or blocked.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use tubetone_models::{watch_url, VideoInfo};

use crate::download::YtDlpConfig;
use crate::error::{MediaError, MediaResult};

/// Default oEmbed endpoint.
pub const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

/// yt-dlp stderr fragments that mean the video itself is unavailable.
const UNAVAILABLE_MARKERS: [&str; 5] = [
    "Video unavailable",
    "Private video",
    "This video is not available",
    "This video has been removed",
    "does not exist",
];

/// A source of video metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short name for logs and for tagging resolved results.
    fn name(&self) -> &'static str;

    /// Look up metadata for `url`, whose extracted ID is `source_id`.
    async fn lookup(&self, url: &str, source_id: &str) -> MediaResult<VideoInfo>;
}

/// Metadata tagged with the provider that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedMetadata {
    pub provider: &'static str,
    pub info: VideoInfo,
}

/// Ordered provider chain.
#[derive(Clone)]
pub struct MetadataResolver {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl MetadataResolver {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        Self { providers }
    }

    /// yt-dlp first, oEmbed second.
    pub fn with_defaults(ytdlp: YtDlpConfig, timeout: Duration) -> MediaResult<Self> {
        Ok(Self::new(vec![
            Arc::new(YtDlpMetadataProvider::new(ytdlp, timeout)),
            Arc::new(OEmbedMetadataProvider::new(timeout)?),
        ]))
    }

    /// Try each provider in turn.
    ///
    /// If every provider fails, the result is `MetadataNotFound` when any
    /// provider reported the video as missing, otherwise the last error.
    pub async fn resolve(&self, url: &str, source_id: &str) -> MediaResult<ResolvedMetadata> {
        let mut not_found: Option<MediaError> = None;
        let mut last_error: Option<MediaError> = None;

        for provider in &self.providers {
            match provider.lookup(url, source_id).await {
                Ok(info) => {
                    info!(provider = provider.name(), source_id, "Resolved video metadata");
                    return Ok(ResolvedMetadata {
                        provider: provider.name(),
                        info,
                    });
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        source_id,
                        "Metadata provider failed: {}", e
                    );
                    if e.is_not_found() {
                        not_found = Some(e);
                    } else {
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(not_found
            .or(last_error)
            .unwrap_or_else(|| MediaError::metadata_failed("No metadata providers configured")))
    }
}

/// Metadata via `yt-dlp --dump-single-json`.
#[derive(Debug, Clone)]
pub struct YtDlpMetadataProvider {
    config: YtDlpConfig,
    timeout: Duration,
}

/// Subset of yt-dlp's info JSON that we use.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    upload_date: Option<String>,
}

impl YtDlpMetadataProvider {
    pub fn new(config: YtDlpConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

fn metadata_args(source_id: &str) -> [String; 6] {
    [
        "--dump-single-json".into(),
        "--skip-download".into(),
        "--no-playlist".into(),
        "--no-warnings".into(),
        "--".into(),
        watch_url(source_id),
    ]
}

/// Convert yt-dlp's info JSON into [`VideoInfo`].
pub fn parse_ytdlp_info(source_id: &str, json: &str) -> MediaResult<VideoInfo> {
    let raw: YtDlpInfo = serde_json::from_str(json)?;
    let author = raw.uploader.or(raw.channel).unwrap_or_default();

    Ok(VideoInfo::new(source_id, raw.title)
        .with_duration(raw.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0))
        .with_author(author)
        .with_views(raw.view_count.unwrap_or(0))
        .with_upload_date(raw.upload_date))
}

#[async_trait]
impl MetadataProvider for YtDlpMetadataProvider {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn lookup(&self, _url: &str, source_id: &str) -> MediaResult<VideoInfo> {
        which::which(&self.config.binary).map_err(|_| MediaError::YtDlpNotFound)?;

        let command = Command::new(&self.config.binary)
            .args(metadata_args(source_id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, command)
            .await
            .map_err(|_| MediaError::Timeout(self.timeout.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp metadata stderr: {}", stderr);
            let message = stderr.lines().last().unwrap_or("Unknown error").to_string();
            if UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m)) {
                return Err(MediaError::metadata_not_found(message));
            }
            return Err(MediaError::metadata_failed(message));
        }

        parse_ytdlp_info(source_id, &String::from_utf8_lossy(&output.stdout))
    }
}

/// Metadata via the public oEmbed endpoint.
#[derive(Debug, Clone)]
pub struct OEmbedMetadataProvider {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
    #[serde(default)]
    author_name: Option<String>,
}

impl OEmbedMetadataProvider {
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        Self::with_endpoint(OEMBED_ENDPOINT, timeout)
    }

    /// Use a custom endpoint (for tests or a proxy).
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl MetadataProvider for OEmbedMetadataProvider {
    fn name(&self) -> &'static str {
        "oembed"
    }

    async fn lookup(&self, _url: &str, source_id: &str) -> MediaResult<VideoInfo> {
        let page_url = watch_url(source_id);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", page_url.as_str()), ("format", "json")])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(MediaError::metadata_not_found(format!(
                    "oEmbed returned {} for {}",
                    response.status(),
                    source_id
                )));
            }
            status => {
                return Err(MediaError::metadata_failed(format!(
                    "oEmbed returned {}",
                    status
                )));
            }
        }

        let body: OEmbedResponse = response.json().await?;
        Ok(VideoInfo::new(source_id, body.title).with_author(body.author_name.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixed {
        name: &'static str,
        result: fn() -> MediaResult<VideoInfo>,
    }

    #[async_trait]
    impl MetadataProvider for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn lookup(&self, _url: &str, _source_id: &str) -> MediaResult<VideoInfo> {
            (self.result)()
        }
    }

    fn provider(name: &'static str, result: fn() -> MediaResult<VideoInfo>) -> Arc<dyn MetadataProvider> {
        Arc::new(Fixed { name, result })
    }

    #[test]
    fn test_metadata_args_end_with_separator_and_watch_url() {
        let args = metadata_args("dQw4w9WgXcQ");
        assert_eq!(args[0], "--dump-single-json");
        assert_eq!(
            &args[4..],
            ["--", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"]
        );
    }

    #[tokio::test]
    async fn test_resolver_falls_back_to_next_provider() {
        let resolver = MetadataResolver::new(vec![
            provider("primary", || Err(MediaError::metadata_failed("blocked"))),
            provider("fallback", || Ok(VideoInfo::new("dQw4w9WgXcQ", "Song"))),
        ]);

        let resolved = resolver.resolve("u", "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(resolved.provider, "fallback");
        assert_eq!(resolved.info.title, "Song");
    }

    #[tokio::test]
    async fn test_resolver_stops_at_first_success() {
        let resolver = MetadataResolver::new(vec![
            provider("primary", || Ok(VideoInfo::new("dQw4w9WgXcQ", "First"))),
            provider("fallback", || panic!("fallback must not be called")),
        ]);

        let resolved = resolver.resolve("u", "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(resolved.provider, "primary");
    }

    #[tokio::test]
    async fn test_resolver_prefers_not_found() {
        let resolver = MetadataResolver::new(vec![
            provider("primary", || Err(MediaError::metadata_not_found("gone"))),
            provider("fallback", || Err(MediaError::metadata_failed("timeout"))),
        ]);

        let err = resolver.resolve("u", "dQw4w9WgXcQ").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolver_without_providers() {
        let err = MetadataResolver::new(vec![])
            .resolve("u", "dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::MetadataFailed(_)));
    }

    #[test]
    fn test_parse_ytdlp_info() {
        let json = r#"{
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "duration": 212.6,
            "uploader": "Rick Astley",
            "view_count": 1500000000,
            "upload_date": "20091025"
        }"#;
        let info = parse_ytdlp_info("dQw4w9WgXcQ", json).unwrap();
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.duration, "213");
        assert_eq!(info.author, "Rick Astley");
        assert_eq!(info.views, 1_500_000_000);
        assert_eq!(info.upload_date.as_deref(), Some("20091025"));
        assert_eq!(info.formats.len(), 3);
    }

    #[test]
    fn test_parse_ytdlp_info_uses_channel_when_uploader_missing() {
        let info = parse_ytdlp_info("dQw4w9WgXcQ", r#"{"title":"t","channel":"Chan"}"#).unwrap();
        assert_eq!(info.author, "Chan");
        assert_eq!(info.duration, "0");
        assert_eq!(info.views, 0);
    }

    #[tokio::test]
    async fn test_oembed_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .and(query_param("url", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Never Gonna Give You Up",
                "author_name": "Rick Astley",
                "thumbnail_url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
            })))
            .mount(&server)
            .await;

        let provider = OEmbedMetadataProvider::with_endpoint(
            format!("{}/oembed", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        let info = provider.lookup("ignored", "dQw4w9WgXcQ").await.unwrap();
        assert_eq!(info.title, "Never Gonna Give You Up");
        assert_eq!(info.author, "Rick Astley");
        assert_eq!(
            info.thumbnail,
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        );
    }

    #[tokio::test]
    async fn test_oembed_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oembed"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = OEmbedMetadataProvider::with_endpoint(
            format!("{}/oembed", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider.lookup("ignored", "AAAAAAAAAAA").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_oembed_server_error_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = OEmbedMetadataProvider::with_endpoint(
            format!("{}/oembed", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider.lookup("ignored", "AAAAAAAAAAA").await.unwrap_err();
        assert!(matches!(err, MediaError::MetadataFailed(_)));
    }
}
