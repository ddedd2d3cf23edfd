//! Audio extraction using yt-dlp.
//!
//! yt-dlp downloads the best audio stream and hands it to FFmpeg, which
//! encodes it to MP3 at the requested bitrate. Progress is read from
//! yt-dlp's `--newline` output and forwarded to a [`ProgressSink`].

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::fetcher::{AudioFetcher, FetchRequest, ProgressSink};
use crate::progress::{is_postprocess_line, overall_percent, parse_download_progress, POSTPROCESS_PERCENT};

/// Browser-like headers sent with every yt-dlp request.
const REQUEST_HEADERS: [&str; 4] = [
    "User-Agent:Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Accept:text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    "Accept-Language:en-us,en;q=0.5",
    "Sec-Fetch-Mode:navigate",
];

/// Number of trailing stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 20;

/// yt-dlp invocation settings.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// yt-dlp executable name or path
    pub binary: String,
    /// Directory or path of the FFmpeg binary yt-dlp should use
    pub ffmpeg_location: Option<String>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            ffmpeg_location: None,
        }
    }
}

/// [`AudioFetcher`] backed by the yt-dlp CLI.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher {
    config: YtDlpConfig,
}

impl YtDlpFetcher {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    /// Build the yt-dlp argument list for a request.
    ///
    /// The output template swaps the `.mp3` extension for `%(ext)s` so the
    /// intermediate download and the final encode land next to each other
    /// and the encoded file ends up exactly at `request.output_path`.
    pub fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        let template = request.output_path.with_extension("%(ext)s");

        let mut args: Vec<String> = vec![
            "--extract-audio".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--postprocessor-args".into(),
            format!("ffmpeg:-b:a {}", request.format.ffmpeg_bitrate()),
            "-f".into(),
            "bestaudio/best".into(),
            "--no-playlist".into(),
            "--prefer-free-formats".into(),
            "--no-check-certificates".into(),
            "--newline".into(),
            "--no-part".into(),
            "-o".into(),
            template.to_string_lossy().into_owned(),
        ];

        for header in REQUEST_HEADERS {
            args.push("--add-header".into());
            args.push(header.into());
        }

        if let Some(location) = &self.config.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.clone());
        }

        // Nothing after the separator is read as an option
        args.push("--".into());
        args.push(request.source_url());
        args
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch(&self, request: &FetchRequest, progress: ProgressSink) -> MediaResult<()> {
        let output_path = request.output_path.as_path();

        which::which(&self.config.binary).map_err(|_| MediaError::YtDlpNotFound)?;

        info!(
            url = %request.url,
            output = %output_path.display(),
            bitrate = request.format.bitrate_kbps,
            "Starting yt-dlp audio download"
        );

        let args = self.build_args(request);
        debug!("Running yt-dlp: {} {}", self.config.binary, args.join(" "));

        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::download_failed("yt-dlp stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::download_failed("yt-dlp stderr not captured"))?;

        let stdout_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut last_reported = 0u8;
            while let Ok(Some(line)) = lines.next_line().await {
                let percent = if let Some(pct) = parse_download_progress(&line) {
                    overall_percent(pct)
                } else if is_postprocess_line(&line) {
                    POSTPROCESS_PERCENT
                } else {
                    continue;
                };
                if percent > last_reported {
                    last_reported = percent;
                    progress.report(percent);
                }
            }
        });

        let stderr_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail: Vec<String> = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!("yt-dlp stderr: {}", trimmed);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(trimmed.to_string());
            }
            tail
        });

        let status = child.wait().await?;
        let _ = stdout_handle.await;
        let stderr_tail = stderr_handle.await.unwrap_or_default();

        if !status.success() {
            let error_line = stderr_tail
                .iter()
                .rev()
                .find(|l| l.starts_with("ERROR"))
                .or_else(|| stderr_tail.last())
                .map(String::as_str)
                .unwrap_or("Unknown error");

            warn!(
                url = %request.url,
                exit_code = ?status.code(),
                "yt-dlp exited with failure"
            );

            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                error_line
            )));
        }

        ensure_output_exists(output_path).await?;

        info!(output = %output_path.display(), "yt-dlp audio download complete");
        Ok(())
    }
}

async fn ensure_output_exists(path: &Path) -> MediaResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(_) => Err(MediaError::download_failed("File was not created by yt-dlp")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tubetone_models::AudioFormat;

    fn request() -> FetchRequest {
        FetchRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            source_id: "dQw4w9WgXcQ".to_string(),
            output_path: PathBuf::from("/srv/downloads/My Song_1a2b3c4d.mp3"),
            format: AudioFormat { bitrate_kbps: 256 },
        }
    }

    #[test]
    fn test_build_args_output_template_and_bitrate() {
        let fetcher = YtDlpFetcher::default();
        let args = fetcher.build_args(&request());

        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "/srv/downloads/My Song_1a2b3c4d.%(ext)s");

        let pp = args.iter().position(|a| a == "--postprocessor-args").unwrap();
        assert_eq!(args[pp + 1], "ffmpeg:-b:a 256k");

        assert!(args.contains(&"--newline".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(
            &args[args.len() - 2..],
            ["--", "https://www.youtube.com/watch?v=dQw4w9WgXcQ"]
        );
        assert!(!args.contains(&"--ffmpeg-location".to_string()));
    }

    #[test]
    fn test_build_args_never_pass_client_text() {
        let fetcher = YtDlpFetcher::default();
        let hostile = "--exec=touch /tmp/owned youtu.be/dQw4w9WgXcQ";
        let source_id = tubetone_models::extract_source_id(hostile).unwrap();
        let args = fetcher.build_args(&FetchRequest {
            url: hostile.to_string(),
            source_id,
            ..request()
        });

        assert!(args.iter().all(|a| !a.contains("--exec")));
        assert_eq!(args.iter().filter(|a| *a == "--").count(), 1);
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_build_args_with_ffmpeg_location() {
        let fetcher = YtDlpFetcher::new(YtDlpConfig {
            binary: "yt-dlp".into(),
            ffmpeg_location: Some("/opt/ffmpeg/bin".into()),
        });
        let args = fetcher.build_args(&request());
        let pos = args.iter().position(|a| a == "--ffmpeg-location").unwrap();
        assert_eq!(args[pos + 1], "/opt/ffmpeg/bin");
        assert_eq!(
            args.iter().filter(|a| *a == "--add-header").count(),
            REQUEST_HEADERS.len()
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let fetcher = YtDlpFetcher::new(YtDlpConfig {
            binary: "definitely-not-a-real-yt-dlp-binary".into(),
            ffmpeg_location: None,
        });
        let err = fetcher
            .fetch(&request(), ProgressSink::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::YtDlpNotFound));
    }
}
