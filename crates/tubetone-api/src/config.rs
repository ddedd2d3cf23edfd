//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tubetone_jobs::{EngineConfig, ReaperConfig};
use tubetone_media::YtDlpConfig;

/// Origins allowed by default (local frontend dev servers).
const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:5174",
];

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Where finished downloads are written and served from
    pub downloads_dir: PathBuf,
    /// Deadline for one fetch/encode call
    pub job_timeout: Duration,
    /// Time between cleanup sweeps
    pub cleanup_interval: Duration,
    /// Downloads older than this are deleted by the sweep
    pub file_max_age: Duration,
    /// How long settled job records are kept
    pub job_record_grace: Duration,
    pub cleanup_enabled: bool,
    pub metrics_enabled: bool,
    /// yt-dlp executable
    pub ytdlp_path: String,
    /// FFmpeg location passed to yt-dlp
    pub ffmpeg_location: Option<String>,
    /// Per-provider metadata lookup timeout
    pub metadata_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            rate_limit_rps: 10,
            max_body_size: 10 * 1024 * 1024, // 10MB
            environment: "development".to_string(),
            downloads_dir: PathBuf::from("downloads"),
            job_timeout: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(30 * 60),
            file_max_age: Duration::from_secs(60 * 60),
            job_record_grace: Duration::ZERO,
            cleanup_enabled: true,
            metrics_enabled: true,
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_location: None,
            metadata_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut cors_origins = std::env::var("CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);
        if let Ok(frontend) = std::env::var("FRONTEND_URL") {
            let frontend = frontend.trim().to_string();
            if !frontend.is_empty() && !cors_origins.contains(&frontend) {
                cors_origins.push(frontend);
            }
        }

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("PORT")
                .or_else(|| env_parse("API_PORT"))
                .unwrap_or(defaults.port),
            cors_origins,
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            downloads_dir: std::env::var("DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.downloads_dir),
            job_timeout: env_secs("JOB_TIMEOUT_SECS").unwrap_or(defaults.job_timeout),
            cleanup_interval: env_secs("CLEANUP_INTERVAL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.cleanup_interval),
            file_max_age: env_secs("FILE_MAX_AGE_SECS").unwrap_or(defaults.file_max_age),
            job_record_grace: env_secs("JOB_RECORD_GRACE_SECS")
                .unwrap_or(defaults.job_record_grace),
            cleanup_enabled: env_flag("CLEANUP_ENABLED").unwrap_or(defaults.cleanup_enabled),
            metrics_enabled: env_flag("METRICS_ENABLED").unwrap_or(defaults.metrics_enabled),
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            ffmpeg_location: std::env::var("FFMPEG_LOCATION")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            metadata_timeout: env_secs("METADATA_TIMEOUT_SECS")
                .unwrap_or(defaults.metadata_timeout),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            downloads_dir: self.downloads_dir.clone(),
            job_timeout: self.job_timeout,
        }
    }

    pub fn reaper_config(&self) -> ReaperConfig {
        ReaperConfig {
            downloads_dir: self.downloads_dir.clone(),
            interval: self.cleanup_interval,
            file_max_age: self.file_max_age,
            job_grace: self.job_record_grace,
            enabled: self.cleanup_enabled,
        }
    }

    pub fn ytdlp_config(&self) -> YtDlpConfig {
        YtDlpConfig {
            binary: self.ytdlp_path.clone(),
            ffmpeg_location: self.ffmpeg_location.clone(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.cors_origins.len(), 3);
        assert_eq!(config.job_timeout, Duration::from_secs(300));
        assert_eq!(config.cleanup_interval, Duration::from_secs(1800));
        assert_eq!(config.file_max_age, Duration::from_secs(3600));
        assert!(!config.is_production());
    }

    #[test]
    fn test_derived_configs() {
        let config = ApiConfig {
            downloads_dir: PathBuf::from("/tmp/out"),
            job_record_grace: Duration::from_secs(60),
            ffmpeg_location: Some("/opt/ffmpeg".to_string()),
            ..ApiConfig::default()
        };

        let engine = config.engine_config();
        assert_eq!(engine.downloads_dir, PathBuf::from("/tmp/out"));
        assert_eq!(engine.job_timeout, Duration::from_secs(300));

        let reaper = config.reaper_config();
        assert_eq!(reaper.job_grace, Duration::from_secs(60));
        assert!(reaper.enabled);

        assert_eq!(config.ytdlp_config().ffmpeg_location.as_deref(), Some("/opt/ffmpeg"));
    }

    #[test]
    fn test_production_flag_is_case_insensitive() {
        let config = ApiConfig {
            environment: "Production".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.is_production());
    }
}
