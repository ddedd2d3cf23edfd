//! yt-dlp progress parsing.

/// Share of the overall job attributed to the download phase; the remainder
/// covers FFmpeg post-processing.
const DOWNLOAD_PHASE_WEIGHT: f64 = 0.9;

/// Progress reported once yt-dlp hands the file to FFmpeg.
pub const POSTPROCESS_PERCENT: u8 = 95;

/// Parse the percentage out of a yt-dlp `--newline` download line such as
/// `[download]  42.3% of 3.45MiB at 1.23MiB/s ETA 00:02`.
pub fn parse_download_progress(line: &str) -> Option<f64> {
    let rest = line.trim().strip_prefix("[download]")?.trim_start();
    let (number, _) = rest.split_once('%')?;
    let percent: f64 = number.trim().parse().ok()?;
    if percent.is_finite() {
        Some(percent.clamp(0.0, 100.0))
    } else {
        None
    }
}

/// Whether a yt-dlp line marks the start of audio post-processing.
pub fn is_postprocess_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("[ExtractAudio]") || line.starts_with("[ffmpeg]")
}

/// Map a download-phase percentage onto overall job progress.
pub fn overall_percent(download_percent: f64) -> u8 {
    (download_percent * DOWNLOAD_PHASE_WEIGHT).round().clamp(0.0, 100.0) as u8
}
