//! Utility functions for source URL parsing and filename handling.
//!
//! Source identifiers are extracted by a structured URL parser first and a
//! pattern-based fallback second, so odd-but-valid links (channel paths,
//! `/e/` short embeds, scheme-less input) still resolve.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// Length of a YouTube video ID.
pub const SOURCE_ID_LEN: usize = 11;

/// Title stem used when a request carries no usable title.
pub const DEFAULT_TITLE: &str = "audio";

/// Longest title stem (in bytes) kept in an output filename.
const MAX_TITLE_BYTES: usize = 150;

/// Errors that can occur during source ID extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceIdError {
    /// Input was empty or whitespace
    #[error("URL is required")]
    Empty,
    /// URL is not a valid YouTube URL
    #[error("URL is not a valid YouTube URL")]
    InvalidSourceUrl,
    /// Video ID has invalid format
    #[error("Video ID has invalid format")]
    InvalidId,
    /// Video ID not found in URL
    #[error("Video ID not found in URL")]
    IdNotFound,
}

/// Result type for source ID extraction.
pub type SourceIdResult<T> = Result<T, SourceIdError>;

/// Extract the 11-character video ID from a YouTube URL.
///
/// Supports:
/// - https://youtube.com/watch?v=VIDEO_ID
/// - https://youtu.be/VIDEO_ID
/// - https://youtube.com/embed/VIDEO_ID
/// - https://youtube.com/v/VIDEO_ID
/// - https://youtube.com/shorts/VIDEO_ID
/// - With or without scheme, `www.`/`m.` prefixes, query parameters, fragments
///
/// When the structured parser rejects the input the pattern fallback is tried;
/// if that also fails the structured parser's error is returned.
pub fn extract_source_id(url: &str) -> SourceIdResult<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(SourceIdError::Empty);
    }

    match parse_structured(url) {
        Ok(id) => Ok(id),
        Err(primary) => match extract_with_pattern(url) {
            Some(id) => Ok(id),
            None => Err(primary),
        },
    }
}

/// Structured extraction using a full URL parse.
fn parse_structured(raw: &str) -> SourceIdResult<String> {
    let parsed = Url::parse(raw)
        .or_else(|_| Url::parse(&format!("https://{}", raw)))
        .map_err(|_| SourceIdError::InvalidSourceUrl)?;

    let host = parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or(SourceIdError::InvalidSourceUrl)?;
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(&host);

    let mut segments = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter();

    let candidate = match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "youtube-nocookie.com" => match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned()),
            Some("embed") | Some("v") | Some("shorts") | Some("live") => {
                segments.next().map(str::to_string)
            }
            _ => None,
        },
        _ => return Err(SourceIdError::InvalidSourceUrl),
    };

    match candidate {
        Some(id) => validate_source_id(id),
        None => Err(SourceIdError::IdNotFound),
    }
}

fn source_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s#]{11})(?:[?&#/"\s]|$)"#,
        )
        .expect("source id pattern is valid")
    })
}

/// Pattern-based fallback extraction.
fn extract_with_pattern(url: &str) -> Option<String> {
    source_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| is_valid_source_id_chars(id))
}

/// Check if string contains only valid video ID characters
fn is_valid_source_id_chars(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validate video ID format and return it
fn validate_source_id(id: String) -> SourceIdResult<String> {
    let id = id.trim().to_string();
    if id.len() != SOURCE_ID_LEN || !is_valid_source_id_chars(&id) {
        return Err(SourceIdError::InvalidId);
    }
    Ok(id)
}

/// Canonical watch page URL for a video ID.
pub fn watch_url(source_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", source_id)
}

/// Thumbnail URL for a video ID.
pub fn thumbnail_url(source_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/maxresdefault.jpg", source_id)
}

/// Map an arbitrary title to a filesystem-safe string.
///
/// Keeps ASCII letters and digits, whitespace, `_`, `-`, Arabic and CJK
/// ideographs; everything else is dropped. The result is trimmed and may be
/// empty.
pub fn sanitize_filename(title: &str) -> String {
    let kept: String = title.chars().filter(|&c| is_filename_safe(c)).collect();
    let trimmed = kept.trim();

    if trimmed.len() <= MAX_TITLE_BYTES {
        return trimmed.to_string();
    }

    let mut end = MAX_TITLE_BYTES;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].trim_end().to_string()
}

/// Sanitized title stem for an optional request title, falling back to
/// [`DEFAULT_TITLE`] when nothing usable remains.
pub fn title_stem(title: Option<&str>) -> String {
    title
        .map(sanitize_filename)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

fn is_filename_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || c == '-'
        || (c.is_whitespace() && !c.is_control())
        || ('\u{0600}'..='\u{06FF}').contains(&c)
        || ('\u{4E00}'..='\u{9FFF}').contains(&c)
        || ('\u{3400}'..='\u{4DBF}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_source_id_success_cases() {
        // Standard youtube.com format
        assert_eq!(
            extract_source_id("https://youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        // With www prefix
        assert_eq!(
            extract_source_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        // youtu.be format
        assert_eq!(
            extract_source_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        // Embed format
        assert_eq!(
            extract_source_id("https://youtube.com/embed/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        // /v/ format
        assert_eq!(
            extract_source_id("https://youtube.com/v/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        // Shorts format
        assert_eq!(
            extract_source_id("https://youtube.com/shorts/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        // Mobile host, v not first
        assert_eq!(
            extract_source_id("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        // With query parameters and timestamps
        assert_eq!(
            extract_source_id("https://youtube.com/watch?v=dQw4w9WgXcQ&list=PLrAXtmRdnEQy4qtr")
                .unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_source_id("https://youtu.be/dQw4w9WgXcQ?t=30").unwrap(),
            "dQw4w9WgXcQ"
        );

        // No scheme
        assert_eq!(
            extract_source_id("youtu.be/ABCDEFGHIJK").unwrap(),
            "ABCDEFGHIJK"
        );

        // Extra whitespace (should be trimmed), case variations in domain
        assert_eq!(
            extract_source_id("  https://YOUTUBE.COM/watch?v=dQw4w9WgXcQ  ").unwrap(),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_pattern_fallback_cases() {
        // Channel-style path only the pattern understands
        assert_eq!(
            extract_source_id("https://www.youtube.com/user/someone/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        // Short embed path
        assert_eq!(
            extract_source_id("https://www.youtube.com/e/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        assert_eq!(
            extract_with_pattern("see youtu.be/dQw4w9WgXcQ now"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_with_pattern("https://youtu.be/abc123def456789"), None);
    }

    #[test]
    fn test_extract_source_id_error_cases() {
        assert_eq!(extract_source_id(""), Err(SourceIdError::Empty));
        assert_eq!(extract_source_id("   "), Err(SourceIdError::Empty));

        // Non-YouTube URLs
        assert_eq!(
            extract_source_id("https://example.com"),
            Err(SourceIdError::InvalidSourceUrl)
        );
        assert_eq!(
            extract_source_id("https://vimeo.com/123"),
            Err(SourceIdError::InvalidSourceUrl)
        );
        assert!(extract_source_id("not-a-url").is_err());

        // Valid YouTube domain but no video ID
        assert_eq!(
            extract_source_id("https://youtube.com"),
            Err(SourceIdError::IdNotFound)
        );
        assert_eq!(
            extract_source_id("https://youtu.be/"),
            Err(SourceIdError::IdNotFound)
        );

        // Invalid video ID format
        assert_eq!(
            extract_source_id("https://youtube.com/watch?v=abc123"), // too short
            Err(SourceIdError::InvalidId)
        );
        assert_eq!(
            extract_source_id("https://youtu.be/abc123def456789"), // too long
            Err(SourceIdError::InvalidId)
        );
        assert_eq!(
            extract_source_id("https://youtube.com/watch?v=abc123def!!"), // invalid chars
            Err(SourceIdError::InvalidId)
        );
    }

    #[test]
    fn test_source_id_error_display() {
        assert_eq!(
            SourceIdError::InvalidSourceUrl.to_string(),
            "URL is not a valid YouTube URL"
        );
        assert_eq!(SourceIdError::InvalidId.to_string(), "Video ID has invalid format");
        assert_eq!(SourceIdError::IdNotFound.to_string(), "Video ID not found in URL");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Hello, World! (Live)"), "Hello World Live");
        assert_eq!(sanitize_filename("  a/b\\c:d*e?  "), "abcde");
        assert_eq!(sanitize_filename("track_01 - intro"), "track_01 - intro");
        assert_eq!(sanitize_filename("周杰伦 稻香"), "周杰伦 稻香");
        assert_eq!(sanitize_filename("أغنية"), "أغنية");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("💿🎵"), "");
    }

    #[test]
    fn test_sanitize_filename_truncates_on_char_boundary() {
        let long = "稻".repeat(100);
        let out = sanitize_filename(&long);
        assert!(out.len() <= MAX_TITLE_BYTES);
        assert!(out.chars().all(|c| c == '稻'));
    }

    #[test]
    fn test_title_stem() {
        assert_eq!(title_stem(None), DEFAULT_TITLE);
        assert_eq!(title_stem(Some("!!!")), DEFAULT_TITLE);
        assert_eq!(title_stem(Some("My Song")), "My Song");
    }

    #[test]
    fn test_thumbnail_url() {
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ"),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        );
    }
}
