//! Unified error types for stemsplit
//!
//! Error strategy:
//! - Input validation (bad URL, missing/small/short file): report immediately, never retry
//! - Transient automation (element lookup, click, download timeout): retried per attempt
//! - Engine/IO during separation: summarized to one line, full text to the error log
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Audio extensions accepted for local selection
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, OGG, M4A";

/// Top-level error type for stemsplit operations
#[derive(Debug, Error)]
pub enum SplitError {
    // =========================================================================
    // Input validation - reported immediately, no retry
    // =========================================================================
    #[error("Invalid YouTube URL: '{0}'\n  Tip: Use a link like https://www.youtube.com/watch?v=<id> or https://youtu.be/<id>")]
    InvalidUrl(String),

    #[error("No file selected\n  Tip: Select a local file or download one first")]
    NoFileSelected,

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("File is too small ({size_bytes} bytes): '{path}'\n  Tip: The file may be corrupted or the download incomplete")]
    FileTooSmall { path: PathBuf, size_bytes: u64 },

    #[error("Audio too short ({duration:.2}s): '{path}'\n  Tip: The download may have failed")]
    AudioTooShort { path: PathBuf, duration: f64 },

    // =========================================================================
    // Transient automation errors - consumed by the retry loop
    // =========================================================================
    #[error("Browser automation failed: {0}")]
    Browser(String),

    #[error("Timed out after {timeout_secs:.1}s waiting for {what}")]
    ElementTimeout { what: String, timeout_secs: f64 },

    #[error("Download did not complete within {budget_secs:.1}s")]
    DownloadTimeout { budget_secs: f64 },

    #[error("All {attempts} download attempts failed\n  Tip: The conversion site may be slow or have changed its layout; try again later")]
    AttemptsExhausted { attempts: u32 },

    // =========================================================================
    // Engine / output errors - not retried
    // =========================================================================
    #[error("Separation engine unavailable: {reason}\n\n  To enable stem separation:\n  1. Install the separation tool: pip install spleeter\n  2. Make sure `spleeter` is on PATH, or set:\n     export STEMSPLIT_ENGINE=/path/to/spleeter")]
    EngineUnavailable { reason: String },

    #[error("Separation failed: {reason}")]
    Engine { reason: String },

    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    Decode { path: PathBuf, reason: String },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    // =========================================================================
    // Configuration / control
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Another operation is still running\n  Tip: Wait for it to finish before starting a new one")]
    Busy,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stemsplit operations
pub type Result<T> = std::result::Result<T, SplitError>;

impl SplitError {
    /// Returns true for input validation failures (never retried)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SplitError::InvalidUrl(_)
                | SplitError::NoFileSelected
                | SplitError::FileNotFound(_)
                | SplitError::UnsupportedFormat { .. }
                | SplitError::FileTooSmall { .. }
                | SplitError::AudioTooShort { .. }
        )
    }

    /// Returns true if a fresh browser attempt may succeed where this one failed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SplitError::Browser(_)
                | SplitError::ElementTimeout { .. }
                | SplitError::DownloadTimeout { .. }
                | SplitError::Io(_)
        )
    }

    /// First line of the error text, the only form shown to the user
    pub fn summary(&self) -> String {
        first_line(&self.to_string())
    }

    /// Create a browser error from any displayable cause
    pub fn browser(reason: impl std::fmt::Display) -> Self {
        SplitError::Browser(reason.to_string())
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SplitError::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        SplitError::OutputError { path, reason }
    }
}

/// First line of a multi-line message, or a fallback for empty text
pub fn first_line(text: &str) -> String {
    text.lines()
        .next()
        .filter(|line| !line.trim().is_empty())
        .unwrap_or("Unknown error")
        .to_string()
}
