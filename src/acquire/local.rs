//! Local file acquisition

use super::AudioSource;
use crate::error::{Result, SplitError};
use crate::sanitize::join_component;
use crate::status::{self, StatusSink};
use crate::types::{AcquiredFile, AcquisitionOrigin};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Extensions offered when picking a local file
pub const LOCAL_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a"];

/// Check if a path has an extension accepted for local selection
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| LOCAL_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Copies a user-picked file into the working input directory
pub struct LocalFileSource {
    source: PathBuf,
    input_dir: PathBuf,
}

impl LocalFileSource {
    pub fn new(source: impl Into<PathBuf>, input_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            input_dir: input_dir.into(),
        }
    }

    fn copy_into_input(&self) -> Result<PathBuf> {
        if !self.source.is_file() {
            return Err(SplitError::FileNotFound(self.source.clone()));
        }
        if !is_supported_path(&self.source) {
            return Err(SplitError::UnsupportedFormat {
                path: self.source.clone(),
                format: self
                    .source
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }

        let name = self
            .source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let dest = join_component(&self.input_dir, &name, "selected_audio");

        fs::create_dir_all(&self.input_dir)
            .map_err(|e| SplitError::output_error(&self.input_dir, e))?;

        // Selecting a file already inside the input directory needs no copy
        let same_file = match (fs::canonicalize(&self.source), fs::canonicalize(&dest)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            fs::copy(&self.source, &dest).map_err(|e| SplitError::output_error(&dest, e))?;
        }
        Ok(dest)
    }
}

impl AudioSource for LocalFileSource {
    fn acquire(&self, status: &dyn StatusSink) -> Result<AcquiredFile> {
        match self.copy_into_input() {
            Ok(path) => {
                status.report(status::MSG_LOCAL_SELECTED);
                info!("Local file selected: {}", path.display());
                Ok(AcquiredFile {
                    path,
                    origin: AcquisitionOrigin::Local,
                })
            }
            Err(e) => {
                status.report(&status::error_message(&e.summary()));
                error!("File copy error: {}", e);
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "local-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::RecordingSink;
    use tempfile::TempDir;

    #[test]
    fn test_copies_under_original_name() {
        let src_dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let src = src_dir.path().join("song.mp3");
        fs::write(&src, b"audio bytes").unwrap();

        let sink = RecordingSink::new();
        let input_dir = work.path().join("input");
        let acquired = LocalFileSource::new(&src, &input_dir).acquire(&sink).unwrap();

        assert_eq!(acquired.path, input_dir.join("song.mp3"));
        assert_eq!(fs::read(&acquired.path).unwrap(), b"audio bytes");
        assert!(src.exists(), "source must be left in place");
        assert_eq!(sink.last().as_deref(), Some(status::MSG_LOCAL_SELECTED));
    }

    #[test]
    fn test_missing_source_reports_error() {
        let work = TempDir::new().unwrap();
        let sink = RecordingSink::new();
        let result = LocalFileSource::new(work.path().join("nope.mp3"), work.path()).acquire(&sink);
        assert!(matches!(result, Err(SplitError::FileNotFound(_))));
        assert!(sink.last().unwrap().starts_with("❌ Error: File not found"));
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        let src_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("notes.txt");
        fs::write(&src, b"hello").unwrap();
        let result = LocalFileSource::new(&src, src_dir.path().join("input")).acquire(&RecordingSink::new());
        assert!(matches!(result, Err(SplitError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_reselecting_file_in_input_dir() {
        let work = TempDir::new().unwrap();
        let input_dir = work.path().join("input");
        fs::create_dir_all(&input_dir).unwrap();
        let src = input_dir.join("track.FLAC");
        fs::write(&src, b"flac").unwrap();

        let acquired = LocalFileSource::new(&src, &input_dir)
            .acquire(&RecordingSink::new())
            .unwrap();
        assert_eq!(acquired.path, src);
        assert_eq!(fs::read(&src).unwrap(), b"flac");
    }
}
