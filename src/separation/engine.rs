//! Separation engine backends
//!
//! The engine does all of the actual source separation. This crate only
//! decides what to feed it and where its output goes.

use crate::audio;
use crate::error::{Result, SplitError};
use crate::types::{StemCount, StemSet};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Sample rate the engine produces stems at
pub const ENGINE_SAMPLE_RATE: u32 = 44100;

/// Stem separation backend
pub trait StemEngine: Send + Sync {
    /// Separate `input` into the stems of `stems`, returning label -> waveform
    fn separate(&self, input: &Path, stems: StemCount) -> Result<StemSet>;

    /// Check if the engine can run (tool installed, model present, ...)
    fn is_available(&self) -> bool;

    /// Get the name of this engine (for logging)
    fn name(&self) -> &'static str;
}

/// Runs the `spleeter` command-line tool and reads its stems back
pub struct SpleeterCliEngine {
    program: PathBuf,
}

impl SpleeterCliEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn preset(stems: StemCount) -> String {
        format!("spleeter:{}stems", stems.count())
    }
}

impl StemEngine for SpleeterCliEngine {
    fn separate(&self, input: &Path, stems: StemCount) -> Result<StemSet> {
        let scratch = TempDir::new()?;

        info!(
            "Running {} with {} on {}",
            self.program.display(),
            Self::preset(stems),
            input.display()
        );

        let output = Command::new(&self.program)
            .arg("separate")
            .arg("-p")
            .arg(Self::preset(stems))
            .arg("-o")
            .arg(scratch.path())
            .arg(input)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SplitError::EngineUnavailable {
                reason: format!("Failed to start {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SplitError::Engine {
                reason: format!(
                    "{} exited with {}\n{}",
                    self.program.display(),
                    output.status,
                    stderr.trim()
                ),
            });
        }

        // The tool writes <scratch>/<input stem>/<label>.wav
        let track_name = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let produced = scratch.path().join(track_name);

        let mut set = StemSet::new();
        for label in stems.labels() {
            let path = produced.join(format!("{}.wav", label));
            if !path.is_file() {
                return Err(SplitError::Engine {
                    reason: format!("Expected stem '{}' was not produced at {}", label, path.display()),
                });
            }
            let buffer = audio::decode_stereo(&path)?;
            if buffer.sample_rate != ENGINE_SAMPLE_RATE {
                warn!(
                    "Stem {} came back at {}Hz, expected {}Hz",
                    label, buffer.sample_rate, ENGINE_SAMPLE_RATE
                );
            }
            debug!("Read stem {} ({:.2}s)", label, buffer.duration);
            set.insert(label.to_string(), buffer);
        }

        Ok(set)
    }

    fn is_available(&self) -> bool {
        let probe = Command::new(&self.program)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match probe {
            Ok(status) => {
                debug!("{} --help exited with {}", self.program.display(), status);
                true
            }
            Err(e) => {
                debug!("{} is not runnable: {}", self.program.display(), e);
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "spleeter-cli"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_name_and_preset() {
        let engine = SpleeterCliEngine::new("spleeter");
        assert_eq!(engine.name(), "spleeter-cli");
        assert_eq!(SpleeterCliEngine::preset(StemCount::Five), "spleeter:5stems");
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let engine = SpleeterCliEngine::new("/nonexistent/stemsplit-engine");
        assert!(!engine.is_available());
        let result = engine.separate(Path::new("song.mp3"), StemCount::Two);
        assert!(matches!(result, Err(SplitError::EngineUnavailable { .. })));
    }
}
