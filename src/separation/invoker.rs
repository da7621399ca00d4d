//! Separation invoker
//!
//! Validates the candidate input, creates a fresh timestamped output
//! directory, probes it for write access, runs the engine and writes one
//! `<label>.wav` per stem. The engine is never called unless the input passed
//! validation.

use super::engine::StemEngine;
use super::error_log::ErrorLog;
use crate::audio;
use crate::config::ValidationLimits;
use crate::error::{Result, SplitError};
use crate::sanitize::join_component;
use crate::status::{self, StatusSink};
use crate::types::{SeparationJob, SeparationReport, StemCount};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Name of the throwaway file used to verify write access
const WRITE_PROBE_NAME: &str = "write_test.tmp";

/// Check that `candidate` is fit for separation.
///
/// Existence and size are hard requirements. The duration check is best
/// effort: if the file cannot be probed the check is skipped with a warning.
pub fn validate_input(candidate: Option<&Path>, limits: &ValidationLimits) -> Result<PathBuf> {
    let path = candidate.ok_or(SplitError::NoFileSelected)?;

    if !path.is_file() {
        return Err(SplitError::FileNotFound(path.to_path_buf()));
    }

    let size_bytes = fs::metadata(path)?.len();
    if size_bytes < limits.min_size_bytes {
        return Err(SplitError::FileTooSmall {
            path: path.to_path_buf(),
            size_bytes,
        });
    }

    match audio::probe_duration(path) {
        Ok(duration) if duration < limits.min_duration_secs => {
            return Err(SplitError::AudioTooShort {
                path: path.to_path_buf(),
                duration,
            });
        }
        Ok(duration) => debug!("Input duration {:.2}s", duration),
        Err(e) => warn!("Audio duration check skipped: {}", e),
    }

    Ok(path.to_path_buf())
}

/// Status line for a validation failure
fn validation_message(err: &SplitError) -> String {
    match err {
        SplitError::NoFileSelected => status::MSG_NO_FILE.to_string(),
        SplitError::FileNotFound(_) => status::MSG_FILE_NOT_FOUND.to_string(),
        SplitError::FileTooSmall { .. } => status::MSG_FILE_TOO_SMALL.to_string(),
        SplitError::AudioTooShort { .. } => status::MSG_AUDIO_TOO_SHORT.to_string(),
        other => status::failure_message(&other.summary()),
    }
}

/// Create `output_<unix timestamp>` under `root`, adding a suffix if a run in
/// the same second already claimed the name.
pub fn create_output_dir(root: &Path) -> Result<PathBuf> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    fs::create_dir_all(root).map_err(|e| SplitError::output_error(root, e))?;

    let mut candidate = root.join(format!("output_{}", timestamp));
    let mut suffix = 1u32;
    loop {
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                candidate = root.join(format!("output_{}_{}", timestamp, suffix));
                suffix += 1;
            }
            Err(e) => return Err(SplitError::output_error(&candidate, e)),
        }
    }
}

/// Write and remove a small file to prove the directory accepts output
fn write_probe(dir: &Path) -> Result<()> {
    let probe = dir.join(WRITE_PROBE_NAME);
    fs::write(&probe, b"test").map_err(|e| SplitError::output_error(&probe, e))?;
    fs::remove_file(&probe).map_err(|e| SplitError::output_error(&probe, e))?;
    debug!("Write test successful in {}", dir.display());
    Ok(())
}

/// Runs separation jobs against one engine
pub struct SeparationInvoker {
    engine: Arc<dyn StemEngine>,
    limits: ValidationLimits,
    output_root: PathBuf,
    error_log: ErrorLog,
}

impl SeparationInvoker {
    pub fn new(
        engine: Arc<dyn StemEngine>,
        limits: ValidationLimits,
        output_root: impl Into<PathBuf>,
        error_log: ErrorLog,
    ) -> Self {
        Self {
            engine,
            limits,
            output_root: output_root.into(),
            error_log,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Validate, report any failure, and build the job with a fresh output directory
    pub fn prepare(
        &self,
        candidate: Option<&Path>,
        stems: StemCount,
        status: &dyn StatusSink,
    ) -> Result<SeparationJob> {
        let input = validate_input(candidate, &self.limits).map_err(|e| {
            status.report(&validation_message(&e));
            warn!("Input rejected: {}", e);
            e
        })?;

        let output_dir = create_output_dir(&self.output_root).map_err(|e| self.fail(e, status))?;
        info!("Created output directory: {}", output_dir.display());

        Ok(SeparationJob {
            input,
            output_dir,
            stems,
        })
    }

    /// Run a prepared job. Failures are summarized to one status line and
    /// written in full to the error log.
    pub fn run(&self, job: &SeparationJob, status: &dyn StatusSink) -> Result<SeparationReport> {
        status.report(status::MSG_SEPARATION_STARTED);
        info!(
            "Separating {} into {} stems with {} -> {}",
            job.input.display(),
            job.stems.count(),
            self.engine.name(),
            job.output_dir.display()
        );

        match self.execute(job) {
            Ok(report) => {
                status.report(status::MSG_SEPARATION_DONE);
                info!("Output saved to: {}", report.output_dir.display());
                Ok(report)
            }
            Err(e) => Err(self.fail(e, status)),
        }
    }

    /// Validate the candidate and run the separation end to end
    pub fn separate(
        &self,
        candidate: Option<&Path>,
        stems: StemCount,
        status: &dyn StatusSink,
    ) -> Result<SeparationReport> {
        let job = self.prepare(candidate, stems, status)?;
        self.run(&job, status)
    }

    fn execute(&self, job: &SeparationJob) -> Result<SeparationReport> {
        if !job.input.is_file() {
            return Err(SplitError::FileNotFound(job.input.clone()));
        }
        fs::create_dir_all(&job.output_dir).map_err(|e| SplitError::output_error(&job.output_dir, e))?;
        write_probe(&job.output_dir)?;

        let stems = self.engine.separate(&job.input, job.stems)?;
        if stems.is_empty() {
            return Err(SplitError::Engine {
                reason: "Engine produced no stems".to_string(),
            });
        }

        let mut files = Vec::with_capacity(stems.len());
        for (label, buffer) in &stems {
            let path = join_component(&job.output_dir, &format!("{}.wav", label), "stem.wav");
            info!("Saving: {}", path.display());
            audio::write_stereo_wav(&path, buffer)?;
            files.push(path);
        }

        Ok(SeparationReport {
            input: job.input.clone(),
            output_dir: job.output_dir.clone(),
            stems: job.stems,
            files,
            finished_at: chrono::Utc::now(),
        })
    }

    /// Log the full error, report its first line, hand it back
    fn fail(&self, err: SplitError, status: &dyn StatusSink) -> SplitError {
        error!("Separation failed: {}", err);
        if let Err(log_err) = self.error_log.append(&err.to_string()) {
            warn!(
                "Could not write {}: {}",
                self.error_log.path().display(),
                log_err
            );
        }
        status.report(&status::failure_message(&err.summary()));
        err
    }
}
