//! Download directory polling
//!
//! After the download control is clicked the browser writes into the attempt's
//! download directory. We cannot observe the browser's download manager, only
//! the files it leaves behind: a completed-extension file means done, a
//! partial-download marker means still running.

use crate::config::PollConfig;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// What one look at the download directory found
#[derive(Debug, Default)]
pub struct DirSnapshot {
    /// Finished downloads, sorted by name
    pub completed: Vec<PathBuf>,
    /// Partial-download markers
    pub in_progress: Vec<PathBuf>,
}

/// Result of a full poll run
#[derive(Debug)]
pub struct PollReport {
    /// The completed download, if one appeared within the budget
    pub file: Option<PathBuf>,
    pub elapsed: Duration,
    /// Regular poll ticks performed
    pub ticks: u32,
    /// Extra re-checks performed because no in-progress marker was visible
    pub grace_checks: u32,
}

/// Classify the files currently in `dir`
pub fn snapshot(dir: &Path, config: &PollConfig) -> Result<DirSnapshot> {
    let mut snap = DirSnapshot::default();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if config.completed_extensions.iter().any(|c| *c == ext) {
            snap.completed.push(path);
        } else if config.in_progress_extensions.iter().any(|p| *p == ext) {
            snap.in_progress.push(path);
        }
    }

    snap.completed.sort();
    Ok(snap)
}

/// Wait for a completed download to show up in `dir`.
///
/// Each tick sleeps one interval and then looks at the directory. When no
/// partial-download marker is visible the browser may simply not have created
/// one yet, so we wait one grace interval and look again before moving on.
/// Returns a report with `file: None` once the budget is spent.
pub fn wait_for_download(dir: &Path, config: &PollConfig) -> Result<PollReport> {
    let start = Instant::now();
    let mut ticks = 0u32;
    let mut grace_checks = 0u32;

    let found = |file: PathBuf, ticks: u32, grace_checks: u32| PollReport {
        file: Some(file),
        elapsed: start.elapsed(),
        ticks,
        grace_checks,
    };

    // At least one tick runs, so a failure always follows a look at the directory
    loop {
        thread::sleep(config.interval);
        ticks += 1;

        let snap = snapshot(dir, config)?;
        trace!(
            "Poll tick {}: {} completed, {} in progress",
            ticks,
            snap.completed.len(),
            snap.in_progress.len()
        );

        if let Some(file) = snap.completed.into_iter().next() {
            debug!("Download complete: {}", file.display());
            return Ok(found(file, ticks, grace_checks));
        }

        if snap.in_progress.is_empty() {
            thread::sleep(config.grace);
            grace_checks += 1;
            if let Some(file) = snapshot(dir, config)?.completed.into_iter().next() {
                debug!("Download complete (no partial marker seen): {}", file.display());
                return Ok(found(file, ticks, grace_checks));
            }
        }

        if start.elapsed() >= config.budget {
            break;
        }
    }

    debug!(
        "No completed download in {} after {:.1}s ({} ticks, {} grace checks)",
        dir.display(),
        start.elapsed().as_secs_f64(),
        ticks,
        grace_checks
    );

    Ok(PollReport {
        file: None,
        elapsed: start.elapsed(),
        ticks,
        grace_checks,
    })
}
