//! Core data types for stemsplit
//!
//! These types flow from acquisition to separation. Nothing here is global:
//! every value is created by one operation and handed explicitly to the next.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Acquisition
// =============================================================================

/// What the user asked to acquire. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionRequest {
    /// Copy a file from local disk
    Local(PathBuf),
    /// Obtain an MP3 through the web conversion service
    Remote(String),
}

impl AcquisitionRequest {
    /// Interpret free-form user input.
    ///
    /// An existing file is always local. Otherwise the input is remote when it
    /// carries an http(s) scheme or starts with a web host (`www.` or a YouTube
    /// domain); everything else is treated as a path.
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if std::path::Path::new(trimmed).exists() {
            return AcquisitionRequest::Local(PathBuf::from(trimmed));
        }

        let lower = trimmed.to_ascii_lowercase();
        let has_scheme = lower.starts_with("http://") || lower.starts_with("https://");
        let host = lower.split('/').next().unwrap_or_default();
        let looks_like_host = host.starts_with("www.")
            || host == "youtube.com"
            || host.ends_with(".youtube.com")
            || host == "youtu.be";

        if has_scheme || looks_like_host {
            AcquisitionRequest::Remote(trimmed.to_string())
        } else {
            AcquisitionRequest::Local(PathBuf::from(trimmed))
        }
    }
}

/// A file that is ready in the working input directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquiredFile {
    /// Location inside the working input directory
    pub path: PathBuf,
    /// Which producer delivered it
    pub origin: AcquisitionOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionOrigin {
    Local,
    Remote,
}

/// Outcome of one browser attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// One open-to-teardown cycle of the remote scrape. Lives only within one acquisition.
#[derive(Debug, Clone)]
pub struct DownloadAttempt {
    /// 1-based attempt number
    pub ordinal: u32,
    pub outcome: AttemptOutcome,
    /// Time spent polling the download directory
    pub poll_elapsed: Duration,
}

impl DownloadAttempt {
    pub fn new(ordinal: u32) -> Self {
        Self {
            ordinal,
            outcome: AttemptOutcome::Pending,
            poll_elapsed: Duration::ZERO,
        }
    }
}

// =============================================================================
// Separation
// =============================================================================

/// Number of stems the engine is configured for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StemCount {
    #[default]
    Two,
    Four,
    Five,
}

impl StemCount {
    pub fn from_count(count: u8) -> Option<Self> {
        match count {
            2 => Some(StemCount::Two),
            4 => Some(StemCount::Four),
            5 => Some(StemCount::Five),
            _ => None,
        }
    }

    pub fn count(self) -> u8 {
        match self {
            StemCount::Two => 2,
            StemCount::Four => 4,
            StemCount::Five => 5,
        }
    }

    /// Stem labels produced for this configuration
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            StemCount::Two => &["vocals", "accompaniment"],
            StemCount::Four => &["vocals", "drums", "bass", "other"],
            StemCount::Five => &["vocals", "drums", "bass", "piano", "other"],
        }
    }

    /// Human description, as offered to the user
    pub fn describe(self) -> &'static str {
        match self {
            StemCount::Two => "2 Stems (Vocals + Accompaniment)",
            StemCount::Four => "4 Stems (Vocals + Drums + Bass + Other)",
            StemCount::Five => "5 Stems (Vocals + Drums + Bass + Piano + Other)",
        }
    }
}

/// Stereo audio buffer at full fidelity
#[derive(Debug, Clone)]
pub struct StereoBuffer {
    /// Left channel samples normalized to [-1.0, 1.0]
    pub left: Vec<f32>,
    /// Right channel samples normalized to [-1.0, 1.0]
    pub right: Vec<f32>,
    /// Sample rate in Hz (typically 44100)
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl StereoBuffer {
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        let num_samples = left.len().min(right.len());
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            num_samples as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            left,
            right,
            sample_rate,
            duration,
        }
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.left.len().min(self.right.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create from interleaved samples, duplicating mono input onto both channels
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        match channels {
            0 => Self::new(Vec::new(), Vec::new(), sample_rate),
            1 => Self::new(samples.to_vec(), samples.to_vec(), sample_rate),
            n => {
                let frames = samples.len() / n;
                let mut left = Vec::with_capacity(frames);
                let mut right = Vec::with_capacity(frames);
                for frame in samples.chunks_exact(n) {
                    left.push(frame[0]);
                    right.push(frame[1]);
                }
                Self::new(left, right, sample_rate)
            }
        }
    }
}

/// Engine output: stem label to decoded waveform
pub type StemSet = BTreeMap<String, StereoBuffer>;

/// One separation run. Created at trigger time, discarded after completion.
#[derive(Debug, Clone)]
pub struct SeparationJob {
    pub input: PathBuf,
    /// Timestamped directory, unique per invocation
    pub output_dir: PathBuf,
    pub stems: StemCount,
}

/// What a finished separation wrote to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationReport {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub stems: StemCount,
    /// Written `<label>.wav` files, sorted by label
    pub files: Vec<PathBuf>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}
