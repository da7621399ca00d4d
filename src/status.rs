//! Status reporting
//!
//! Workers never touch the presentation layer directly. They push
//! human-readable strings into a [`StatusSink`]; the front end subscribes to a
//! channel and renders whatever arrives.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Mutex;
use tracing::{debug, info};

/// Maximum length of an unexpected-error status line
pub const MAX_STATUS_LEN: usize = 200;

pub const MSG_INVALID_URL: &str = "❌ Invalid YouTube URL.";
pub const MSG_STARTING_CONVERSION: &str = "🔁 Starting conversion process...";
pub const MSG_DOWNLOAD_BUTTON_MISSING: &str = "❌ Download button not found. Retrying...";
pub const MSG_DOWNLOAD_STARTED: &str = "📥 Download started...";
pub const MSG_DOWNLOAD_FAILED: &str = "❌ Download failed or timed out.";
pub const MSG_DOWNLOAD_READY: &str = "✅ MP3 downloaded and ready.";
pub const MSG_LOCAL_SELECTED: &str = "✅ Local file selected.";
pub const MSG_FILE_NOT_FOUND: &str = "❌ Selected file not found!";
pub const MSG_FILE_TOO_SMALL: &str = "❌ File is too small (corrupted?)";
pub const MSG_AUDIO_TOO_SHORT: &str = "❌ Audio too short (download failed?)";
pub const MSG_NO_FILE: &str = "❌ Please select or download an audio file.";
pub const MSG_SEPARATION_STARTED: &str = "🎧 Starting audio separation...";
pub const MSG_SEPARATION_DONE: &str = "✅ Separation completed successfully!";

pub fn attempt_message(ordinal: u32, total: u32) -> String {
    format!("⚙️ Attempt {}/{}...", ordinal, total)
}

pub fn exhausted_message(total: u32) -> String {
    format!("❌ All {} attempts failed. Please try again later.", total)
}

/// Status line for an unexpected error, truncated on a char boundary
pub fn error_message(detail: &str) -> String {
    format!("❌ Error: {}", detail).chars().take(MAX_STATUS_LEN).collect()
}

/// Status line for a failed separation: only the first line of the error
pub fn failure_message(summary: &str) -> String {
    format!("❌ {}", summary)
}

/// Single-argument text channel consumed by the presentation layer and the log
pub trait StatusSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Forwards status lines to the tracing log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn report(&self, message: &str) {
        info!("{}", message);
    }
}

/// Forwards status lines over a channel to whoever renders them
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiving end for the presentation layer
    pub fn new() -> (Self, Receiver<String>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelSink {
    fn report(&self, message: &str) {
        debug!("status: {}", message);
        // A dropped receiver means nobody is rendering anymore; the log still has it
        let _ = self.tx.send(message.to_string());
    }
}

/// Keeps every reported line; the last one is the visible status.
///
/// Test support only: no front end uses it.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.lines.lock().ok().and_then(|l| l.last().cloned())
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}
