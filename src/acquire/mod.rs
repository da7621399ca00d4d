//! Audio acquisition
//!
//! Two interchangeable producers of a local audio file: a copy from disk and a
//! scripted download through a web conversion service. Both deliver an
//! [`AcquiredFile`] inside the working input directory.

pub mod browser;
pub mod local;
pub mod poll;
pub mod remote;
pub mod video_id;
pub mod webdriver;

use crate::error::Result;
use crate::status::StatusSink;
use crate::types::AcquiredFile;

pub use browser::{BrowserBackend, BrowserSession, ElementRef, LaunchOptions, Locator, WaitFor};
pub use local::LocalFileSource;
pub use remote::{RemoteDirs, RemoteScrapeSource};
pub use video_id::extract_video_id;
pub use webdriver::WebDriverBackend;

/// Producer of an audio file for the next separation
pub trait AudioSource: Send + Sync {
    /// Obtain the file, reporting progress to `status`.
    ///
    /// Failures are reported to `status` before being returned, so callers may
    /// ignore the error value and still have shown the user what happened.
    fn acquire(&self, status: &dyn StatusSink) -> Result<AcquiredFile>;

    /// Get the name of this source (for logging)
    fn name(&self) -> &'static str;
}
