//! Remote acquisition through the web conversion service
//!
//! Each attempt is a full open-to-teardown browser session:
//! open page -> submit link -> convert -> await download control -> click
//! download -> poll the attempt's download directory -> move the file into
//! the working input directory. Any failure tears the session down and moves
//! on to the next attempt; the first success returns immediately.

use super::browser::{BrowserBackend, BrowserSession, LaunchOptions, Locator, WaitFor};
use super::poll;
use super::video_id::extract_video_id;
use super::AudioSource;
use crate::config::{ConverterSite, PollConfig, RetryPolicy};
use crate::error::{Result, SplitError};
use crate::sanitize::join_component;
use crate::status::{self, StatusSink};
use crate::types::{AcquiredFile, AcquisitionOrigin, AttemptOutcome, DownloadAttempt};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// File name used when the browser's download name sanitizes to nothing
const FALLBACK_NAME: &str = "download.mp3";

/// Steps of one attempt, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStep {
    Open,
    Submit,
    Convert,
    AwaitReady,
    TriggerDownload,
    Poll,
    Finalize,
}

/// Why an attempt was abandoned
#[derive(Debug)]
pub struct AttemptFailure {
    pub step: AttemptStep,
    pub error: SplitError,
}

impl AttemptFailure {
    fn at(step: AttemptStep) -> impl FnOnce(SplitError) -> Self {
        move |error| Self { step, error }
    }

    /// Status line shown for this failure
    fn status_message(&self) -> String {
        match (self.step, &self.error) {
            (AttemptStep::AwaitReady, SplitError::ElementTimeout { .. }) => {
                status::MSG_DOWNLOAD_BUTTON_MISSING.to_string()
            }
            (AttemptStep::Poll, SplitError::DownloadTimeout { .. }) => {
                status::MSG_DOWNLOAD_FAILED.to_string()
            }
            (_, error) => status::error_message(&error.to_string()),
        }
    }
}

/// Directories the remote source works in
#[derive(Debug, Clone)]
pub struct RemoteDirs {
    /// Stable working input directory; acquired files end up here
    pub input_dir: PathBuf,
    /// Parent of the per-attempt download directories
    pub temp_root: PathBuf,
}

/// Obtains an MP3 for a YouTube link by scripting the conversion site
pub struct RemoteScrapeSource {
    link: String,
    backend: Arc<dyn BrowserBackend>,
    site: ConverterSite,
    retry: RetryPolicy,
    poll: PollConfig,
    dirs: RemoteDirs,
    headless: bool,
}

impl RemoteScrapeSource {
    pub fn new(
        link: impl Into<String>,
        backend: Arc<dyn BrowserBackend>,
        site: ConverterSite,
        retry: RetryPolicy,
        poll: PollConfig,
        dirs: RemoteDirs,
    ) -> Self {
        Self {
            link: link.into(),
            backend,
            site,
            retry,
            poll,
            dirs,
            headless: true,
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Fresh download directory for one attempt
    fn attempt_dir(&self, ordinal: u32) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.dirs
            .temp_root
            .join(format!("attempt_{}_{}_{}", std::process::id(), stamp, ordinal))
    }

    /// One attempt: launch, drive, always tear down
    fn run_attempt(
        &self,
        attempt: &mut DownloadAttempt,
        download_dir: &Path,
        status: &dyn StatusSink,
    ) -> std::result::Result<PathBuf, AttemptFailure> {
        fs::create_dir_all(download_dir).map_err(|e| AttemptFailure {
            step: AttemptStep::Open,
            error: SplitError::Io(e),
        })?;

        let options = LaunchOptions::new(download_dir.to_path_buf(), self.headless);
        let mut session = self
            .backend
            .launch(&options)
            .map_err(AttemptFailure::at(AttemptStep::Open))?;
        debug!("{} session started for attempt {}", self.backend.name(), attempt.ordinal);

        let result = self.drive(session.as_mut(), attempt, download_dir, status);

        if let Err(e) = session.quit() {
            warn!("Browser teardown failed: {}", e);
        }

        result
    }

    fn drive(
        &self,
        session: &mut dyn BrowserSession,
        attempt: &mut DownloadAttempt,
        download_dir: &Path,
        status: &dyn StatusSink,
    ) -> std::result::Result<PathBuf, AttemptFailure> {
        session
            .navigate(&self.site.page_url)
            .map_err(AttemptFailure::at(AttemptStep::Open))?;

        let input = session
            .wait_for(
                &Locator::xpath(&self.site.input_xpath),
                WaitFor::Present,
                self.retry.element_timeout,
            )
            .map_err(AttemptFailure::at(AttemptStep::Submit))?;
        session
            .send_keys(&input, &self.link)
            .map_err(AttemptFailure::at(AttemptStep::Submit))?;
        thread::sleep(self.retry.settle_delay);
        debug!("URL entered");

        let convert = session
            .find(&Locator::xpath(&self.site.convert_xpath))
            .map_err(AttemptFailure::at(AttemptStep::Convert))?;
        session
            .click(&convert)
            .map_err(AttemptFailure::at(AttemptStep::Convert))?;
        debug!("Convert button clicked");

        let download = session
            .wait_for(
                &Locator::xpath(&self.site.download_xpath),
                WaitFor::Visible,
                self.retry.ready_timeout,
            )
            .map_err(AttemptFailure::at(AttemptStep::AwaitReady))?;
        debug!("Download button found");

        session
            .click(&download)
            .map_err(AttemptFailure::at(AttemptStep::TriggerDownload))?;
        status.report(status::MSG_DOWNLOAD_STARTED);

        let report = poll::wait_for_download(download_dir, &self.poll)
            .map_err(AttemptFailure::at(AttemptStep::Poll))?;
        attempt.poll_elapsed = report.elapsed;

        let downloaded = report.file.ok_or_else(|| AttemptFailure {
            step: AttemptStep::Poll,
            error: SplitError::DownloadTimeout {
                budget_secs: self.poll.budget.as_secs_f64(),
            },
        })?;

        self.move_into_input(&downloaded)
            .map_err(AttemptFailure::at(AttemptStep::Finalize))
    }

    /// Move a finished download into the stable input directory
    fn move_into_input(&self, downloaded: &Path) -> Result<PathBuf> {
        let name = downloaded
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let final_path = join_component(&self.dirs.input_dir, &name, FALLBACK_NAME);

        fs::create_dir_all(&self.dirs.input_dir)?;
        if fs::rename(downloaded, &final_path).is_err() {
            // rename can fail across filesystems; copy and remove instead
            fs::copy(downloaded, &final_path)
                .map_err(|e| SplitError::output_error(&final_path, e))?;
            fs::remove_file(downloaded)?;
        }

        info!("File moved to: {}", final_path.display());
        Ok(final_path)
    }
}

impl AudioSource for RemoteScrapeSource {
    fn acquire(&self, status: &dyn StatusSink) -> Result<AcquiredFile> {
        let Some(video_id) = extract_video_id(&self.link) else {
            status.report(status::MSG_INVALID_URL);
            warn!("Invalid YouTube URL: {}", self.link);
            return Err(SplitError::InvalidUrl(self.link.clone()));
        };

        status.report(status::MSG_STARTING_CONVERSION);
        info!("Starting YouTube download: {} (video id {})", self.link, video_id);

        let total = self.retry.max_attempts;
        for ordinal in 1..=total {
            status.report(&status::attempt_message(ordinal, total));
            info!("Download attempt {}/{}", ordinal, total);

            let mut attempt = DownloadAttempt::new(ordinal);
            let download_dir = self.attempt_dir(ordinal);
            let result = self.run_attempt(&mut attempt, &download_dir, status);

            if download_dir.exists() {
                if let Err(e) = fs::remove_dir_all(&download_dir) {
                    debug!("Could not remove {}: {}", download_dir.display(), e);
                }
            }

            match result {
                Ok(path) => {
                    attempt.outcome = AttemptOutcome::Succeeded;
                    info!(
                        "Attempt {} succeeded after {:.1}s of polling",
                        attempt.ordinal,
                        attempt.poll_elapsed.as_secs_f64()
                    );
                    status.report(status::MSG_DOWNLOAD_READY);
                    return Ok(AcquiredFile {
                        path,
                        origin: AcquisitionOrigin::Remote,
                    });
                }
                Err(failure) => {
                    attempt.outcome = AttemptOutcome::Failed;
                    if failure.error.is_transient() {
                        warn!(
                            "Attempt {} failed at {:?}: {}",
                            attempt.ordinal, failure.step, failure.error
                        );
                    } else {
                        error!(
                            "Attempt {} hit an unexpected error at {:?}: {}",
                            attempt.ordinal, failure.step, failure.error
                        );
                    }
                    status.report(&failure.status_message());
                }
            }
        }

        status.report(&status::exhausted_message(total));
        error!("All download attempts failed");
        Err(SplitError::AttemptsExhausted { attempts: total })
    }

    fn name(&self) -> &'static str {
        "remote-scrape"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::browser::ElementRef;
    use crate::status::RecordingSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Every launch fails
    struct DeadBackend {
        launches: AtomicUsize,
    }

    impl BrowserBackend for DeadBackend {
        fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Err(SplitError::browser("chromedriver not reachable"))
        }

        fn name(&self) -> &'static str {
            "dead"
        }
    }

    /// Sessions that drop an mp3 into the download dir when download is clicked
    struct InstantBackend {
        launches: AtomicUsize,
    }

    struct InstantSession {
        download_dir: PathBuf,
    }

    impl BrowserSession for InstantSession {
        fn navigate(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }
        fn find(&mut self, locator: &Locator) -> Result<ElementRef> {
            Ok(ElementRef(locator.selector().to_string()))
        }
        fn wait_for(&mut self, locator: &Locator, _c: WaitFor, _t: Duration) -> Result<ElementRef> {
            self.find(locator)
        }
        fn click(&mut self, element: &ElementRef) -> Result<()> {
            if element.0 == ConverterSite::default().download_xpath {
                fs::write(self.download_dir.join("Song: Title.mp3"), b"mp3")?;
            }
            Ok(())
        }
        fn send_keys(&mut self, _element: &ElementRef, _text: &str) -> Result<()> {
            Ok(())
        }
        fn quit(&mut self) -> Result<()> {
            Ok(())
        }
    }

    impl BrowserBackend for InstantBackend {
        fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(InstantSession {
                download_dir: options.download_dir.clone(),
            }))
        }
        fn name(&self) -> &'static str {
            "instant"
        }
    }

    fn source(link: &str, backend: Arc<dyn BrowserBackend>, root: &Path) -> RemoteScrapeSource {
        let retry = RetryPolicy {
            settle_delay: Duration::ZERO,
            ..RetryPolicy::default()
        };
        let poll = PollConfig {
            interval: Duration::from_millis(5),
            budget: Duration::from_millis(50),
            grace: Duration::from_millis(5),
            ..PollConfig::default()
        };
        RemoteScrapeSource::new(
            link,
            backend,
            ConverterSite::default(),
            retry,
            poll,
            RemoteDirs {
                input_dir: root.join("input"),
                temp_root: root.join("input").join("temp_download"),
            },
        )
    }

    #[test]
    fn test_invalid_url_starts_no_session() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(InstantBackend {
            launches: AtomicUsize::new(0),
        });
        let sink = RecordingSink::new();
        let result = source("https://example.com/video", backend.clone(), dir.path()).acquire(&sink);

        assert!(matches!(result, Err(SplitError::InvalidUrl(_))));
        assert_eq!(backend.launches.load(Ordering::SeqCst), 0);
        assert_eq!(sink.lines(), vec![status::MSG_INVALID_URL.to_string()]);
    }

    #[test]
    fn test_launch_failures_use_exactly_three_attempts() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(DeadBackend {
            launches: AtomicUsize::new(0),
        });
        let sink = RecordingSink::new();
        let result = source("https://youtu.be/abc", backend.clone(), dir.path()).acquire(&sink);

        assert!(matches!(result, Err(SplitError::AttemptsExhausted { attempts: 3 })));
        assert_eq!(backend.launches.load(Ordering::SeqCst), 3);
        assert_eq!(sink.last().unwrap(), status::exhausted_message(3));
        assert!(sink
            .lines()
            .iter()
            .any(|l| l.starts_with("❌ Error: Browser automation failed")));
    }

    #[test]
    fn test_first_success_stops_retrying() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(InstantBackend {
            launches: AtomicUsize::new(0),
        });
        let sink = RecordingSink::new();
        let acquired = source("https://youtu.be/abc", backend.clone(), dir.path())
            .acquire(&sink)
            .unwrap();

        assert_eq!(backend.launches.load(Ordering::SeqCst), 1);
        assert_eq!(acquired.origin, AcquisitionOrigin::Remote);
        assert_eq!(acquired.path, dir.path().join("input").join("Song Title.mp3"));
        assert!(acquired.path.exists());
        assert_eq!(sink.last().as_deref(), Some(status::MSG_DOWNLOAD_READY));

        // attempt directories are cleaned up
        let leftovers = fs::read_dir(dir.path().join("input").join("temp_download"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_failure_messages_by_step() {
        let ready = AttemptFailure {
            step: AttemptStep::AwaitReady,
            error: SplitError::ElementTimeout {
                what: "download".into(),
                timeout_secs: 20.0,
            },
        };
        assert_eq!(ready.status_message(), status::MSG_DOWNLOAD_BUTTON_MISSING);

        let poll = AttemptFailure {
            step: AttemptStep::Poll,
            error: SplitError::DownloadTimeout { budget_secs: 300.0 },
        };
        assert_eq!(poll.status_message(), status::MSG_DOWNLOAD_FAILED);

        let submit = AttemptFailure {
            step: AttemptStep::Submit,
            error: SplitError::ElementTimeout {
                what: "input".into(),
                timeout_secs: 10.0,
            },
        };
        assert!(submit.status_message().starts_with("❌ Error: Timed out"));
    }
}
