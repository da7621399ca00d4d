//! Working directories and the shared current-file state
//!
//! A [`Workspace`] owns the directory layout, the browser backend, the
//! separation invoker and the one piece of shared state: the path of the file
//! that the next separation will use. Acquisition results are handed back
//! explicitly; the slot is only updated by a successful acquisition.
//!
//! Only one long-running operation may be in flight at a time. A second
//! trigger while one is running is rejected with [`SplitError::Busy`].

use crate::acquire::{AudioSource, BrowserBackend, LocalFileSource, RemoteDirs, RemoteScrapeSource};
use crate::config::Settings;
use crate::error::{Result, SplitError};
use crate::sanitize::normalize;
use crate::separation::{ErrorLog, SeparationInvoker, StemEngine, ERROR_LOG_NAME};
use crate::status::{ChannelSink, StatusSink};
use crate::types::{AcquiredFile, AcquisitionRequest, SeparationReport, StemCount};
use crossbeam_channel::Receiver;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Name of the diagnostic log inside the base directory
pub const DEBUG_LOG_NAME: &str = "app_debug.log";

/// Directory layout rooted at the base directory
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    pub base: PathBuf,
    /// Acquired files
    pub input: PathBuf,
    /// Parent of the per-attempt browser download directories
    pub temp_download: PathBuf,
    /// Parent of the timestamped separation output directories
    pub output: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(base: &Path) -> Self {
        let base = normalize(base);
        let input = base.join("input");
        Self {
            temp_download: input.join("temp_download"),
            output: base.join("output"),
            input,
            base,
        }
    }

    pub fn error_log(&self) -> PathBuf {
        self.base.join(ERROR_LOG_NAME)
    }

    pub fn debug_log(&self) -> PathBuf {
        self.base.join(DEBUG_LOG_NAME)
    }

    /// Create every working directory
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.base, &self.input, &self.temp_download, &self.output] {
            fs::create_dir_all(dir).map_err(|e| SplitError::output_error(dir, e))?;
            debug!("Ensured directory {}", dir.display());
        }
        Ok(())
    }
}

/// Clears the busy flag when the operation ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Workspace {
    layout: WorkspaceLayout,
    settings: Settings,
    backend: Arc<dyn BrowserBackend>,
    invoker: SeparationInvoker,
    current: Mutex<Option<PathBuf>>,
    busy: AtomicBool,
}

impl Workspace {
    /// Create the directory layout and wire the collaborators together
    pub fn new(
        settings: Settings,
        backend: Arc<dyn BrowserBackend>,
        engine: Arc<dyn StemEngine>,
    ) -> Result<Self> {
        let layout = WorkspaceLayout::new(&settings.base_dir);
        layout.ensure()?;

        let invoker = SeparationInvoker::new(
            engine,
            settings.limits.clone(),
            layout.output.clone(),
            ErrorLog::new(layout.error_log()),
        );

        info!(
            "Workspace at {} (browser: {}, engine: {})",
            layout.base.display(),
            backend.name(),
            invoker.engine_name()
        );

        Ok(Self {
            layout,
            settings,
            backend,
            invoker,
            current: Mutex::new(None),
            busy: AtomicBool::new(false),
        })
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// The file the next separation will use, if any
    pub fn current_file(&self) -> Option<PathBuf> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                warn!("Rejected overlapping operation");
                SplitError::Busy
            })?;
        Ok(BusyGuard(&self.busy))
    }

    fn set_current(&self, path: PathBuf) {
        let mut slot = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(path);
    }

    /// Pick the producer for a request
    pub fn source_for(&self, request: &AcquisitionRequest) -> Box<dyn AudioSource> {
        match request {
            AcquisitionRequest::Local(path) => {
                Box::new(LocalFileSource::new(path.clone(), self.layout.input.clone()))
            }
            AcquisitionRequest::Remote(link) => Box::new(
                RemoteScrapeSource::new(
                    link.clone(),
                    Arc::clone(&self.backend),
                    self.settings.site.clone(),
                    self.settings.retry.clone(),
                    self.settings.poll.clone(),
                    RemoteDirs {
                        input_dir: self.layout.input.clone(),
                        temp_root: self.layout.temp_download.clone(),
                    },
                )
                .with_headless(self.settings.headless),
            ),
        }
    }

    /// Acquire a file; on success it becomes the current file
    pub fn acquire(&self, request: &AcquisitionRequest, status: &dyn StatusSink) -> Result<AcquiredFile> {
        let _guard = self.begin()?;
        let source = self.source_for(request);
        debug!("Acquiring with {}", source.name());

        let acquired = source.acquire(status)?;
        self.set_current(acquired.path.clone());
        Ok(acquired)
    }

    /// Separate the current file
    pub fn separate(&self, stems: StemCount, status: &dyn StatusSink) -> Result<SeparationReport> {
        let _guard = self.begin()?;
        let current = self.current_file();
        self.invoker.separate(current.as_deref(), stems, status)
    }

    /// Separate a specific file without touching the current-file slot
    pub fn separate_file(&self, file: &Path, stems: StemCount, status: &dyn StatusSink) -> Result<SeparationReport> {
        let _guard = self.begin()?;
        self.invoker.separate(Some(file), stems, status)
    }

    /// Run `task` on a worker thread. Status lines arrive on the returned
    /// receiver, which disconnects once the task has finished.
    pub fn spawn<T, F>(self: &Arc<Self>, task: F) -> (JoinHandle<Result<T>>, Receiver<String>)
    where
        T: Send + 'static,
        F: FnOnce(&Workspace, &dyn StatusSink) -> Result<T> + Send + 'static,
    {
        let (sink, rx) = ChannelSink::new();
        let workspace = Arc::clone(self);
        let handle = thread::spawn(move || {
            let status: &dyn StatusSink = &sink;
            task(workspace.as_ref(), status)
        });
        (handle, rx)
    }
}
