//! Browser automation abstraction
//!
//! The remote acquisition state machine only talks to these traits, so the
//! automation backend can be swapped (WebDriver in production, scripted mocks
//! in tests).

use crate::error::Result;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How to find an element on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    XPath(String),
    Css(String),
}

impl Locator {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    /// WebDriver location strategy name
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::XPath(_) => "xpath",
            Locator::Css(_) => "css selector",
        }
    }

    pub fn selector(&self) -> &str {
        match self {
            Locator::XPath(s) | Locator::Css(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.strategy(), self.selector())
    }
}

/// Condition an element must meet before a wait succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFor {
    /// Attached to the DOM
    Present,
    /// Attached and displayed
    Visible,
}

/// Opaque handle to an element inside one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef(pub String);

/// Options for a fresh browser session
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Downloads land here without prompting
    pub download_dir: PathBuf,
    pub headless: bool,
    pub window_size: (u32, u32),
}

impl LaunchOptions {
    pub fn new(download_dir: PathBuf, headless: bool) -> Self {
        Self {
            download_dir,
            headless,
            window_size: (1280, 720),
        }
    }
}

/// One live browser session
pub trait BrowserSession: Send {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Locate an element immediately, without waiting
    fn find(&mut self, locator: &Locator) -> Result<ElementRef>;

    /// Wait up to `timeout` for an element to meet `condition`.
    ///
    /// Fails with [`crate::SplitError::ElementTimeout`] when the wait runs out.
    fn wait_for(
        &mut self,
        locator: &Locator,
        condition: WaitFor,
        timeout: Duration,
    ) -> Result<ElementRef>;

    fn click(&mut self, element: &ElementRef) -> Result<()>;

    fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<()>;

    /// Close the session. Calling it twice is a no-op.
    fn quit(&mut self) -> Result<()>;
}

/// Factory for browser sessions
pub trait BrowserBackend: Send + Sync {
    fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>>;

    /// Get the name of this backend (for logging)
    fn name(&self) -> &'static str;
}
