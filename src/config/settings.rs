//! Runtime configuration settings

use crate::error::{Result, SplitError};
use std::path::PathBuf;
use std::time::Duration;

/// Environment override for the WebDriver endpoint
pub const WEBDRIVER_ENV: &str = "STEMSPLIT_WEBDRIVER_URL";
/// Environment override for the separation tool
pub const ENGINE_ENV: &str = "STEMSPLIT_ENGINE";

const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_ENGINE_COMMAND: &str = "spleeter";

/// The conversion service page and the controls we drive on it
#[derive(Debug, Clone)]
pub struct ConverterSite {
    pub page_url: String,
    /// XPath of the text box that takes the video link
    pub input_xpath: String,
    /// XPath of the button that starts the conversion
    pub convert_xpath: String,
    /// XPath of the button that appears once the MP3 is ready
    pub download_xpath: String,
}

impl Default for ConverterSite {
    fn default() -> Self {
        Self {
            page_url: "https://y2mate.as/en-qOwq/".to_string(),
            input_xpath: r#"//*[@id="v"]"#.to_string(),
            convert_xpath: "/html/body/form/div[2]/button[2]".to_string(),
            download_xpath: "/html/body/form/div[2]/button[1]".to_string(),
        }
    }
}

/// Bounds on the remote acquisition retry loop
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Browser sessions per acquisition
    pub max_attempts: u32,
    /// Wait for the URL input field
    pub element_timeout: Duration,
    /// Wait for the download control to become visible
    pub ready_timeout: Duration,
    /// Pause after typing the link, before clicking convert
    pub settle_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            element_timeout: Duration::from_secs(10),
            ready_timeout: Duration::from_secs(20),
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// How the download directory is watched after clicking download
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    /// Overall wall-clock budget
    pub budget: Duration,
    /// Extra wait when no in-progress marker is visible
    pub grace: Duration,
    /// Extensions of a finished download (lowercase, no dot)
    pub completed_extensions: Vec<String>,
    /// Extensions the browser uses while a download is running
    pub in_progress_extensions: Vec<String>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            budget: Duration::from_secs(300),
            grace: Duration::from_secs(2),
            completed_extensions: vec!["mp3".to_string()],
            in_progress_extensions: vec!["crdownload".to_string(), "part".to_string()],
        }
    }
}

/// Preconditions a file must meet before the engine runs
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub min_size_bytes: u64,
    pub min_duration_secs: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            // 0.1 MB, rounded up to whole bytes
            min_size_bytes: 104_858,
            min_duration_secs: 1.0,
        }
    }
}

/// Runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Holds input/, output/ and the log files
    pub base_dir: PathBuf,
    /// WebDriver endpoint
    pub webdriver_url: String,
    pub site: ConverterSite,
    pub retry: RetryPolicy,
    pub poll: PollConfig,
    pub limits: ValidationLimits,
    /// Separation tool executable
    pub engine_command: PathBuf,
    /// Run the browser without a window
    pub headless: bool,
    /// Show the status spinner
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments, falling back to environment and defaults
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        let defaults = Self::default();

        let base_dir = cli.base_dir.clone().unwrap_or(defaults.base_dir);

        let webdriver_url = cli
            .webdriver_url
            .clone()
            .or_else(|| std::env::var(WEBDRIVER_ENV).ok())
            .unwrap_or(defaults.webdriver_url);

        let engine_command = cli
            .engine_command
            .clone()
            .or_else(|| std::env::var(ENGINE_ENV).ok().map(PathBuf::from))
            .unwrap_or(defaults.engine_command);

        let mut site = defaults.site;
        if let Some(url) = &cli.converter_url {
            site.page_url = url.clone();
        }

        Self {
            base_dir,
            webdriver_url,
            site,
            engine_command,
            show_progress: !cli.quiet,
            retry: defaults.retry,
            poll: defaults.poll,
            limits: defaults.limits,
            headless: defaults.headless,
        }
    }
}

impl Settings {
    /// Reject settings the acquisition loop cannot work with
    pub fn validate(&self) -> Result<()> {
        for (what, value) in [("WebDriver URL", &self.webdriver_url), ("converter URL", &self.site.page_url)] {
            let parsed = url::Url::parse(value)
                .map_err(|e| SplitError::ConfigError(format!("{} '{}' is not a valid URL: {}", what, value, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SplitError::ConfigError(format!(
                    "{} '{}' must use http or https",
                    what, value
                )));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(SplitError::ConfigError("max_attempts must be at least 1".to_string()));
        }
        if self.poll.interval.is_zero() {
            return Err(SplitError::ConfigError("poll interval must be non-zero".to_string()));
        }
        if self.poll.budget.is_zero() {
            return Err(SplitError::ConfigError("poll budget must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            site: ConverterSite::default(),
            retry: RetryPolicy::default(),
            poll: PollConfig::default(),
            limits: ValidationLimits::default(),
            engine_command: PathBuf::from(DEFAULT_ENGINE_COMMAND),
            headless: true,
            show_progress: true,
        }
    }
}
