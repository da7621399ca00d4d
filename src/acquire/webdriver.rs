//! W3C WebDriver backend
//!
//! Talks JSON over HTTP to a running `chromedriver` (or any WebDriver server
//! that understands `goog:chromeOptions`). Only the handful of commands the
//! conversion flow needs are implemented.

use super::browser::{BrowserBackend, BrowserSession, ElementRef, LaunchOptions, Locator, WaitFor};
use crate::error::{Result, SplitError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(60);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay between element lookups while waiting
const LOOKUP_INTERVAL: Duration = Duration::from_millis(250);

/// Key under which WebDriver returns element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Envelope of every WebDriver response
#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

/// A failed WebDriver command
#[derive(Debug)]
struct CommandError {
    /// WebDriver error code, e.g. "no such element"
    code: Option<String>,
    message: String,
}

impl CommandError {
    /// The element is not (or no longer) on the page; keep waiting
    fn is_missing_element(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some("no such element") | Some("stale element reference")
        )
    }
}

impl From<CommandError> for SplitError {
    fn from(err: CommandError) -> Self {
        match err.code {
            Some(code) => SplitError::Browser(format!("{}: {}", code, err.message)),
            None => SplitError::Browser(err.message),
        }
    }
}

fn build_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .timeout_read(READ_TIMEOUT)
        .timeout_write(WRITE_TIMEOUT)
        .build()
}

/// Send one request and unwrap the `value` envelope
fn send(agent: &ureq::Agent, method: &str, url: &str, body: Option<Value>) -> std::result::Result<Value, CommandError> {
    trace!("WebDriver {} {}", method, url);
    let request = agent.request(method, url);
    let response = match body {
        Some(body) => request.send_json(body),
        None => request.call(),
    };

    match response {
        Ok(response) => response
            .into_json::<WireResponse>()
            .map(|wire| wire.value)
            .map_err(|e| CommandError {
                code: None,
                message: format!("Malformed WebDriver response: {}", e),
            }),
        Err(ureq::Error::Status(status, response)) => {
            let detail = response
                .into_json::<WireResponse>()
                .ok()
                .and_then(|wire| serde_json::from_value::<WireError>(wire.value).ok());
            Err(match detail {
                Some(detail) => CommandError {
                    code: Some(detail.error),
                    message: detail.message.lines().next().unwrap_or_default().to_string(),
                },
                None => CommandError {
                    code: None,
                    message: format!("WebDriver returned HTTP {}", status),
                },
            })
        }
        Err(ureq::Error::Transport(transport)) => Err(CommandError {
            code: None,
            message: format!("Cannot reach WebDriver at {}: {}", url, transport),
        }),
    }
}

/// Launches Chrome sessions through a WebDriver server
pub struct WebDriverBackend {
    endpoint: String,
    agent: ureq::Agent,
}

impl WebDriverBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            agent: build_agent(),
        }
    }

    /// New-session payload mirroring the Chrome options the flow depends on
    fn capabilities(options: &LaunchOptions) -> Value {
        // Chrome only honours absolute download directories
        let download_dir = std::fs::canonicalize(&options.download_dir)
            .unwrap_or_else(|_| options.download_dir.clone());

        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--window-size={},{}", options.window_size.0, options.window_size.1),
        ];
        if options.headless {
            args.insert(0, "--headless=new".to_string());
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "prefs": {
                            "download.default_directory": download_dir.to_string_lossy(),
                            "download.prompt_for_download": false,
                            "download.directory_upgrade": true,
                            "safebrowsing.enabled": true
                        }
                    }
                }
            }
        })
    }
}

impl BrowserBackend for WebDriverBackend {
    fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        let url = format!("{}/session", self.endpoint);
        let value = send(&self.agent, "POST", &url, Some(Self::capabilities(options)))?;
        let session: NewSession = serde_json::from_value(value)
            .map_err(|e| SplitError::browser(format!("Unexpected new-session response: {}", e)))?;

        debug!("WebDriver session {} opened", session.session_id);
        Ok(Box::new(WebDriverSession {
            agent: self.agent.clone(),
            base: format!("{}/session/{}", self.endpoint, session.session_id),
            closed: false,
        }))
    }

    fn name(&self) -> &'static str {
        "webdriver"
    }
}

/// One Chrome session; quits on drop if not closed explicitly
pub struct WebDriverSession {
    agent: ureq::Agent,
    base: String,
    closed: bool,
}

impl WebDriverSession {
    fn command(&self, method: &str, path: &str, body: Option<Value>) -> std::result::Result<Value, CommandError> {
        send(&self.agent, method, &format!("{}{}", self.base, path), body)
    }

    fn locate(&self, locator: &Locator) -> std::result::Result<ElementRef, CommandError> {
        let value = self.command(
            "POST",
            "/element",
            Some(json!({ "using": locator.strategy(), "value": locator.selector() })),
        )?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementRef(id.to_string()))
            .ok_or_else(|| CommandError {
                code: None,
                message: format!("No element reference in response for {}", locator),
            })
    }

    fn is_displayed(&self, element: &ElementRef) -> std::result::Result<bool, CommandError> {
        let value = self.command("GET", &format!("/element/{}/displayed", element.0), None)?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.command("POST", "/url", Some(json!({ "url": url })))?;
        Ok(())
    }

    fn find(&mut self, locator: &Locator) -> Result<ElementRef> {
        Ok(self.locate(locator)?)
    }

    fn wait_for(&mut self, locator: &Locator, condition: WaitFor, timeout: Duration) -> Result<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.locate(locator) {
                Ok(element) => {
                    let ready = match condition {
                        WaitFor::Present => true,
                        WaitFor::Visible => match self.is_displayed(&element) {
                            Ok(shown) => shown,
                            Err(e) if e.is_missing_element() => false,
                            Err(e) => return Err(e.into()),
                        },
                    };
                    if ready {
                        return Ok(element);
                    }
                }
                Err(e) if e.is_missing_element() => {}
                Err(e) => return Err(e.into()),
            }

            if Instant::now() >= deadline {
                return Err(SplitError::ElementTimeout {
                    what: locator.to_string(),
                    timeout_secs: timeout.as_secs_f64(),
                });
            }
            thread::sleep(LOOKUP_INTERVAL);
        }
    }

    fn click(&mut self, element: &ElementRef) -> Result<()> {
        self.command("POST", &format!("/element/{}/click", element.0), Some(json!({})))?;
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<()> {
        self.command(
            "POST",
            &format!("/element/{}/value", element.0),
            Some(json!({ "text": text })),
        )?;
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.command("DELETE", "", None)?;
        debug!("WebDriver session closed");
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.quit() {
                warn!("Failed to close WebDriver session on drop: {}", e);
            }
        }
    }
}
