//! Stealth browser sessions.
//!
//! Each scraper run owns one independent browser session: an OS-level
//! Chrome process acquired at the start of the run and released on every
//! exit path. Sessions are configured to minimize automation
//! fingerprints (realistic user agent, fixed viewport, suppressed
//! automation markers, stealth JS applied after navigation).

mod stealth;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::BrowserSettings;

pub use stealth::STEALTH_SCRIPTS;

/// Realistic desktop user agent sent on every session.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Desktop viewport matching the user agent.
const VIEWPORT: (u32, u32) = (1366, 768);

/// Grace period for late-loading scripts after the document is ready.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// One page-bearing session.
///
/// The production implementation drives a Chrome process over CDP; tests
/// substitute stubs to exercise retry and fallback logic without a
/// browser.
#[async_trait]
pub trait PageSession: Send {
    /// Navigate to the URL and wait for the document to become ready.
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Rendered HTML of the current page.
    async fn content(&mut self) -> Result<String>;

    /// Release the session. Failures are logged, never returned.
    async fn close(&mut self);
}

/// Opens sessions. One call, one independent session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>>;
}

/// Common Chrome executable locations, checked before falling back to
/// `which`.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

fn find_chrome(configured: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.clone());
        }
        anyhow::bail!("configured browser executable not found: {}", path.display());
    }

    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }

    for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    anyhow::bail!("Chrome/Chromium not found; install it or set browser.executable")
}

/// Production session provider: launches a hardened headless Chrome per
/// session.
pub struct BrowserProvider {
    settings: BrowserSettings,
}

impl BrowserProvider {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionProvider for BrowserProvider {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        let session = BrowserSession::launch(&self.settings).await?;
        Ok(Box::new(session))
    }
}

/// A live Chrome session: browser process, CDP handler task, one page.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    timeout: Duration,
    closed: bool,
}

impl BrowserSession {
    /// Launch a browser process and prepare a blank page with the
    /// session's user agent applied.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let chrome = find_chrome(settings.executable.as_ref())?;
        debug!(executable = %chrome.display(), headless = settings.headless, "launching browser");

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome)
            .window_size(VIEWPORT.0, VIEWPORT.1);

        // with_head means NOT headless
        if !settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--metrics-recording-only")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &settings.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;
        page.execute(SetUserAgentOverrideParams::new(USER_AGENT.to_string()))
            .await
            .context("failed to set user agent")?;

        Ok(Self {
            browser,
            page,
            handler,
            timeout: Duration::from_secs(settings.navigation_timeout_secs),
            closed: false,
        })
    }

    /// Wait for document readiness via readyState instead of a fixed
    /// sleep; a fallback timer resolves if the event never fires.
    async fn wait_for_ready(&self) {
        let script = r#"
            new Promise((resolve) => {
                if (document.readyState === 'complete' || document.readyState === 'interactive') {
                    resolve(document.readyState);
                } else {
                    document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                    setTimeout(() => resolve('timeout'), 10000);
                }
            })
        "#;

        match tokio::time::timeout(self.timeout, self.page.evaluate(script.to_string())).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!(state, "page ready");
            }
            Ok(Err(e)) => {
                debug!("could not check ready state: {e}");
            }
            Err(_) => {
                warn!("timeout waiting for page ready state");
            }
        }
    }

    /// Stealth scripts need a real page context, so they run after
    /// navigation; failures are best-effort.
    async fn apply_stealth(&self) {
        for script in STEALTH_SCRIPTS {
            if let Err(e) = self.page.evaluate(script.to_string()).await {
                debug!("stealth script skipped: {e}");
            }
        }
    }
}

#[async_trait]
impl PageSession for BrowserSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("invalid navigation url: {e}"))?;

        let result = self.page.execute(params).await?;
        if let Some(error) = result.result.error_text.as_deref() {
            anyhow::bail!("navigation failed: {error}");
        }

        self.wait_for_ready().await;
        self.apply_stealth().await;

        // Let dynamic lobby content render before snapshotting.
        tokio::time::sleep(SETTLE_DELAY).await;

        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        let html = self.page.content().await.context("failed to read page content")?;
        Ok(html)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.page.clone().close().await {
            debug!("page close failed: {e}");
        }
        if let Err(e) = self.browser.close().await {
            warn!("browser close failed: {e}");
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // close() is the proper release path; this is the backstop that
        // keeps the CDP handler task from outliving the session.
        self.handler.abort();
    }
}
