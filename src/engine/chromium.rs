//! Headless Chromium render backend
//!
//! Implements the render engine traits over the Chrome DevTools
//! Protocol. One browser process serves a whole batch; every render
//! call opens its own page, captures a viewport-clipped screenshot and
//! closes the page again, leaving the process ready for the next call.

use crate::engine::{RenderEngine, RenderSession};
use crate::error::{CardsmithError, CardsmithResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long to wait for the loaded document to settle before capturing
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Launch flags required to run inside containers and CI sandboxes
const CONTAINER_FLAGS: [&str; 3] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
];

/// Factory for headless Chromium sessions
#[derive(Debug, Clone, Default)]
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
}

impl ChromiumEngine {
    /// Create an engine that discovers the browser binary itself
    pub fn new() -> Self {
        Self { executable: None }
    }

    /// Create an engine using an explicit browser binary
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }

    async fn launch(&self) -> CardsmithResult<ChromiumSession> {
        let mut builder = BrowserConfig::builder().no_sandbox().args(CONTAINER_FLAGS);
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(CardsmithError::EngineLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CardsmithError::EngineLaunch(e.to_string()))?;

        // The handler task pumps CDP messages for the whole session
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!("Chromium launched");
        Ok(ChromiumSession {
            browser,
            handler_task,
        })
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn open(&self) -> Option<Box<dyn RenderSession>> {
        match self.launch().await {
            Ok(session) => Some(Box::new(session)),
            Err(e) => {
                warn!("Render engine unavailable: {}", e);
                None
            }
        }
    }

    fn engine_name(&self) -> &'static str {
        "Chromium"
    }
}

/// One live Chromium process
pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    async fn capture(page: &Page, html: &str, width: u32, height: u32) -> CardsmithResult<Vec<u8>> {
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(CardsmithError::EngineProtocol)?;
        page.execute(metrics)
            .await
            .map_err(|e| CardsmithError::EngineProtocol(e.to_string()))?;

        page.set_content(html)
            .await
            .map_err(|e| CardsmithError::EngineProtocol(e.to_string()))?;

        // Let the document reach a settled state; capture what we have
        // if it never does.
        match tokio::time::timeout(SETTLE_TIMEOUT, page.wait_for_navigation()).await {
            Ok(Err(e)) => debug!("Navigation wait ended early: {}", e),
            Err(_) => debug!("Document settle timed out after {:?}", SETTLE_TIMEOUT),
            Ok(Ok(_)) => {}
        }

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(Viewport {
                x: 0.0,
                y: 0.0,
                width: f64::from(width),
                height: f64::from(height),
                scale: 1.0,
            })
            .build();

        page.screenshot(params)
            .await
            .map_err(|e| CardsmithError::Screenshot(e.to_string()))
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn render_page(&self, html: &str, width: u32, height: u32) -> CardsmithResult<Vec<u8>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CardsmithError::EngineProtocol(e.to_string()))?;

        let result = Self::capture(&page, html, width, height).await;

        // The page is always closed, success or failure; the browser
        // process stays up for the rest of the batch.
        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }

        result
    }

    async fn dispose(mut self: Box<Self>) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser wait failed: {}", e);
        }
        self.handler_task.abort();
        debug!("Chromium session disposed");
    }
}
