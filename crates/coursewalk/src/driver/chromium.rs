//! Chromium-based page driver using chromiumoxide.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::PageDriver;
use crate::types::{CrawlError, CrawlResult};

/// User agent presented to the platform.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:77.0) Gecko/20100101 Firefox/77.0";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. COURSEWALK_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("COURSEWALK_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.coursewalk/chromium/
    if let Some(home) = dirs::home_dir() {
        for c in [
            home.join(".coursewalk/chromium/chrome-linux64/chrome"),
            home.join(".coursewalk/chromium/chrome"),
        ] {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch options for [`ChromiumDriver`].
#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    pub headless: bool,
    pub user_agent: String,
    pub navigation_timeout: Duration,
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// A Chromium instance with a single page.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

fn launch_args(options: &ChromiumOptions) -> Vec<String> {
    vec![
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-extensions".to_string(),
        format!("--user-agent={}", options.user_agent),
    ]
}

impl ChromiumDriver {
    /// Launch a Chromium instance and open a blank page.
    pub async fn launch(options: &ChromiumOptions) -> CrawlResult<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            CrawlError::Backend(
                "Chromium not found. Install it or set COURSEWALK_CHROMIUM_PATH.".into(),
            )
        })?;

        // Headless mode is chosen on the builder, never as a raw flag.
        let builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .args(launch_args(options));
        let builder = if options.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| CrawlError::Backend(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::Backend(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::Backend(format!("failed to create page: {e}")))?;

        Ok(Self {
            browser,
            page,
            handler,
            navigation_timeout: options.navigation_timeout,
        })
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> CrawlResult<()> {
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CrawlError::Backend(format!("navigation to {url} failed: {e}"))),
            Err(_) => Err(CrawlError::Backend(format!(
                "navigation to {url} timed out after {:?}",
                self.navigation_timeout
            ))),
        }
    }

    async fn wait_for_load(&mut self) -> CrawlResult<()> {
        match tokio::time::timeout(self.navigation_timeout, self.page.wait_for_navigation()).await
        {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CrawlError::Backend(format!("page load failed: {e}"))),
            Err(_) => Err(CrawlError::Backend(format!(
                "page load timed out after {:?}",
                self.navigation_timeout
            ))),
        }
    }

    async fn current_url(&self) -> CrawlResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| CrawlError::Backend(format!("failed to get URL: {e}")))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn title(&self) -> CrawlResult<String> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| CrawlError::Backend(format!("failed to get title: {e}")))?
            .unwrap_or_default();
        Ok(title)
    }

    async fn evaluate(&mut self, script: &str) -> CrawlResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| CrawlError::Backend(format!("JS execution failed: {e}")))?;

        result
            .into_value()
            .map_err(|e| CrawlError::Backend(format!("failed to convert JS result: {e:?}")))
    }

    async fn set_download_dir(&mut self, dir: &Path) -> CrawlResult<()> {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.display().to_string())
            .build()
            .map_err(|e| CrawlError::Backend(format!("invalid download behavior: {e}")))?;

        self.browser
            .execute(params)
            .await
            .map_err(|e| CrawlError::Backend(format!("failed to set download directory: {e}")))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> CrawlResult<()> {
        let mut this = *self;
        let _ = this.page.close().await;
        let _ = this.browser.close().await;
        this.handler.abort();
        Ok(())
    }
}
