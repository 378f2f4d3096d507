//! Page driver abstraction over the remote browser.
//!
//! Defines the `PageDriver` trait that abstracts over the browser engine
//! (currently Chromium via chromiumoxide).

#[cfg(feature = "chromium")]
pub mod chromium;
pub mod script;

use std::path::Path;

use async_trait::async_trait;

use crate::types::CrawlResult;

/// A single stateful browsing context.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load a URL and wait for the page to settle.
    async fn navigate(&mut self, url: &str) -> CrawlResult<()>;
    /// Wait for a navigation triggered from inside the page (form submit, click).
    async fn wait_for_load(&mut self) -> CrawlResult<()>;
    /// The current URL.
    async fn current_url(&self) -> CrawlResult<String>;
    /// The current document title.
    async fn title(&self) -> CrawlResult<String>;
    /// Evaluate JavaScript in the page and return its JSON result.
    async fn evaluate(&mut self, script: &str) -> CrawlResult<serde_json::Value>;
    /// Direct browser-initiated file saves into `dir`.
    async fn set_download_dir(&mut self, dir: &Path) -> CrawlResult<()>;
    /// Close the browsing context.
    async fn close(self: Box<Self>) -> CrawlResult<()>;
}
