//! Navigation session: the single logical browsing context of a crawl.
//!
//! The session owns the page driver, the authentication chain and the
//! staging directory for browser-saved downloads. It is not shareable;
//! parallel crawls need independent sessions.

use std::path::Path;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthGateway;
use crate::driver::PageDriver;
use crate::site::SiteLayout;
use crate::types::{CrawlError, CrawlResult};

const STAGING_PREFIX: &str = "coursewalk-staging-";

pub struct NavigationSession {
    driver: Box<dyn PageDriver>,
    gateway: AuthGateway,
    root_url: String,
    staging: TempDir,
    cancel: CancellationToken,
}

impl NavigationSession {
    /// Start a session, creating a fresh staging directory and pointing the
    /// driver's downloads at it.
    pub async fn open(
        mut driver: Box<dyn PageDriver>,
        gateway: AuthGateway,
        root_url: impl Into<String>,
        cancel: CancellationToken,
    ) -> CrawlResult<Self> {
        let staging = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
        driver.set_download_dir(staging.path()).await?;
        tracing::debug!("Staging directory: {}", staging.path().display());

        Ok(Self {
            driver,
            gateway,
            root_url: root_url.into(),
            staging,
            cancel,
        })
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Direct access to the driver for page interactions.
    pub fn driver(&mut self) -> &mut dyn PageDriver {
        self.driver.as_mut()
    }

    /// Load `location` and make sure the result is authenticated.
    ///
    /// Safe to repeat for the same location.
    pub async fn acquire(&mut self, location: &str) -> CrawlResult<()> {
        if self.cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }
        self.load(location).await
    }

    async fn load(&mut self, location: &str) -> CrawlResult<()> {
        tracing::debug!("Acquiring {location}");
        self.driver.navigate(location).await?;

        if let Some(name) = self.gateway.handle(self.driver.as_mut()).await? {
            if self.gateway.is_challenge(self.driver.as_mut()).await? {
                return Err(CrawlError::Authentication(format!(
                    "still on a login page after {name} answered the challenge for {location}"
                )));
            }
        }
        Ok(())
    }

    /// The backend's current location.
    pub async fn current_location(&self) -> CrawlResult<String> {
        self.driver.current_url().await
    }

    /// Re-acquire `location` if the backend has moved away from it.
    ///
    /// Returns whether a re-acquisition happened.
    pub async fn ensure_at(&mut self, location: &str) -> CrawlResult<bool> {
        let current = self.current_location().await?;
        if current == location {
            return Ok(false);
        }
        tracing::debug!("Location drifted to {current}, returning to {location}");
        self.acquire(location).await?;
        Ok(true)
    }

    pub async fn evaluate(&mut self, script: &str) -> CrawlResult<serde_json::Value> {
        self.driver.evaluate(script).await
    }

    /// Remove everything in the staging directory.
    pub async fn clear_staging(&self) -> CrawlResult<()> {
        let mut entries = tokio::fs::read_dir(self.staging.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }

    /// Best-effort logout, then release the driver and the staging directory.
    ///
    /// Logout runs even when the session was cancelled; its failure is
    /// logged and does not fail the close.
    pub async fn close(mut self, site: &dyn SiteLayout) -> CrawlResult<()> {
        let root = self.root_url.clone();
        let logout = match self.load(&root).await {
            Ok(()) => site.logout(&mut self).await,
            Err(e) => Err(e),
        };
        match logout {
            Ok(()) => tracing::info!("Logged out"),
            Err(e) => tracing::warn!("Logout failed: {e}"),
        }

        let Self {
            driver, staging, ..
        } = self;
        let closed = driver.close().await;
        if let Err(e) = staging.close() {
            tracing::warn!("Failed to remove staging directory: {e}");
        }
        closed
    }
}
