//! Completion detection for browser-initiated file saves.
//!
//! The staging directory is dedicated to one transfer. While the transfer
//! runs it is either empty or holds the partial file (and possibly the
//! final file next to it); the transfer is done once a single, non-partial
//! entry remains.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::types::{CrawlError, CrawlResult};

/// Extensions browsers use for in-progress downloads.
const PARTIAL_EXTENSIONS: &[&str] = &["crdownload", "part", "partial", "download", "tmp"];

/// Polls a staging directory until a download has finished.
#[derive(Debug, Clone)]
pub struct DownloadCompletionWatcher {
    poll_interval: Duration,
    timeout: Duration,
}

impl DownloadCompletionWatcher {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Wait until `dir` holds exactly one finished file and return its path.
    pub async fn wait(&self, dir: &Path, cancel: &CancellationToken) -> CrawlResult<PathBuf> {
        let start = Instant::now();
        loop {
            if cancel.is_cancelled() {
                return Err(CrawlError::Cancelled);
            }

            if let Some(done) = finished_entry(dir).await? {
                tracing::debug!(
                    "Download finished after {:?}: {}",
                    start.elapsed(),
                    done.display()
                );
                return Ok(done);
            }

            let waited = start.elapsed();
            if waited >= self.timeout {
                return Err(CrawlError::DownloadTimeout {
                    dir: dir.to_path_buf(),
                    waited,
                });
            }

            let nap = self.poll_interval.min(self.timeout - waited);
            tokio::select! {
                _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }
}

fn is_partial(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PARTIAL_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

async fn finished_entry(dir: &Path) -> CrawlResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        found.push(entry.path());
        if found.len() > 1 {
            return Ok(None);
        }
    }
    Ok(found.pop().filter(|p| !is_partial(p)))
}
