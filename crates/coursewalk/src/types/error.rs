//! Errors that can occur while crawling or reconciling course dumps.

use std::path::PathBuf;
use std::time::Duration;

use super::activity::ActivityKind;

/// All errors produced by the library.
#[derive(thiserror::Error, Debug)]
pub enum CrawlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Activities of type {0} can't currently be downloaded")]
    UnsupportedActivity(ActivityKind),

    #[error("Activity '{0}' has no completion toggle")]
    Uncompletable(String),

    #[error("Download into {} did not complete within {waited:?}", dir.display())]
    DownloadTimeout { dir: PathBuf, waited: Duration },

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid traversal state: {0}")]
    InvalidState(String),

    #[error("Malformed course dump: {0}")]
    MalformedDump(String),
}

impl CrawlError {
    /// Whether the failure is confined to a single activity.
    ///
    /// Recoverable errors are logged by the traversal engine and the walk
    /// continues with the next activity; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CrawlError::Backend(_)
                | CrawlError::Authentication(_)
                | CrawlError::Cancelled
                | CrawlError::InvalidState(_)
        )
    }
}

/// Convenience result type.
pub type CrawlResult<T> = Result<T, CrawlError>;
