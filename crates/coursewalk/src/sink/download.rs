//! Idempotent activity download.
//!
//! Layout: `<root>/<course>/[<subcourse>/]<subject>/<activity>[.<ext>]`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Sink, SinkContext};
use crate::site::FetchOutcome;
use crate::types::{Activity, CrawlError, CrawlResult, FetchStrategy, Locator};
use crate::watcher::DownloadCompletionWatcher;

/// Make a display name safe to use as a single path segment.
pub fn escape_segment(name: &str) -> String {
    let escaped = name.replace(['/', '\\'], "_");
    match escaped.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => escaped,
    }
}

/// Whether `ext` reads as a file extension rather than part of a dotted name.
///
/// "pdf" and "mp3" qualify, the "2" of "Week 1.2" does not.
fn is_file_extension(ext: &OsStr) -> bool {
    let Some(ext) = ext.to_str() else {
        return false;
    };
    !ext.is_empty()
        && ext.len() <= 8
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
        && ext.chars().any(|c| c.is_ascii_alphabetic())
}

/// Find a file at `target` regardless of its extension.
///
/// An entry matches when its name is the target name, optionally followed by
/// a single appended file extension.
pub async fn find_existing(target: &Path) -> CrawlResult<Option<PathBuf>> {
    let (Some(dir), Some(wanted)) = (target.parent(), target.file_name()) else {
        return Ok(None);
    };
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.file_name() == Some(wanted) {
            return Ok(Some(path));
        }
        let appended = path.extension().filter(|ext| is_file_extension(ext)).is_some();
        if appended && path.file_stem() == Some(wanted) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn with_extension_appended(target: &Path, ext: Option<&OsStr>) -> PathBuf {
    match ext.filter(|ext| is_file_extension(ext)) {
        Some(ext) => {
            let mut name = target.file_name().unwrap_or_default().to_os_string();
            name.push(".");
            name.push(ext);
            target.with_file_name(name)
        }
        None => target.to_path_buf(),
    }
}

/// Temporary file next to `path`, removed again unless persisted.
fn sibling_temp_path(path: &Path) -> CrawlResult<tempfile::TempPath> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file = tempfile::Builder::new()
        .prefix(".coursewalk-")
        .suffix(".partial")
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

/// Write `content` so that `path` is either complete or absent.
async fn write_file(path: &Path, content: &[u8]) -> CrawlResult<()> {
    let temp = sibling_temp_path(path)?;
    tokio::fs::write(&temp, content).await?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

async fn move_file(from: &Path, to: &Path) -> CrawlResult<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    // Staging and target may live on different filesystems.
    let temp = sibling_temp_path(to)?;
    tokio::fs::copy(from, &temp).await?;
    temp.persist(to).map_err(|e| e.error)?;
    tokio::fs::remove_file(from).await?;
    Ok(())
}

/// Stores activity content under a root directory.
pub struct DownloadSink {
    root: PathBuf,
    watcher: DownloadCompletionWatcher,
    attempts: u32,
}

impl DownloadSink {
    pub fn new(root: impl Into<PathBuf>, watcher: DownloadCompletionWatcher, attempts: u32) -> Self {
        Self {
            root: root.into(),
            watcher,
            attempts: attempts.max(1),
        }
    }

    /// Target path of an activity, without extension.
    pub fn target_path(&self, locator: &Locator) -> PathBuf {
        let mut path = self.root.clone();
        for segment in locator.scope_path() {
            path.push(escape_segment(segment));
        }
        path.push(escape_segment(&locator.name));
        path
    }

    async fn download(
        &self,
        target: &Path,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<PathBuf> {
        let mut attempt = 1;
        loop {
            cx.return_to_subject().await?;
            cx.session.clear_staging().await?;

            match cx.site.fetch(cx.session, activity).await? {
                FetchOutcome::Inline { content, extension } => {
                    let path = with_extension_appended(target, Some(OsStr::new(extension)));
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    write_file(&path, content.as_bytes()).await?;
                    return Ok(path);
                }
                FetchOutcome::Deferred => {
                    let staging = cx.session.staging_dir().to_path_buf();
                    let cancel = cx.session.cancellation().clone();
                    match self.watcher.wait(&staging, &cancel).await {
                        Ok(saved) => {
                            let path = with_extension_appended(target, saved.extension());
                            if let Some(parent) = path.parent() {
                                tokio::fs::create_dir_all(parent).await?;
                            }
                            move_file(&saved, &path).await?;
                            return Ok(path);
                        }
                        Err(CrawlError::DownloadTimeout { .. }) if attempt < self.attempts => {
                            tracing::warn!(
                                "Download of '{}' timed out (attempt {attempt}/{}), retrying",
                                activity.name,
                                self.attempts
                            );
                            attempt += 1;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Sink for DownloadSink {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        let target = self.target_path(locator);

        if let Some(existing) = find_existing(&target).await? {
            tracing::info!(
                "Activity '{}' already downloaded: {}",
                activity.name,
                existing.display()
            );
            return Ok(());
        }

        if activity.kind.fetch_strategy() == FetchStrategy::Unsupported {
            tracing::warn!(
                "Cannot download activity '{}': its type ({}) is unsupported.",
                activity.name,
                activity.kind
            );
            return Ok(());
        }

        match self.download(&target, activity, cx).await {
            Ok(path) => {
                tracing::info!(
                    "Downloaded activity '{}' ({}) to {}",
                    activity.name,
                    activity.kind,
                    path.display()
                );
                Ok(())
            }
            Err(CrawlError::UnsupportedActivity(kind)) => {
                tracing::warn!(
                    "Cannot download activity '{}': its type ({kind}) is unsupported.",
                    activity.name
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
