//! Completion-state sinks.

use async_trait::async_trait;

use super::{Sink, SinkContext};
use crate::reconcile::CompletionOverlay;
use crate::types::{Activity, CrawlError, CrawlResult, Locator};

/// Forwards only activities whose completion matches `desired`.
///
/// Activities without a completion affordance count as incomplete.
pub struct CompletionFilterSink<S> {
    inner: S,
    desired: bool,
}

impl<S: Sink> CompletionFilterSink<S> {
    pub fn new(inner: S, desired: bool) -> Self {
        Self { inner, desired }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: Sink> Sink for CompletionFilterSink<S> {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        if activity.is_complete() != self.desired {
            return Ok(());
        }
        self.inner.accept(locator, activity, cx).await
    }
}

/// Converges each activity's completion toggle to an overlay.
///
/// Activities missing from the overlay are left alone.
pub struct CompletionSyncSink {
    overlay: CompletionOverlay,
}

impl CompletionSyncSink {
    pub fn new(overlay: CompletionOverlay) -> Self {
        Self { overlay }
    }
}

#[async_trait]
impl Sink for CompletionSyncSink {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        let Some(desired) = self
            .overlay
            .lookup(locator)
            .and_then(|entry| entry.desired_completion())
        else {
            return Ok(());
        };

        let Some(current) = activity.complete else {
            tracing::warn!("{}", CrawlError::Uncompletable(activity.name.clone()));
            return Ok(());
        };
        if current == desired {
            return Ok(());
        }

        cx.return_to_subject().await?;
        match cx.site.toggle_completion(cx.session, activity).await {
            Ok(()) => {
                tracing::info!("Marked '{}' as {}", activity.name, completion_word(desired));
                Ok(())
            }
            Err(e @ CrawlError::Uncompletable(_)) => {
                tracing::warn!("{e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn completion_word(complete: bool) -> &'static str {
    if complete {
        "complete"
    } else {
        "incomplete"
    }
}
