//! Activity sinks: consumers invoked once per discovered activity.

mod completion;
mod download;
mod list;

pub use completion::{CompletionFilterSink, CompletionSyncSink};
pub use download::{escape_segment, find_existing, DownloadSink};
pub use list::{FlatListSink, ListDetail, ListSink};
pub(crate) use list::{child_object, insert_grouped};

use async_trait::async_trait;

use crate::session::NavigationSession;
use crate::site::SiteLayout;
use crate::types::{Activity, CrawlResult, Locator};

/// What a sink may use while handling an activity.
pub struct SinkContext<'a> {
    pub session: &'a mut NavigationSession,
    pub site: &'a dyn SiteLayout,
    /// Location of the subject page the activity was resolved on.
    pub location: &'a str,
}

impl SinkContext<'_> {
    /// Go back to the subject page if an earlier step navigated away.
    pub async fn return_to_subject(&mut self) -> CrawlResult<bool> {
        self.session.ensure_at(self.location).await
    }
}

/// A consumer of activity events.
///
/// Expected misses (an activity absent from an overlay, an already
/// downloaded file) are not errors.
#[async_trait]
pub trait Sink: Send {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()>;
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for &mut S {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        (**self).accept(locator, activity, cx).await
    }
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Box<S> {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        (**self).accept(locator, activity, cx).await
    }
}

/// Dispatches each activity to every child, in registration order.
///
/// The first child error stops dispatch for that activity and is returned.
pub struct CompositeSink<'a> {
    sinks: Vec<Box<dyn Sink + 'a>>,
}

impl<'a> CompositeSink<'a> {
    pub fn new(sinks: Vec<Box<dyn Sink + 'a>>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: impl Sink + 'a) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Sink for CompositeSink<'_> {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        for sink in &mut self.sinks {
            sink.accept(locator, activity, cx).await?;
        }
        Ok(())
    }
}
