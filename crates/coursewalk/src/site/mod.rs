//! Site layout: how the content tree is read from the current page.
//!
//! Layouts never hand out live page handles. Everything they return is
//! plain data; activities are re-resolved by [`ActivityId`] whenever the
//! traversal needs them.

pub mod moodle;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::session::NavigationSession;
use crate::types::{Activity, ActivityId, CourseRef, CrawlError, CrawlResult, SubcourseRef, SubjectRef};

/// Subcourses reachable from a course page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseScopes {
    /// The subcourse the course page itself shows, if any.
    pub current: Option<SubcourseRef>,
    /// Sibling subcourses, in page order.
    pub secondary: Vec<SubcourseRef>,
}

impl CourseScopes {
    /// Whether the course has no subcourse concept at all.
    pub fn is_flat(&self) -> bool {
        self.current.is_none() && self.secondary.is_empty()
    }
}

/// Result of fetching an activity's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Content to be written directly, with its file extension.
    Inline {
        content: String,
        extension: &'static str,
    },
    /// The browser was told to save a file into the staging directory.
    Deferred,
}

#[async_trait]
pub trait SiteLayout: Send + Sync {
    /// Courses listed on the root page (already acquired).
    async fn courses(&self, session: &mut NavigationSession) -> CrawlResult<Vec<CourseRef>>;

    /// Subcourses of the course page currently loaded.
    async fn scopes(&self, session: &mut NavigationSession) -> CrawlResult<CourseScopes>;

    /// Subjects of the scope page currently loaded.
    async fn subjects(&self, session: &mut NavigationSession) -> CrawlResult<Vec<SubjectRef>>;

    /// Identifiers of the activities in `subject`, expanding it first if collapsed.
    async fn activity_ids(
        &self,
        session: &mut NavigationSession,
        subject: &SubjectRef,
    ) -> CrawlResult<Vec<ActivityId>>;

    /// Resolve one activity freshly from the current page.
    async fn activity(
        &self,
        session: &mut NavigationSession,
        subject: &SubjectRef,
        id: &ActivityId,
    ) -> CrawlResult<Option<Activity>>;

    /// Obtain the content of an activity. May navigate away from the subject page.
    async fn fetch(
        &self,
        session: &mut NavigationSession,
        activity: &Activity,
    ) -> CrawlResult<FetchOutcome>;

    /// Flip the activity's manual completion toggle.
    async fn toggle_completion(
        &self,
        session: &mut NavigationSession,
        activity: &Activity,
    ) -> CrawlResult<()>;

    /// Invoke the logout affordance on the current page.
    async fn logout(&self, session: &mut NavigationSession) -> CrawlResult<()>;
}

/// Evaluate a script and deserialize its JSON result.
pub(crate) async fn query<T: DeserializeOwned>(
    session: &mut NavigationSession,
    script: &str,
) -> CrawlResult<T> {
    let value = session.evaluate(script).await?;
    serde_json::from_value(value)
        .map_err(|e| CrawlError::Backend(format!("unexpected page query result: {e}")))
}
