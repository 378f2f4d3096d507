//! Depth-first walk over the course tree.
//!
//! Nodes are never held across a sink call. Activities are resolved by
//! [`ActivityId`] right before they are handed out, after the engine has
//! made sure the backend is back on the subject page.

use crate::filter::Visitor;
use crate::session::NavigationSession;
use crate::sink::SinkContext;
use crate::site::SiteLayout;
use crate::types::{ActivityId, CourseRef, CrawlError, CrawlResult, SubcourseRef, SubjectRef};

/// Counters of one traversal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TraversalStats {
    /// Courses entered.
    pub courses: usize,
    /// Activities handed to the visitor.
    pub activities: usize,
    /// Activities skipped after a recoverable failure.
    pub failed: usize,
}

pub struct TraversalEngine<'a> {
    site: &'a dyn SiteLayout,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(site: &'a dyn SiteLayout) -> Self {
        Self { site }
    }

    /// Walk every course reachable from the session's root location.
    ///
    /// `exit_*` is called exactly for the levels whose `enter_*` returned
    /// true, also when the walk below them failed.
    pub async fn run(
        &self,
        session: &mut NavigationSession,
        visitor: &mut dyn Visitor,
    ) -> CrawlResult<TraversalStats> {
        let mut stats = TraversalStats::default();

        let root = session.root_url().to_string();
        session.acquire(&root).await?;
        let courses = self.site.courses(session).await?;
        tracing::debug!("Found {} courses", courses.len());

        for course in &courses {
            if !visitor.enter_course(&course.name) {
                continue;
            }
            stats.courses += 1;
            let walked = self.walk_course(session, visitor, course, &mut stats).await;
            visitor.exit_course();
            walked?;
        }

        Ok(stats)
    }

    async fn walk_course(
        &self,
        session: &mut NavigationSession,
        visitor: &mut dyn Visitor,
        course: &CourseRef,
        stats: &mut TraversalStats,
    ) -> CrawlResult<()> {
        session.acquire(&course.location).await?;
        let scopes = self.site.scopes(session).await?;

        if scopes.is_flat() {
            return self.walk_scope(session, visitor, stats).await;
        }

        if let Some(current) = &scopes.current {
            self.walk_subcourse(session, visitor, current, false, stats)
                .await?;
        }
        for subcourse in &scopes.secondary {
            self.walk_subcourse(session, visitor, subcourse, true, stats)
                .await?;
        }
        Ok(())
    }

    async fn walk_subcourse(
        &self,
        session: &mut NavigationSession,
        visitor: &mut dyn Visitor,
        subcourse: &SubcourseRef,
        acquire: bool,
        stats: &mut TraversalStats,
    ) -> CrawlResult<()> {
        if !visitor.enter_subcourse(&subcourse.name) {
            return Ok(());
        }
        let mut walked = Ok(());
        if acquire {
            walked = session.acquire(&subcourse.location).await;
        }
        if walked.is_ok() {
            walked = self.walk_scope(session, visitor, stats).await;
        }
        visitor.exit_subcourse();
        walked
    }

    /// Walk the subjects of the scope page currently loaded.
    async fn walk_scope(
        &self,
        session: &mut NavigationSession,
        visitor: &mut dyn Visitor,
        stats: &mut TraversalStats,
    ) -> CrawlResult<()> {
        let scope_location = session.current_location().await?;
        let subjects = self.site.subjects(session).await?;

        for subject in &subjects {
            if !visitor.enter_subject(&subject.name) {
                continue;
            }
            let walked = self
                .walk_subject(session, visitor, &scope_location, subject, stats)
                .await;
            visitor.exit_subject();
            walked?;
        }
        Ok(())
    }

    async fn walk_subject(
        &self,
        session: &mut NavigationSession,
        visitor: &mut dyn Visitor,
        scope_location: &str,
        subject: &SubjectRef,
        stats: &mut TraversalStats,
    ) -> CrawlResult<()> {
        session.ensure_at(scope_location).await?;
        let ids = self.site.activity_ids(session, subject).await?;

        for id in &ids {
            match self
                .visit_activity(session, visitor, scope_location, subject, id)
                .await
            {
                Ok(true) => stats.activities += 1,
                Ok(false) => {}
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("Skipping activity {id} in '{}': {e}", subject.name);
                    stats.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Resolve one activity afresh and hand it to the visitor.
    ///
    /// Returns `false` if the activity no longer exists.
    async fn visit_activity(
        &self,
        session: &mut NavigationSession,
        visitor: &mut dyn Visitor,
        location: &str,
        subject: &SubjectRef,
        id: &ActivityId,
    ) -> CrawlResult<bool> {
        if session.cancellation().is_cancelled() {
            return Err(CrawlError::Cancelled);
        }
        if session.ensure_at(location).await? {
            tracing::debug!("Recovered subject page '{}' before {id}", subject.name);
        }

        let Some(activity) = self.site.activity(session, subject, id).await? else {
            tracing::warn!("Activity {id} disappeared from '{}'", subject.name);
            return Ok(false);
        };

        let mut cx = SinkContext {
            session,
            site: self.site,
            location,
        };
        visitor.accept_activity(&activity, &mut cx).await?;
        Ok(true)
    }
}

/// Run a traversal, then close the session whatever the outcome.
///
/// A traversal error takes precedence over a close error.
pub async fn crawl(
    mut session: NavigationSession,
    site: &dyn SiteLayout,
    visitor: &mut dyn Visitor,
) -> CrawlResult<TraversalStats> {
    let outcome = TraversalEngine::new(site).run(&mut session, visitor).await;
    let closed = session.close(site).await;

    let stats = outcome?;
    closed?;
    tracing::info!(
        "Visited {} activities in {} courses ({} failed)",
        stats.activities,
        stats.courses,
        stats.failed
    );
    Ok(stats)
}
