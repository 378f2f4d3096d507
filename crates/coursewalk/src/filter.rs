//! Visitor hooks and the allow-list filter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sink::{Sink, SinkContext};
use crate::types::{Activity, CrawlError, CrawlResult, Locator};

/// Decides descent at each tree level and receives the leaves.
///
/// `exit_*` is only called when the matching `enter_*` returned `true`.
#[async_trait]
pub trait Visitor: Send {
    fn enter_course(&mut self, name: &str) -> bool;
    fn exit_course(&mut self);
    fn enter_subcourse(&mut self, name: &str) -> bool;
    fn exit_subcourse(&mut self);
    fn enter_subject(&mut self, name: &str) -> bool;
    fn exit_subject(&mut self);
    async fn accept_activity(
        &mut self,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()>;
}

/// Nested allow-list mirroring the tree.
///
/// A key that is present means "descend"; its children are filtered
/// independently. A missing key means "skip".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec(pub BTreeMap<String, CourseFilter>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFilter {
    #[serde(default)]
    pub subcourses: BTreeMap<String, SubcourseFilter>,
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcourseFilter {
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectFilter {}

impl FilterSpec {
    pub fn from_json(json: &str) -> CrawlResult<Self> {
        serde_json::from_str(json).map_err(|e| CrawlError::InvalidFilter(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builder-style: allow `course → subject`.
    pub fn allow_subject(mut self, course: &str, subject: &str) -> Self {
        self.0
            .entry(course.to_string())
            .or_default()
            .subjects
            .insert(subject.to_string(), SubjectFilter {});
        self
    }

    /// Builder-style: allow `course → subcourse → subject`.
    pub fn allow_subcourse_subject(mut self, course: &str, subcourse: &str, subject: &str) -> Self {
        self.0
            .entry(course.to_string())
            .or_default()
            .subcourses
            .entry(subcourse.to_string())
            .or_default()
            .subjects
            .insert(subject.to_string(), SubjectFilter {});
        self
    }
}

#[derive(Debug, Default)]
struct Cursor {
    course: Option<String>,
    subcourse: Option<String>,
    subject: Option<String>,
}

/// Stateful cursor gating descent by a [`FilterSpec`] and forwarding
/// accepted activities, with their locator, to a sink.
pub struct FilterVisitor<S> {
    spec: FilterSpec,
    sink: S,
    cursor: Cursor,
}

impl<S: Sink> FilterVisitor<S> {
    pub fn new(spec: FilterSpec, sink: S) -> Self {
        Self {
            spec,
            sink,
            cursor: Cursor::default(),
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn course_filter(&self) -> Option<&CourseFilter> {
        self.cursor.course.as_ref().and_then(|c| self.spec.0.get(c))
    }

    fn locator(&self, name: &str) -> CrawlResult<Locator> {
        match (&self.cursor.course, &self.cursor.subject) {
            (Some(course), Some(subject)) => Ok(Locator {
                course: course.clone(),
                subcourse: self.cursor.subcourse.clone(),
                subject: subject.clone(),
                name: name.to_string(),
            }),
            _ => Err(CrawlError::InvalidState(format!(
                "activity '{name}' accepted outside an entered subject"
            ))),
        }
    }
}

#[async_trait]
impl<S: Sink> Visitor for FilterVisitor<S> {
    fn enter_course(&mut self, name: &str) -> bool {
        if self.spec.0.contains_key(name) {
            self.cursor.course = Some(name.to_string());
            return true;
        }
        false
    }

    fn exit_course(&mut self) {
        self.cursor.course = None;
    }

    fn enter_subcourse(&mut self, name: &str) -> bool {
        let allowed = self
            .course_filter()
            .map(|c| c.subcourses.contains_key(name))
            .unwrap_or(false);
        if allowed {
            self.cursor.subcourse = Some(name.to_string());
        }
        allowed
    }

    fn exit_subcourse(&mut self) {
        self.cursor.subcourse = None;
    }

    fn enter_subject(&mut self, name: &str) -> bool {
        let allowed = match (self.course_filter(), &self.cursor.subcourse) {
            (Some(course), Some(sub)) => course
                .subcourses
                .get(sub)
                .map(|s| s.subjects.contains_key(name))
                .unwrap_or(false),
            (Some(course), None) => course.subjects.contains_key(name),
            (None, _) => false,
        };
        if allowed {
            self.cursor.subject = Some(name.to_string());
        }
        allowed
    }

    fn exit_subject(&mut self) {
        self.cursor.subject = None;
    }

    async fn accept_activity(
        &mut self,
        activity: &Activity,
        cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        let locator = self.locator(&activity.name)?;
        self.sink.accept(&locator, activity, cx).await
    }
}
