//! Content nodes resolved from the live site.
//!
//! Nodes are ephemeral: they are rebuilt from the current page every time
//! they are needed and never hold a live reference into the browser.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::locator::Locator;
use super::record::{ActivityRecord, Present};

/// Prefix of the CSS class Moodle puts on every activity element.
const MODTYPE_PREFIX: &str = "modtype_";

/// A course as listed on the platform's dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRef {
    pub name: String,
    pub location: String,
}

/// A subcourse reachable from a course page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcourseRef {
    pub name: String,
    pub location: String,
}

/// A subject (course section) on the current scope's page.
///
/// `key` is the section's stable identifier on that page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
    pub name: String,
    pub key: String,
}

/// Stable identifier of an activity within its subject's page.
///
/// Used to re-resolve an activity after the page has been reloaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub String);

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed vocabulary of activity types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    Label,
    Page,
    Url,
    Resource,
    Folder,
    Assign,
    Forum,
    Quiz,
    Other(String),
}

/// How the content of an activity is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// HTML content read from the page and stored as a file.
    InlineHtml,
    /// The link target of the activity, stored as text.
    LinkTarget,
    /// A single file saved by the browser into the staging directory.
    DirectFile,
    /// A folder archive saved by the browser into the staging directory.
    FolderArchive,
    Unsupported,
}

impl ActivityKind {
    /// Parse a type tag, with or without the `modtype_` prefix.
    pub fn from_tag(tag: &str) -> Self {
        let bare = tag.strip_prefix(MODTYPE_PREFIX).unwrap_or(tag);
        match bare {
            "label" => ActivityKind::Label,
            "page" => ActivityKind::Page,
            "url" => ActivityKind::Url,
            "resource" => ActivityKind::Resource,
            "folder" => ActivityKind::Folder,
            "assign" => ActivityKind::Assign,
            "forum" => ActivityKind::Forum,
            "quiz" => ActivityKind::Quiz,
            other => ActivityKind::Other(other.to_string()),
        }
    }

    /// The `modtype_<x>` tag used in listings.
    pub fn tag(&self) -> String {
        let bare = match self {
            ActivityKind::Label => "label",
            ActivityKind::Page => "page",
            ActivityKind::Url => "url",
            ActivityKind::Resource => "resource",
            ActivityKind::Folder => "folder",
            ActivityKind::Assign => "assign",
            ActivityKind::Forum => "forum",
            ActivityKind::Quiz => "quiz",
            ActivityKind::Other(other) => other.as_str(),
        };
        format!("{MODTYPE_PREFIX}{bare}")
    }

    pub fn fetch_strategy(&self) -> FetchStrategy {
        match self {
            ActivityKind::Label | ActivityKind::Page => FetchStrategy::InlineHtml,
            ActivityKind::Url => FetchStrategy::LinkTarget,
            ActivityKind::Resource => FetchStrategy::DirectFile,
            ActivityKind::Folder => FetchStrategy::FolderArchive,
            ActivityKind::Assign
            | ActivityKind::Forum
            | ActivityKind::Quiz
            | ActivityKind::Other(_) => FetchStrategy::Unsupported,
        }
    }

    /// File extension for content returned inline, if the kind has one.
    pub fn inline_extension(&self) -> Option<&'static str> {
        match self.fetch_strategy() {
            FetchStrategy::InlineHtml => Some("html"),
            FetchStrategy::LinkTarget => Some("url"),
            _ => None,
        }
    }
}

impl From<String> for ActivityKind {
    fn from(tag: String) -> Self {
        ActivityKind::from_tag(&tag)
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        kind.tag()
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

/// A leaf item of the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub kind: ActivityKind,
    /// `None` when the activity has no completion tracking.
    pub complete: Option<bool>,
    pub completed: Option<String>,
    pub subtext: Option<String>,
    pub href: Option<String>,
}

impl Activity {
    /// Completion state, with "not applicable" read as incomplete.
    pub fn is_complete(&self) -> bool {
        self.complete.unwrap_or(false)
    }

    /// Project this activity into its serialized record.
    pub fn to_record(&self, locator: &Locator) -> ActivityRecord {
        ActivityRecord {
            name: self.name.clone(),
            kind: self.kind.tag(),
            complete: self.complete,
            completed: self.completed.clone(),
            subtext: self.subtext.clone(),
            course: locator.course.clone(),
            subcourse: locator.subcourse.clone(),
            subject: locator.subject.clone(),
            extra: serde_json::Map::new(),
            present: Present::ALL,
        }
    }
}
