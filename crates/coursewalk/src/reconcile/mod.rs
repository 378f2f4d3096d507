//! Offline reconciliation of course dumps.
//!
//! A hierarchical dump is `{course: {[subcourse:] {subject: [record, ...]}}}`,
//! a flat dump is `[record, ...]`. Malformed nodes are logged and dropped,
//! never fatal.

mod overlay;

pub use overlay::{build_overlay, patch, patch_in_place, CompletionOverlay, OverlayEntry};

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::sink::insert_grouped;
use crate::types::{ActivityRecord, CrawlError, Locator};

/// Deepest path a list may sit at: `course / subcourse / subject`.
const MAX_SCOPE_DEPTH: usize = 3;

/// Collect every record of a hierarchical dump, tagged with the path that
/// led to it.
pub fn flatten(tree: &Value) -> Vec<ActivityRecord> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk(tree, &mut path, &mut out);
    out
}

fn walk<'t>(node: &'t Value, path: &mut Vec<&'t str>, out: &mut Vec<ActivityRecord>) {
    match node {
        Value::Object(map) => {
            if path.len() >= MAX_SCOPE_DEPTH {
                tracing::warn!("Schema error: course dump too deep at {}", path.join("/"));
                return;
            }
            for (key, child) in map {
                path.push(key);
                walk(child, path, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            let Some(scope) = Scope::from_path(path) else {
                tracing::warn!(
                    "Schema error: activity list at wrong depth ({})",
                    path.len()
                );
                return;
            };
            for item in items {
                match scope.tag(item) {
                    Ok(record) => out.push(record),
                    Err(e) => tracing::warn!("Schema error in {}: {e}", path.join("/")),
                }
            }
        }
        _ => tracing::warn!("Schema error: illegal bare atom at {}", path.join("/")),
    }
}

struct Scope<'p> {
    course: &'p str,
    subcourse: Option<&'p str>,
    subject: &'p str,
}

impl<'p> Scope<'p> {
    fn from_path(path: &[&'p str]) -> Option<Self> {
        match *path {
            [course, subject] => Some(Self {
                course,
                subcourse: None,
                subject,
            }),
            [course, subcourse, subject] => Some(Self {
                course,
                subcourse: Some(subcourse),
                subject,
            }),
            _ => None,
        }
    }

    fn tag(&self, item: &Value) -> Result<ActivityRecord, CrawlError> {
        let Value::Object(fields) = item else {
            return Err(CrawlError::MalformedDump("activities must be objects".into()));
        };
        let mut fields = fields.clone();
        fields.insert("course".into(), Value::from(self.course));
        fields.insert(
            "subcourse".into(),
            self.subcourse.map(Value::from).unwrap_or(Value::Null),
        );
        fields.insert("subject".into(), Value::from(self.subject));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Group flat records back into the hierarchical shape.
pub fn deflatten(records: &[ActivityRecord]) -> Value {
    let mut tree = Map::new();
    for record in records {
        let locator = record.locator();
        let value = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Dropping {locator}: {e}");
                continue;
            }
        };
        if !insert_grouped(&mut tree, &locator, value) {
            tracing::warn!(
                "Schema error: {locator} conflicts with a subcourse or subject of the same name"
            );
        }
    }
    Value::Object(tree)
}

/// Records of `b` whose locator does not occur in `a`, in `b`'s order.
///
/// Each locator appears at most once; a repeated locator in `b` keeps its
/// first record.
pub fn diff(b: &[ActivityRecord], a: &[ActivityRecord]) -> Vec<ActivityRecord> {
    let mut seen: HashSet<Locator> = a.iter().map(ActivityRecord::locator).collect();
    b.iter()
        .filter(|record| seen.insert(record.locator()))
        .cloned()
        .collect()
}
