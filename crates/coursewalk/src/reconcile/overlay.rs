//! Completion overlays and dump patching.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::sink::child_object;
use crate::types::{ActivityRecord, Locator};

/// Externally supplied completion data, nested as
/// `course → [subcourse →] subject → name → entry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionOverlay(pub Value);

/// Completion data for one activity.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEntry {
    /// Bare completion flag.
    Flag(bool),
    /// Record-shaped entry; missing fields read as null.
    Record { complete: Value, completed: Value },
}

impl OverlayEntry {
    /// The completion state an activity should converge to, if the entry
    /// states one.
    pub fn desired_completion(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            Self::Record { complete, .. } => complete.as_bool(),
        }
    }

    fn apply(&self, activity: &mut Map<String, Value>) {
        match self {
            Self::Flag(flag) => {
                activity.insert("complete".into(), Value::Bool(*flag));
            }
            Self::Record {
                complete,
                completed,
            } => {
                activity.insert("complete".into(), complete.clone());
                activity.insert("completed".into(), completed.clone());
            }
        }
    }
}

impl CompletionOverlay {
    pub fn lookup(&self, locator: &Locator) -> Option<OverlayEntry> {
        let mut node = self.0.get(&locator.course)?;
        if let Some(sub) = &locator.subcourse {
            node = node.get(sub)?;
        }
        match node.get(&locator.subject)?.get(&locator.name)? {
            Value::Bool(flag) => Some(OverlayEntry::Flag(*flag)),
            Value::Object(fields) => Some(OverlayEntry::Record {
                complete: fields.get("complete").cloned().unwrap_or(Value::Null),
                completed: fields.get("completed").cloned().unwrap_or(Value::Null),
            }),
            other => {
                tracing::warn!("Ignoring overlay entry for {locator}: unexpected {other}");
                None
            }
        }
    }
}

/// Key flat records by locator into the overlay shape. Later records win.
pub fn build_overlay(records: &[ActivityRecord]) -> CompletionOverlay {
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
        let subject = child_object(&mut tree, &locator.course).and_then(|course| {
            let scope = match &locator.subcourse {
                Some(sub) => child_object(course, sub),
                None => Some(course),
            };
            scope.and_then(|scope| child_object(scope, &locator.subject))
        });
        match subject {
            Some(subject) => {
                subject.insert(locator.name.clone(), value);
            }
            None => tracing::warn!(
                "Schema error: {locator} conflicts with an overlay entry of the same name"
            ),
        }
    }
    CompletionOverlay(Value::Object(tree))
}

/// Overwrite `complete`/`completed` of every activity found in `overlay`.
pub fn patch(mut dump: Value, overlay: &CompletionOverlay) -> Value {
    patch_in_place(&mut dump, overlay);
    dump
}

/// [`patch`] without taking ownership. Returns the number of patched
/// activities.
pub fn patch_in_place(dump: &mut Value, overlay: &CompletionOverlay) -> usize {
    match dump {
        Value::Array(items) => items
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .map(|activity| patch_flat(activity, overlay))
            .filter(|hit| *hit)
            .count(),
        Value::Object(courses) => {
            let mut patched = 0;
            for (course, scopes) in courses.iter_mut() {
                let Some(scopes) = scopes.as_object_mut() else {
                    continue;
                };
                for (key, node) in scopes.iter_mut() {
                    patched += match node {
                        Value::Array(items) => patch_list(items, course, None, key, overlay),
                        Value::Object(subjects) => subjects
                            .iter_mut()
                            .filter_map(|(subject, items)| {
                                let items = items.as_array_mut()?;
                                Some(patch_list(items, course, Some(key.as_str()), subject, overlay))
                            })
                            .sum(),
                        _ => 0,
                    };
                }
            }
            patched
        }
        _ => {
            tracing::warn!("Schema error: dump is neither a list nor an object");
            0
        }
    }
}

fn patch_flat(activity: &mut Map<String, Value>, overlay: &CompletionOverlay) -> bool {
    let Some(locator) = Locator::from_object(activity) else {
        return false;
    };
    match overlay.lookup(&locator) {
        Some(entry) => {
            entry.apply(activity);
            true
        }
        None => false,
    }
}

fn patch_list(
    items: &mut [Value],
    course: &str,
    subcourse: Option<&str>,
    subject: &str,
    overlay: &CompletionOverlay,
) -> usize {
    let mut patched = 0;
    for activity in items.iter_mut().filter_map(Value::as_object_mut) {
        let Some(name) = activity.get("name").and_then(Value::as_str) else {
            continue;
        };
        let locator = Locator::new(course, subcourse, subject, name);
        if let Some(entry) = overlay.lookup(&locator) {
            entry.apply(activity);
            patched += 1;
        }
    }
    patched
}
