//! Serialized projection of an activity.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::locator::Locator;

/// One activity in a flat listing.
///
/// Fields not known to this crate are preserved in `extra`, and optional
/// fields absent from a dump stay absent, so that records read from a dump
/// are written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecord", into = "RawRecord")]
pub struct ActivityRecord {
    pub name: String,
    pub kind: String,
    pub complete: Option<bool>,
    pub completed: Option<String>,
    pub subtext: Option<String>,
    pub course: String,
    pub subcourse: Option<String>,
    pub subject: String,
    pub extra: Map<String, Value>,
    pub(crate) present: Present,
}

/// Which optional keys a record carries when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Present {
    kind: bool,
    complete: bool,
    completed: bool,
    subtext: bool,
    subcourse: bool,
}

impl Present {
    pub(crate) const ALL: Self = Self {
        kind: true,
        complete: true,
        completed: true,
        subtext: true,
        subcourse: true,
    };
}

/// Wire shape: an outer `None` is a missing key, `Some(None)` is `null`.
#[derive(Serialize, Deserialize)]
struct RawRecord {
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    complete: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    completed: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    subtext: Option<Option<String>>,
    course: String,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    subcourse: Option<Option<String>>,
    subject: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl From<RawRecord> for ActivityRecord {
    fn from(raw: RawRecord) -> Self {
        let present = Present {
            kind: raw.kind.is_some(),
            complete: raw.complete.is_some(),
            completed: raw.completed.is_some(),
            subtext: raw.subtext.is_some(),
            subcourse: raw.subcourse.is_some(),
        };
        Self {
            name: raw.name,
            kind: raw.kind.unwrap_or_default(),
            complete: raw.complete.flatten(),
            completed: raw.completed.flatten(),
            subtext: raw.subtext.flatten(),
            course: raw.course,
            subcourse: raw.subcourse.flatten(),
            subject: raw.subject,
            extra: raw.extra,
            present,
        }
    }
}

/// A field is written if the source had it or it has since been given a value.
fn written<T>(present: bool, value: Option<T>) -> Option<Option<T>> {
    (present || value.is_some()).then_some(value)
}

impl From<ActivityRecord> for RawRecord {
    fn from(record: ActivityRecord) -> Self {
        let present = record.present;
        Self {
            name: record.name,
            kind: (present.kind || !record.kind.is_empty()).then_some(record.kind),
            complete: written(present.complete, record.complete),
            completed: written(present.completed, record.completed),
            subtext: written(present.subtext, record.subtext),
            course: record.course,
            subcourse: written(present.subcourse, record.subcourse),
            subject: record.subject,
            extra: record.extra,
        }
    }
}

impl ActivityRecord {
    pub fn locator(&self) -> Locator {
        Locator {
            course: self.course.clone(),
            subcourse: self.subcourse.clone(),
            subject: self.subject.clone(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive() {
        let value = json!({
            "name": "Sheet",
            "type": "modtype_resource",
            "complete": true,
            "completed": "2020-05-01",
            "subtext": null,
            "course": "Math",
            "subcourse": null,
            "subject": "Algebra",
            "grade": 2
        });
        let record: ActivityRecord = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(record.extra.get("grade"), Some(&json!(2)));
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn test_optional_fields_default() {
        let record: ActivityRecord =
            serde_json::from_value(json!({"name": "n", "course": "c", "subject": "s"})).unwrap();
        assert_eq!(record.complete, None);
        assert_eq!(record.kind, "");
        assert_eq!(record.locator().to_string(), "c/s/n");
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let value = json!({"name": "n", "course": "c", "subject": "s", "complete": null});
        let record: ActivityRecord = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), value);
    }

    #[test]
    fn test_assigned_field_is_written() {
        let mut record: ActivityRecord =
            serde_json::from_value(json!({"name": "n", "course": "c", "subject": "s"})).unwrap();
        record.complete = Some(true);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"name": "n", "complete": true, "course": "c", "subject": "s"})
        );
    }
}
