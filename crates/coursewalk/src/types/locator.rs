//! Cross-snapshot activity identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `(course, subcourse, subject, name)`. Two activities with equal
/// locators are the same entity for diffing and patching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Locator {
    pub course: String,
    pub subcourse: Option<String>,
    pub subject: String,
    pub name: String,
}

impl Locator {
    pub fn new(
        course: impl Into<String>,
        subcourse: Option<impl Into<String>>,
        subject: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            course: course.into(),
            subcourse: subcourse.map(Into::into),
            subject: subject.into(),
            name: name.into(),
        }
    }

    /// Read a locator from the fields of a flat activity object.
    ///
    /// Returns `None` if `course`, `subject` or `name` is missing or not a
    /// string. A missing or null `subcourse` means the course has none.
    pub fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        let course = obj.get("course")?.as_str()?;
        let subject = obj.get("subject")?.as_str()?;
        let name = obj.get("name")?.as_str()?;
        let subcourse = match obj.get("subcourse") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return None,
        };
        Some(Self {
            course: course.to_string(),
            subcourse,
            subject: subject.to_string(),
            name: name.to_string(),
        })
    }

    /// The grouping path, `[course, subcourse?, subject]`.
    pub fn scope_path(&self) -> Vec<&str> {
        let mut path = vec![self.course.as_str()];
        if let Some(sub) = &self.subcourse {
            path.push(sub.as_str());
        }
        path.push(self.subject.as_str());
        path
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.scope_path() {
            write!(f, "{segment}/")?;
        }
        f.write_str(&self.name)
    }
}
