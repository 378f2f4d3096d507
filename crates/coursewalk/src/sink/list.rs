//! Listing sinks.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Sink, SinkContext};
use crate::types::{Activity, ActivityRecord, CrawlResult, Locator};

/// What the hierarchical listing stores per activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListDetail {
    /// Activity names only.
    Names,
    /// Full activity records.
    #[default]
    Records,
}

/// Groups activities as `course → [subcourse →] subject → [entry]`.
#[derive(Debug, Default)]
pub struct ListSink {
    detail: ListDetail,
    tree: Map<String, Value>,
}

impl ListSink {
    pub fn new(detail: ListDetail) -> Self {
        Self {
            detail,
            tree: Map::new(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.tree)
    }

    fn entry(&self, locator: &Locator, activity: &Activity) -> CrawlResult<Value> {
        Ok(match self.detail {
            ListDetail::Names => Value::String(activity.name.clone()),
            ListDetail::Records => serde_json::to_value(activity.to_record(locator))?,
        })
    }
}

/// Descend into `map[key]`, creating an object if absent.
///
/// Returns `None` if the key already holds a non-object.
pub(crate) fn child_object<'m>(
    map: &'m mut Map<String, Value>,
    key: &str,
) -> Option<&'m mut Map<String, Value>> {
    map.entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}

/// Append to the list at `map[key]`, creating it if absent.
///
/// Returns `false` if the key already holds a non-list.
pub(crate) fn push_to_list(map: &mut Map<String, Value>, key: &str, value: Value) -> bool {
    match map
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => {
            items.push(value);
            true
        }
        _ => false,
    }
}

/// Insert `value` at the grouping path of `locator`, appending to the
/// subject's list. Returns `false` on a shape conflict.
pub(crate) fn insert_grouped(
    tree: &mut Map<String, Value>,
    locator: &Locator,
    value: Value,
) -> bool {
    let Some(course) = child_object(tree, &locator.course) else {
        return false;
    };
    let scope = match &locator.subcourse {
        Some(sub) => match child_object(course, sub) {
            Some(scope) => scope,
            None => return false,
        },
        None => course,
    };
    push_to_list(scope, &locator.subject, value)
}

#[async_trait]
impl Sink for ListSink {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        _cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        let entry = self.entry(locator, activity)?;
        if !insert_grouped(&mut self.tree, locator, entry) {
            tracing::warn!(
                "Listing conflict at {locator}: name is used by both a subcourse and a subject"
            );
        }
        Ok(())
    }
}

/// Collects one [`ActivityRecord`] per activity, in visit order.
#[derive(Debug, Default)]
pub struct FlatListSink {
    records: Vec<ActivityRecord>,
}

impl FlatListSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ActivityRecord> {
        self.records
    }
}

#[async_trait]
impl Sink for FlatListSink {
    async fn accept(
        &mut self,
        locator: &Locator,
        activity: &Activity,
        _cx: &mut SinkContext<'_>,
    ) -> CrawlResult<()> {
        self.records.push(activity.to_record(locator));
        Ok(())
    }
}
