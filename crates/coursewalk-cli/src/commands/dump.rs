//! Offline course dump tools.

use serde_json::Value;

use coursewalk::{reconcile, ActivityRecord, CompletionOverlay};

use super::{read_json, write_json};

/// Hierarchical dump to flat list.
pub fn flatten(input: Option<&str>) -> anyhow::Result<()> {
    let tree: Value = read_json(input)?;
    write_json(&reconcile::flatten(&tree))
}

/// Flat list to hierarchical dump.
pub fn deflatten(input: Option<&str>) -> anyhow::Result<()> {
    let records: Vec<ActivityRecord> = read_json(input)?;
    write_json(&reconcile::deflatten(&records))
}

/// Activities of flat dump `b` missing from flat dump `a`.
pub fn diff(b: &str, a: &str) -> anyhow::Result<()> {
    let b: Vec<ActivityRecord> = read_json(Some(b))?;
    let a: Vec<ActivityRecord> = read_json(Some(a))?;
    let added = reconcile::diff(&b, &a);
    tracing::info!("{} of {} activities are new", added.len(), b.len());
    write_json(&added)
}

/// Flat list to completion overlay.
pub fn overlay(input: Option<&str>) -> anyhow::Result<()> {
    let records: Vec<ActivityRecord> = read_json(input)?;
    write_json(&reconcile::build_overlay(&records))
}

/// Apply a completion overlay to a flat or hierarchical dump.
pub fn patch(overlay: &str, base: Option<&str>) -> anyhow::Result<()> {
    let overlay: CompletionOverlay = read_json(Some(overlay))?;
    let mut dump: Value = read_json(base)?;
    let patched = reconcile::patch_in_place(&mut dump, &overlay);
    tracing::info!("Patched {patched} activities");
    write_json(&dump)
}
