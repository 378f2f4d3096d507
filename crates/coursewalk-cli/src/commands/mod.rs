//! Command implementations.

pub mod dump;
pub mod scrape;

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::read_source;

/// Parse JSON from a file, or stdin when `path` is `None` or `-`.
pub fn read_json<T: DeserializeOwned>(path: Option<&str>) -> anyhow::Result<T> {
    let path = path.unwrap_or("-");
    let raw = read_source(path)?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {path}"))
}

/// Pretty-print JSON to stdout.
pub fn write_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Pretty-print JSON to `path`, or stdout for `-`.
pub fn write_json_to<T: Serialize + ?Sized>(path: &str, value: &T) -> anyhow::Result<()> {
    if path == "-" {
        return write_json(value);
    }
    let path = Path::new(path);
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");
        let path = path.to_str().unwrap();
        let dump = json!({"Math": {"Algebra": [{"name": "a"}]}});

        write_json_to(path, &dump).unwrap();
        let back: Value = read_json(Some(path)).unwrap();
        assert_eq!(back, dump);
    }

    #[test]
    fn test_invalid_json_names_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();

        let err = read_json::<Value>(path.to_str()).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
