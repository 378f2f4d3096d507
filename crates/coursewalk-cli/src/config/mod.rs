//! Configuration loading and resolution.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use coursewalk::FilterSpec;

/// Credentials file looked up in the working directory by default.
pub const DEFAULT_CREDENTIALS_FILE: &str = "mebis-credentials.json";

/// Resolve the credentials file path.
pub fn resolve_credentials_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var("COURSEWALK_CREDENTIALS") {
        return PathBuf::from(env_path);
    }

    PathBuf::from(DEFAULT_CREDENTIALS_FILE)
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read credentials from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid credentials file {}", path.display()))
    }
}

/// Read a file, or stdin for `-`.
pub fn read_source(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))
}

/// Load a filter spec from a file, or stdin for `-`.
pub fn load_filter(path: &str) -> anyhow::Result<FilterSpec> {
    let raw = read_source(path)?;
    let spec = FilterSpec::from_json(&raw).with_context(|| format!("in filter {path}"))?;
    if spec.is_empty() {
        tracing::warn!("Filter {path} admits no course; nothing will be visited");
    }
    Ok(spec)
}
