// src/util.rs

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Read a UTF-8 file into a String with a clear error message.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

/// Ensure the parent directory of `path` exists (create it if missing).
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }
    Ok(())
}

/// Resolve a status URL given on the command line.
///
/// Absolute `http(s)://` URLs are used as-is. Anything else is treated as a
/// path relative to `base_url`.
///
/// Example:
/// base_url = https://api.hubapi.com/
/// target   = /dfs/v1/builds/42/status
/// → https://api.hubapi.com/dfs/v1/builds/42/status
pub fn resolve_url(base_url: Option<&str>, target: &str) -> Result<String> {
    let target = target.trim();
    if target.is_empty() {
        bail!("Status URL is empty");
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        return Ok(target.to_string());
    }

    let base = match base_url.map(str::trim).filter(|b| !b.is_empty()) {
        Some(b) => b,
        None => bail!(
            "'{}' is a relative URL but api.base_url is not set in the config",
            target
        ),
    };

    Ok(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        target.trim_start_matches('/')
    ))
}
