//! JSON configuration files.
//!
//! Every config struct is `#[serde(default)]`, so a file only needs the keys it
//! changes.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;

pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    debug!(path = %path.display(), "loading config");
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Load `path` if given, otherwise fall back to `default`.
pub fn load_or<T: DeserializeOwned>(path: Option<&Path>, default: impl FnOnce() -> T) -> Result<T> {
    match path {
        Some(p) => load_json(p),
        None => Ok(default()),
    }
}

pub fn save_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
