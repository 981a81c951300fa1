use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

const APPLICATION_DIR_NAME: &str = "career-tally";

/// Directory holding entries and logs. An explicit directory wins over the platform default.
/// The directory is created when missing.
pub fn resolve_app_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) => path,
        None => default_app_dir(|name| env::var(name).ok())?,
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// `%APPDATA%` on Windows, otherwise `$XDG_STATE_HOME` with a `$HOME/.local/state` fallback.
fn default_app_dir(var: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    let base = if cfg!(windows) {
        var("APPDATA")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("APPDATA should be present on Windows"))?
    } else {
        var("XDG_STATE_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| var("HOME").map(|home| PathBuf::from(home).join(".local/state")))
            .ok_or_else(|| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?
    };
    Ok(base.join(APPLICATION_DIR_NAME))
}
