use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory ({var} is not set)")]
    NoUserHome { var: &'static str },

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

#[cfg(target_os = "windows")]
const USER_HOME_VAR: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const USER_HOME_VAR: &str = "HOME";

fn user_home() -> Result<PathBuf, HomeDirError> {
    env::var_os(USER_HOME_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::NoUserHome {
            var: USER_HOME_VAR,
        })
}

/// Expand a leading `~` against the platform user home.
fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return user_home();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(user_home()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

fn absolutize(p: &Path) -> Result<PathBuf, HomeDirError> {
    if p.is_absolute() {
        Ok(p.to_path_buf())
    } else {
        Ok(env::current_dir()
            .map_err(HomeDirError::CurrentDir)?
            .join(p))
    }
}

/// Resolve the server home directory into an absolute path.
///
/// - `None` (or an empty string) means "platform default": `$HOME/<default_subdir>`
///   on Unix/macOS and `%APPDATA%/<default_subdir>` on Windows.
/// - A leading `~` is expanded; relative paths are resolved against the current directory.
/// - With `create = true` the directory is created if it does not exist yet.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let resolved = match configured.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => absolutize(&expand_tilde(raw)?)?,
        _ => user_home()?.join(default_subdir),
    };

    if create {
        std::fs::create_dir_all(&resolved).map_err(|source| HomeDirError::Create {
            path: resolved.clone(),
            source,
        })?;
    }

    Ok(resolved)
}
