//! Default filesystem locations.

use std::path::PathBuf;

use thiserror::Error;

/// Directory name of the managed process checkout under the home directory.
pub const DEFAULT_WORKDIR_NAME: &str = "Heroku-dev";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the user's home directory.
    #[error("Cannot determine home directory")]
    NoHomeDir,
}

/// The current user's home directory.
pub fn home_dir() -> Result<PathBuf, PathError> {
    dirs::home_dir().ok_or(PathError::NoHomeDir)
}

/// Default working directory of the managed process (`~/Heroku-dev`).
pub fn default_workdir() -> Result<PathBuf, PathError> {
    Ok(home_dir()?.join(DEFAULT_WORKDIR_NAME))
}
