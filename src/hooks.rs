// SPDX-FileCopyrightText: The friendly-dist-manager authors
// SPDX-License-Identifier: MPL-2.0

//! Build backend hooks
//!
//! The operations a packaging frontend invokes to turn a source tree into
//! installable artifacts. [`build_wheel`] reads the project's
//! `pyproject.toml`, packages every Python source file beneath the project
//! root and assembles the wheel in the requested output directory.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    pyproject::{PyProject, PyProjectError},
    wheel::{BuildError, WheelBuilder},
};

/// A failed hook invocation.
#[derive(Debug, Error)]
pub enum HookError {
    /// The project directory carries no `pyproject.toml`.
    #[error("pyproject.toml configuration file not found in '{0}'")]
    MissingConfiguration(PathBuf),

    /// The configuration file could not be loaded or lacked required data.
    #[error(transparent)]
    Configuration(#[from] PyProjectError),

    /// Wheel assembly failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Enumerating the project's source files failed.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// Build a wheel for the project rooted at `project_dir`.
///
/// The generated archive is placed in `wheel_directory` and its path is
/// returned.
///
/// # Errors
///
/// Returns a [`HookError`] if the project configuration is missing or
/// unusable, or if packaging fails.
pub fn build_wheel(project_dir: &Path, wheel_directory: &Path) -> Result<PathBuf, HookError> {
    let config_file = project_dir.join("pyproject.toml");
    if !config_file.exists() {
        return Err(HookError::MissingConfiguration(project_dir.to_path_buf()));
    }
    let config = PyProject::from_file(&config_file)?;
    let project = config.project()?;

    let builder = WheelBuilder::new(project.name(), project.version())?;
    for entry in WalkDir::new(project_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension() != Some(OsStr::new("py")) {
            continue;
        }
        let rel_path = entry
            .path()
            .strip_prefix(project_dir)
            .unwrap_or_else(|_| entry.path());
        debug!(file = %rel_path.display(), "adding file to wheel");
        builder.add_file(entry.path(), rel_path.parent().unwrap_or(Path::new("")))?;
    }
    let wheel = builder.build(wheel_directory)?;
    debug!(wheel = %wheel.display(), "generated wheel file");
    Ok(wheel)
}
