// SPDX-FileCopyrightText: The friendly-dist-manager authors
// SPDX-License-Identifier: MPL-2.0

//! `pyproject.toml` parsing
//!
//! Each table within the configuration file is defined by its own
//! independent standard, so the top level parser defers to one type per
//! table: [`ProjectTable`] for `[project]` and [`BuildSystemTable`] for
//! `[build-system]`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

/// A failure to load or interrogate a `pyproject.toml` file.
#[derive(Debug, Error)]
pub enum PyProjectError {
    /// The file could not be read.
    #[error("failed to read '{path}'")]
    Read {
        /// Path of the unreadable file.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The content was not well-formed TOML or a table missed required keys.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// A table the caller asked for is absent.
    #[error("missing '[{0}]' table")]
    MissingTable(&'static str),
}

/// The `[project]` table: distribution identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectTable {
    name: String,
    version: String,
}

impl ProjectTable {
    /// Name of the distribution being built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version of the distribution being built.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// The `[build-system]` table: how to build the distribution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildSystemTable {
    requires: Vec<String>,
    #[serde(rename = "build-backend")]
    build_backend: String,
}

impl BuildSystemTable {
    /// Packages required to run the build backend.
    #[must_use]
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Module path of the build backend for this project.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.build_backend
    }
}

/// A parsed `pyproject.toml` configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PyProject {
    #[serde(rename = "build-system")]
    build_system: Option<BuildSystemTable>,
    project: Option<ProjectTable>,
}

impl PyProject {
    /// Parse a configuration from raw TOML text.
    ///
    /// # Errors
    ///
    /// Returns a [`PyProjectError`] if the text is not well-formed TOML or
    /// a present table misses required keys.
    pub fn from_toml_str(toml_data: &str) -> Result<Self, PyProjectError> {
        Ok(toml::from_str(toml_data)?)
    }

    /// Load a configuration from a disk based file.
    ///
    /// # Errors
    ///
    /// Returns a [`PyProjectError`] if the file cannot be read or parsed.
    pub fn from_file(file_path: &Path) -> Result<Self, PyProjectError> {
        let toml_data = fs::read_to_string(file_path).map_err(|source| PyProjectError::Read {
            path: file_path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&toml_data)
    }

    /// Return the `[build-system]` table.
    ///
    /// # Errors
    ///
    /// Returns [`PyProjectError::MissingTable`] if the file does not declare
    /// one.
    pub fn build_system(&self) -> Result<&BuildSystemTable, PyProjectError> {
        self.build_system
            .as_ref()
            .ok_or(PyProjectError::MissingTable("build-system"))
    }

    /// Return the `[project]` table.
    ///
    /// # Errors
    ///
    /// Returns [`PyProjectError::MissingTable`] if the file does not declare
    /// one.
    pub fn project(&self) -> Result<&ProjectTable, PyProjectError> {
        self.project
            .as_ref()
            .ok_or(PyProjectError::MissingTable("project"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_BACKEND: &str = "friendly_dist_manager.hooks:PEP517";

    fn sample_toml() -> String {
        format!(
            r#"
            [build-system]
            requires = ['wheel', 'setuptools']
            build-backend = "{DEFAULT_BACKEND}"

            [project]
            name = "FuBar"
            version = "4.5.6"
            "#
        )
    }

    #[test]
    fn parses_tables() {
        let parsed = PyProject::from_toml_str(&sample_toml()).unwrap();
        let build_system = parsed.build_system().unwrap();
        assert_eq!(DEFAULT_BACKEND, build_system.backend());
        assert_eq!(2, build_system.requires().len());
        assert!(build_system.requires().contains(&"wheel".to_owned()));
        assert!(build_system.requires().contains(&"setuptools".to_owned()));
        let project = parsed.project().unwrap();
        assert_eq!("FuBar", project.name());
        assert_eq!("4.5.6", project.version());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let toml_file = dir.path().join("pyproject.toml");
        std::fs::write(&toml_file, sample_toml()).unwrap();
        let parsed = PyProject::from_file(&toml_file).unwrap();
        assert_eq!("FuBar", parsed.project().unwrap().name());
    }

    #[test]
    fn missing_tables_are_reported() {
        let parsed = PyProject::from_toml_str("").unwrap();
        assert!(matches!(
            parsed.build_system(),
            Err(PyProjectError::MissingTable("build-system"))
        ));
        assert!(matches!(
            parsed.project(),
            Err(PyProjectError::MissingTable("project"))
        ));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let toml_data = r#"
            [project]
            name = "FuBar"
            version = "4.5.6"
            description = "Not interpreted by this parser"

            [tool.something]
            irrelevant = true
        "#;
        let parsed = PyProject::from_toml_str(toml_data).unwrap();
        assert_eq!("FuBar", parsed.project().unwrap().name());
    }

    #[test]
    fn should_fail_on_malformed_toml() {
        assert!(matches!(
            PyProject::from_toml_str("[project"),
            Err(PyProjectError::Toml(_))
        ));
    }

    #[test]
    fn should_fail_on_incomplete_tables() {
        let toml_data = r#"
            [project]
            name = "FuBar"
        "#;
        assert!(matches!(
            PyProject::from_toml_str(toml_data),
            Err(PyProjectError::Toml(_))
        ));
    }

    #[test]
    fn should_fail_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("pyproject.toml");
        assert!(matches!(
            PyProject::from_file(&missing),
            Err(PyProjectError::Read { .. })
        ));
    }
}
