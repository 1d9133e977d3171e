// SPDX-FileCopyrightText: The friendly-dist-manager authors
// SPDX-License-Identifier: MPL-2.0

//! Distribution manifests
//!
//! The static record describing one distribution package: identity,
//! requirements and the supported interpreter range. The record is plain
//! data, constructed once and only ever read afterwards.

use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::version::{self, SpecifierSet};

/// An invalid manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A required field was empty.
    #[error("missing value for '{0}'")]
    MissingValue(&'static str),

    /// A dependency sequence listed the same entry twice.
    #[error("duplicate entry '{entry}' in {field}")]
    DuplicateDependency {
        /// The offending sequence.
        field: &'static str,

        /// The repeated entry.
        entry: String,
    },

    /// The supported interpreter range did not parse.
    #[error("unparsable interpreter range")]
    InterpreterRange(#[from] version::ParseError),
}

/// The manifest of a distribution package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistManifest {
    /// Name of the distribution, conventionally matching its import name.
    pub name: String,

    /// Location of the source repository.
    pub repo: String,

    /// Runtime dependency identifiers, in declaration order.
    pub dependencies: Vec<String>,

    /// Development-only dependency identifiers, in declaration order.
    pub dev_dependencies: Vec<String>,

    /// Short human readable summary.
    pub description: String,

    /// Space separated search terms.
    pub keywords: String,

    /// Range of interpreter versions the distribution supports.
    pub supported_python_version: String,
}

impl DistManifest {
    /// Parse the supported interpreter range.
    ///
    /// # Errors
    ///
    /// Returns a [`version::ParseError`] if the declared range does not
    /// match the range grammar.
    pub fn python_requirement(&self) -> Result<SpecifierSet, version::ParseError> {
        self.supported_python_version.parse()
    }

    /// Iterate over the individual search terms.
    pub fn keyword_terms(&self) -> impl Iterator<Item = &str> {
        self.keywords.split_whitespace()
    }

    /// Check the record for completeness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a [`ManifestError`] for the first empty field, duplicated
    /// dependency entry or unparsable interpreter range.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let required = [
            ("name", &self.name),
            ("repo", &self.repo),
            ("description", &self.description),
            ("keywords", &self.keywords),
            ("supported_python_version", &self.supported_python_version),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ManifestError::MissingValue(field));
            }
        }
        if self.dependencies.is_empty() {
            return Err(ManifestError::MissingValue("dependencies"));
        }
        if self.dev_dependencies.is_empty() {
            return Err(ManifestError::MissingValue("dev_dependencies"));
        }
        for (field, entries) in [
            ("dependencies", &self.dependencies),
            ("dev_dependencies", &self.dev_dependencies),
        ] {
            if let Some(entry) = first_duplicate(entries) {
                return Err(ManifestError::DuplicateDependency {
                    field,
                    entry: entry.to_owned(),
                });
            }
        }
        self.python_requirement()?;
        Ok(())
    }
}

fn first_duplicate(entries: &[String]) -> Option<&str> {
    entries
        .iter()
        .enumerate()
        .find(|(index, entry)| entries[..*index].contains(entry))
        .map(|(_, entry)| entry.as_str())
}

static BUNDLED: OnceCell<DistManifest> = OnceCell::new();

/// The manifest of the `friendly_dist_manager` distribution itself.
#[must_use]
pub fn bundled() -> &'static DistManifest {
    BUNDLED.get_or_init(|| DistManifest {
        name: "friendly_dist_manager".to_owned(),
        repo: "https://github.com/TheFriendlyCoder/friendly_dist_manager".to_owned(),
        dependencies: vec!["toml".to_owned()],
        dev_dependencies: vec![
            "pytest".to_owned(),
            "pytest-cov".to_owned(),
            // coverage 5.x changed the on-disk data format that pytest-cov
            // merges, so stay below it
            "coverage<5.0".to_owned(),
            "pylint".to_owned(),
            "sphinx".to_owned(),
            "tox".to_owned(),
            "twine".to_owned(),
            "wheel".to_owned(),
        ],
        description: "User friendly Python distribution package manager".to_owned(),
        keywords: "python packaging distribution wheel builder".to_owned(),
        supported_python_version: ">=3.5, <4".to_owned(),
    })
}
