// SPDX-FileCopyrightText: The friendly-dist-manager authors
// SPDX-License-Identifier: MPL-2.0

//! Automation environment matrix
//!
//! Environments are named by crossing one declared prefix with a set of
//! factors, e.g. `py3` × {`lint`, `test`, `docs`} yields `py3-lint`,
//! `py3-test` and `py3-docs`. Every command line in the matrix is gated by
//! the factor it belongs to: an external orchestrator runs a command for an
//! environment iff the command's factor is active for that environment.
//!
//! The matrix is declarative only. Installing requirements, applying the
//! environment overrides and executing commands (stopping at the first
//! non-zero exit status) is the orchestrator's job, not this crate's.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use once_cell::sync::OnceCell;
use thiserror::Error;

/// An invalid matrix or an unresolvable environment name.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// A factor name outside the known factor set.
    #[error("unknown factor '{0}'")]
    UnknownFactor(String),

    /// An environment name that is not `<prefix>-<factor>`.
    #[error("malformed environment name '{0}'")]
    MalformedEnvName(String),

    /// An environment name whose prefix or factor the matrix does not declare.
    #[error("environment '{0}' is not part of the matrix")]
    UndeclaredEnvironment(String),

    /// The declared prefix was empty or contained whitespace.
    #[error("invalid environment prefix '{0}'")]
    InvalidPrefix(String),

    /// The matrix declared no factors.
    #[error("no factors declared")]
    NoFactors,

    /// The same factor was declared twice.
    #[error("factor '{0}' declared twice")]
    DuplicateFactor(Factor),

    /// A command gated by a factor the matrix does not declare.
    #[error("command '{line}' is gated by undeclared factor '{factor}'")]
    UndeclaredCommandFactor {
        /// The undeclared factor.
        factor: Factor,

        /// The offending command line.
        line: String,
    },
}

/// A tag gating which commands run in a given environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Factor {
    /// Static analysis.
    Lint,

    /// Unit test execution.
    Test,

    /// Documentation generation.
    Docs,
}

impl Factor {
    /// Return the textual form of the factor.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lint => "lint",
            Self::Test => "test",
            Self::Docs => "docs",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Factor {
    type Err = MatrixError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "lint" => Ok(Self::Lint),
            "test" => Ok(Self::Test),
            "docs" => Ok(Self::Docs),
            unknown => Err(MatrixError::UnknownFactor(unknown.to_owned())),
        }
    }
}

/// An environment name, composed of a prefix and a factor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvName {
    /// The shared prefix.
    pub prefix: String,

    /// The factor active in this environment.
    pub factor: Factor,
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.factor)
    }
}

impl FromStr for EnvName {
    type Err = MatrixError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        // The factor follows the last separator, the prefix itself may
        // contain dashes.
        let Some((prefix, factor)) = input.rsplit_once('-') else {
            return Err(MatrixError::MalformedEnvName(input.to_owned()));
        };
        if prefix.is_empty() {
            return Err(MatrixError::MalformedEnvName(input.to_owned()));
        }
        Ok(Self {
            prefix: prefix.to_owned(),
            factor: factor.parse()?,
        })
    }
}

/// A command line gated by the factor it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorCommand {
    /// The gating factor.
    pub factor: Factor,

    /// The shell command line.
    pub line: String,
}

impl FactorCommand {
    fn new(factor: Factor, line: &str) -> Self {
        Self {
            factor,
            line: line.to_owned(),
        }
    }
}

/// A resolved environment: the per-environment view of the matrix.
#[derive(Debug)]
pub struct Environment<'a> {
    /// The environment name.
    pub name: EnvName,

    /// Directory the orchestrator isolates this environment in.
    pub isolation_dir: PathBuf,

    /// Requirements file the environment installs its dependencies from.
    pub requirements_source: &'a Path,

    /// Environment variable overrides applied before running commands.
    pub env_overrides: &'a BTreeMap<String, String>,

    /// The active command lines, in declaration order.
    pub commands: Vec<&'a str>,
}

/// The environment matrix declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvMatrix {
    /// Prefix shared by all environment names.
    pub prefix: String,

    /// The declared factor set, in declaration order.
    pub factors: Vec<Factor>,

    /// Root directory for per-environment isolation directories.
    pub isolation_root: PathBuf,

    /// Requirements file all environments install from.
    pub requirements_source: PathBuf,

    /// Environment variable overrides shared by all environments.
    pub env_overrides: BTreeMap<String, String>,

    /// All command lines, each gated by a factor.
    pub commands: Vec<FactorCommand>,
}

impl EnvMatrix {
    /// Enumerate the environment names: the cross-product of the prefix and
    /// the declared factors, in declaration order.
    #[must_use]
    pub fn env_names(&self) -> Vec<EnvName> {
        self.factors
            .iter()
            .map(|&factor| EnvName {
                prefix: self.prefix.clone(),
                factor,
            })
            .collect()
    }

    /// Iterate over the command lines gated by the given factor.
    pub fn commands_for(&self, factor: Factor) -> impl Iterator<Item = &str> {
        self.commands
            .iter()
            .filter(move |command| command.factor == factor)
            .map(|command| command.line.as_str())
    }

    /// Resolve a declared environment by name.
    ///
    /// # Errors
    ///
    /// Returns a [`MatrixError`] if the name's prefix or factor is not part
    /// of the matrix.
    pub fn environment(&self, name: &EnvName) -> Result<Environment<'_>, MatrixError> {
        if name.prefix != self.prefix || !self.factors.contains(&name.factor) {
            return Err(MatrixError::UndeclaredEnvironment(name.to_string()));
        }
        Ok(Environment {
            name: name.clone(),
            isolation_dir: self.isolation_root.join(name.to_string()),
            requirements_source: &self.requirements_source,
            env_overrides: &self.env_overrides,
            commands: self.commands_for(name.factor).collect(),
        })
    }

    /// Parse an environment name and resolve it.
    ///
    /// # Errors
    ///
    /// Returns a [`MatrixError`] if the name is malformed or not declared.
    pub fn resolve(&self, name: &str) -> Result<Environment<'_>, MatrixError> {
        self.environment(&name.parse()?)
    }

    /// Check the declaration for consistency.
    ///
    /// # Errors
    ///
    /// Returns a [`MatrixError`] for an unusable prefix, an empty or
    /// duplicated factor set, or a command gated by an undeclared factor.
    pub fn validate(&self) -> Result<(), MatrixError> {
        if self.prefix.is_empty() || self.prefix.contains(char::is_whitespace) {
            return Err(MatrixError::InvalidPrefix(self.prefix.clone()));
        }
        if self.factors.is_empty() {
            return Err(MatrixError::NoFactors);
        }
        for (index, &factor) in self.factors.iter().enumerate() {
            if self.factors[..index].contains(&factor) {
                return Err(MatrixError::DuplicateFactor(factor));
            }
        }
        for command in &self.commands {
            if !self.factors.contains(&command.factor) {
                return Err(MatrixError::UndeclaredCommandFactor {
                    factor: command.factor,
                    line: command.line.clone(),
                });
            }
        }
        Ok(())
    }
}

static BUNDLED: OnceCell<EnvMatrix> = OnceCell::new();

/// The automation matrix of the `friendly_dist_manager` project itself.
#[must_use]
pub fn bundled() -> &'static EnvMatrix {
    BUNDLED.get_or_init(|| EnvMatrix {
        prefix: "py3".to_owned(),
        factors: vec![Factor::Lint, Factor::Test, Factor::Docs],
        isolation_root: PathBuf::from(".tox"),
        requirements_source: PathBuf::from("requirements.txt"),
        env_overrides: BTreeMap::from([(
            "TFC_LOG_FILE".to_owned(),
            ".tox/logs/tests.log".to_owned(),
        )]),
        commands: vec![
            FactorCommand::new(Factor::Lint, "pylint setup.py src/friendly_dist_manager"),
            FactorCommand::new(Factor::Test, "pytest tests -v --cov=friendly_dist_manager"),
            FactorCommand::new(Factor::Docs, "sphinx-build -b html docs docs/_build"),
        ],
    })
}
