// SPDX-FileCopyrightText: The friendly-dist-manager authors
// SPDX-License-Identifier: MPL-2.0

//! Interpreter versions and version ranges
//!
//! A version is a sequence of dot separated, numeric release segments like
//! `3`, `3.5` or `1.2.3`. A range is a comma separated list of comparators,
//! e.g. `>=3.5, <4` for "3.5 inclusive through below 4". Missing trailing
//! segments compare as zero, so `3.5` and `3.5.0` denote the same release.

use std::{cmp::Ordering, fmt, str::FromStr};

use once_cell::sync::OnceCell;
use regex::Regex;
use thiserror::Error;

/// An error from parsing a version or a version range.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input contained no expression at all.
    #[error("empty version expression")]
    Empty,

    /// A version did not match the release segment grammar.
    #[error("malformed version '{0}'")]
    MalformedVersion(String),

    /// A comparator was missing its operator or its version.
    #[error("malformed specifier '{0}'")]
    MalformedSpecifier(String),
}

const VERSION_REGEX_STR: &str = r"^[0-9]+(\.[0-9]+)*$";

static VERSION_REGEX: OnceCell<Regex> = OnceCell::new();

fn version_regex() -> &'static Regex {
    VERSION_REGEX.get_or_init(|| Regex::new(VERSION_REGEX_STR).unwrap())
}

/// Check if the given input matches the release segment grammar.
#[must_use]
pub fn is_valid(version: &str) -> bool {
    version_regex().is_match(version)
}

/// A release version.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    segments: Vec<u64>,
}

impl Version {
    /// Create a version from its release segments.
    ///
    /// The segments must not be empty.
    #[must_use]
    pub fn new(segments: Vec<u64>) -> Self {
        debug_assert!(!segments.is_empty());
        Self { segments }
    }

    /// Return the release segments.
    #[must_use]
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }
}

fn cmp_segments(lhs: &[u64], rhs: &[u64]) -> Ordering {
    let padded_len = lhs.len().max(rhs.len());
    for index in 0..padded_len {
        let left = lhs.get(index).copied().unwrap_or_default();
        let right = rhs.get(index).copied().unwrap_or_default();
        match left.cmp(&right) {
            Ordering::Equal => (),
            not_equal => return not_equal,
        }
    }
    Ordering::Equal
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        cmp_segments(&self.segments, &other.segments) == Ordering::Equal
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_segments(&self.segments, &other.segments)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments = itertools::join(self.segments.iter(), ".");
        f.write_str(&segments)
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::Empty);
        }
        if !is_valid(input) {
            return Err(ParseError::MalformedVersion(input.to_owned()));
        }
        let segments = input
            .split('.')
            .map(str::parse)
            .collect::<Result<Vec<u64>, _>>()
            .map_err(|_| ParseError::MalformedVersion(input.to_owned()))?;
        Ok(Self::new(segments))
    }
}

/// A comparison operator in a version range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

impl Operator {
    /// Return the textual form of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single comparator, i.e. an operator applied to a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    /// The operator.
    pub operator: Operator,

    /// The boundary version.
    pub version: Version,
}

impl Specifier {
    /// Check whether the given version satisfies this comparator.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self.operator {
            Operator::Less => version < &self.version,
            Operator::LessEqual => version <= &self.version,
            Operator::Greater => version > &self.version,
            Operator::GreaterEqual => version >= &self.version,
            Operator::Equal => version == &self.version,
            Operator::NotEqual => version != &self.version,
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

impl FromStr for Specifier {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::Empty);
        }
        // Two-character operators must be tried first, `<` is a prefix of `<=`.
        let operators = [
            ("<=", Operator::LessEqual),
            (">=", Operator::GreaterEqual),
            ("==", Operator::Equal),
            ("!=", Operator::NotEqual),
            ("<", Operator::Less),
            (">", Operator::Greater),
        ];
        for (prefix, operator) in operators {
            if let Some(rest) = input.strip_prefix(prefix) {
                let version = rest
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::MalformedSpecifier(input.to_owned()))?;
                return Ok(Self { operator, version });
            }
        }
        Err(ParseError::MalformedSpecifier(input.to_owned()))
    }
}

/// A version range: the conjunction of comma separated comparators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierSet {
    specifiers: Vec<Specifier>,
}

impl SpecifierSet {
    /// Create a range from its comparators.
    #[must_use]
    pub const fn new(specifiers: Vec<Specifier>) -> Self {
        Self { specifiers }
    }

    /// Return the comparators in declaration order.
    #[must_use]
    pub fn specifiers(&self) -> &[Specifier] {
        &self.specifiers
    }

    /// Check whether the given version satisfies every comparator.
    #[must_use]
    pub fn contains(&self, version: &Version) -> bool {
        self.specifiers
            .iter()
            .all(|specifier| specifier.matches(version))
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let specifiers = itertools::join(self.specifiers.iter(), ", ");
        f.write_str(&specifiers)
    }
}

impl FromStr for SpecifierSet {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        let specifiers = input
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<Specifier>, _>>()?;
        Ok(Self::new(specifiers))
    }
}
