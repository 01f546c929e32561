//! Version identifiers and the release history
//!
//! A [`Version`] is an opaque string identifier (`"2024-03-01"`, `"v2"`,
//! `"1.4.0"`). The order that matters for resolution is not derived from the
//! string itself but from the [`VersionHistory`]: the ordered sequence of all
//! identifiers ever released, oldest first. Constructors validate that the
//! sequence is strictly increasing under the domain ordering (calendar dates
//! for date-stamped histories, semantic versioning for semver histories).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single API version identifier.
///
/// The empty string is the "unversioned" sentinel used by route bags that do
/// not participate in versioning at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Create a version from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The sentinel for routes registered outside any version history.
    pub fn unversioned() -> Self {
        Self(String::new())
    }

    /// Whether this is the unversioned sentinel.
    pub fn is_unversioned(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Error raised while building a [`VersionHistory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// The same identifier appeared twice.
    #[error("duplicate version '{0}' in history")]
    Duplicate(Version),

    /// An entry is not greater than its predecessor.
    #[error("version '{later}' does not come after '{earlier}'")]
    OutOfOrder {
        /// The earlier entry.
        earlier: Version,
        /// The offending entry.
        later: Version,
    },

    /// An entry could not be parsed under the requested ordering.
    #[error("version '{version}' is not a valid {expected}")]
    Unparsable {
        /// The offending entry.
        version: Version,
        /// What the constructor expected ("date", "semantic version").
        expected: &'static str,
    },

    /// The unversioned sentinel is not a valid history entry.
    #[error("the empty version identifier cannot appear in a history")]
    EmptySentinel,
}

/// The ordered, immutable sequence of released versions, oldest first.
///
/// Defines the total order the resolver walks. Position lookup is O(1).
#[derive(Debug, Clone, Default)]
pub struct VersionHistory {
    entries: Vec<Version>,
    positions: HashMap<Version, usize>,
}

impl VersionHistory {
    /// An empty history, for unversioned route bags.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a history of date-stamped identifiers (`YYYY-MM-DD`).
    ///
    /// Entries must parse as calendar dates and be strictly increasing.
    pub fn dated<I, V>(entries: I) -> Result<Self, HistoryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Version>,
    {
        Self::build(entries, |version| {
            NaiveDate::parse_from_str(version.as_str(), "%Y-%m-%d")
                .map_err(|_| HistoryError::Unparsable {
                    version: version.clone(),
                    expected: "date",
                })
        })
    }

    /// Build a history of semantic-version identifiers (`1`, `v1.2`, `2.0.1`).
    ///
    /// Entries must parse as semver triples and be strictly increasing.
    pub fn semver<I, V>(entries: I) -> Result<Self, HistoryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Version>,
    {
        Self::build(entries, |version| {
            version
                .as_str()
                .parse::<SemVer>()
                .map_err(|_| HistoryError::Unparsable {
                    version: version.clone(),
                    expected: "semantic version",
                })
        })
    }

    /// Build a history whose order is exactly the given sequence.
    ///
    /// For identifier schemes the crate knows nothing about. Only duplicates
    /// and the empty sentinel are rejected; the caller vouches for the order.
    pub fn ordered<I, V>(entries: I) -> Result<Self, HistoryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Version>,
    {
        let mut history = Self::default();
        for entry in entries {
            history.push(entry.into())?;
        }
        Ok(history)
    }

    fn build<I, V, K, F>(entries: I, parse: F) -> Result<Self, HistoryError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Version>,
        K: PartialOrd,
        F: Fn(&Version) -> Result<K, HistoryError>,
    {
        let mut history = Self::default();
        let mut previous: Option<(Version, K)> = None;
        for entry in entries {
            let version = entry.into();
            let key = parse(&version)?;
            if let Some((earlier, earlier_key)) = &previous {
                if key <= *earlier_key {
                    return Err(HistoryError::OutOfOrder {
                        earlier: earlier.clone(),
                        later: version,
                    });
                }
            }
            previous = Some((version.clone(), key));
            history.push(version)?;
        }
        Ok(history)
    }

    fn push(&mut self, version: Version) -> Result<(), HistoryError> {
        if version.is_unversioned() {
            return Err(HistoryError::EmptySentinel);
        }
        if self.positions.contains_key(&version) {
            return Err(HistoryError::Duplicate(version));
        }
        self.positions.insert(version.clone(), self.entries.len());
        self.entries.push(version);
        Ok(())
    }

    /// Position of a version in the history, oldest = 0.
    pub fn position(&self, version: &Version) -> Option<usize> {
        self.positions.get(version).copied()
    }

    /// Whether the identifier is a history entry.
    pub fn contains(&self, version: &Version) -> bool {
        self.positions.contains_key(version)
    }

    /// The newest released version.
    pub fn latest(&self) -> Option<&Version> {
        self.entries.last()
    }

    /// The oldest released version.
    pub fn oldest(&self) -> Option<&Version> {
        self.entries.first()
    }

    /// Entry at a given position.
    pub fn get(&self, position: usize) -> Option<&Version> {
        self.entries.get(position)
    }

    /// Number of released versions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.entries.iter()
    }

    /// All entries as a slice, oldest first.
    pub fn as_slice(&self) -> &[Version] {
        &self.entries
    }
}

/// Parsed semantic version used to validate semver histories.
///
/// Accepts `1`, `1.2`, `1.2.3`, each with an optional `v`/`V` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SemVer {
    major: u32,
    minor: u32,
    patch: u32,
}

impl std::str::FromStr for SemVer {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s
            .strip_prefix('v')
            .or_else(|| s.strip_prefix('V'))
            .unwrap_or(s);

        let mut parts = s.split('.');
        let major = parts.next().ok_or(())?.parse().map_err(|_| ())?;
        let minor = match parts.next() {
            Some(p) => p.parse().map_err(|_| ())?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().map_err(|_| ())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(());
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}
