// src/change.rs

//! Change model
//!
//! A `Change` is one path reported by source control as added, modified or
//! deleted. Changes arrive from an external discovery step as `RawChange`s,
//! whose kind is still free text; the change set builder turns the
//! recognizable ones into `Change`s.
//!
//! A `Revision` identifies what was deployed. It is opaque: the only
//! structure it has is a canonical single-line string, compared
//! lexicographically.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of change reported for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Single-letter code as used by `--name-status` style listings
    pub fn letter(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "added" => Ok(Self::Added),
            "m" | "modified" => Ok(Self::Modified),
            "d" | "deleted" => Ok(Self::Deleted),
            _ => Err(s.to_string()),
        }
    }
}

/// A single changed path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    kind: ChangeKind,
    path: String,
}

impl Change {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn added(path: impl Into<String>) -> Self {
        Self::new(ChangeKind::Added, path)
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self::new(ChangeKind::Modified, path)
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self::new(ChangeKind::Deleted, path)
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Path relative to the root of both the working tree and the target
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path)
    }
}

/// A change as handed over by change discovery, before validation
///
/// The kind is kept as text so that kinds this tool does not deploy
/// (renames, type changes, ...) can be reported and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    pub kind: String,
    pub path: String,
}

impl RawChange {
    pub fn new(kind: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            path: path.into(),
        }
    }

    /// Parse the kind, if it is one of the deployable kinds
    pub fn change_kind(&self) -> Option<ChangeKind> {
        self.kind.parse().ok()
    }
}

impl From<&Change> for RawChange {
    fn from(change: &Change) -> Self {
        Self {
            kind: change.kind.letter().to_string(),
            path: change.path.clone(),
        }
    }
}

/// Parse a `--name-status` style change listing
///
/// Each non-empty line is `<status><TAB><path>`. Rename and copy lines
/// (`R100<TAB>old<TAB>new`) keep their status so the builder can reject
/// them; their first path is used. Blank lines are ignored.
pub fn parse_name_status(text: &str) -> Result<Vec<RawChange>> {
    let mut changes = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let status = fields.next().unwrap_or_default().trim();
        let path = fields.next().map(str::trim).unwrap_or_default();

        if status.is_empty() || path.is_empty() {
            return Err(Error::InvalidChangeList {
                line: index + 1,
                message: format!("expected '<status>\\t<path>', got '{}'", line),
            });
        }

        changes.push(RawChange::new(status, path));
    }

    Ok(changes)
}

/// Deployed revision marker
///
/// Canonical form is a single trimmed line. Ordering is plain string
/// ordering of the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(String);

impl Revision {
    /// Parse a revision from exactly one line of text
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(Error::InvalidRevision("empty revision".to_string()));
        }
        if trimmed.contains(['\n', '\r']) {
            return Err(Error::InvalidRevision(format!(
                "revision must be a single line: {:?}",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Canonical string encoding, as stored in the marker file
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Revision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Revision::parse(s)
    }
}
