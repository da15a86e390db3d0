// src/permission.rs

//! Permission rules
//!
//! Rules map glob patterns to permission specs and are checked in order;
//! the first matching pattern wins. A spec is either a single permission
//! for every entry or `<dir>-<file>`, e.g. `0700-0600`.
//!
//! A permission is `public`, `private` or, on targets with the numeric
//! visibility model, a four-digit octal mode. Specs are validated against
//! the target when they are resolved, not when rules are loaded, so one
//! bad rule only affects the paths it matches.

use crate::error::{Error, Result};
use crate::target::{Permission, Visibility, VisibilityModel};
use glob::Pattern;

/// A single glob → spec rule
#[derive(Debug, Clone)]
pub struct PermissionRule {
    pattern: Pattern,
    spec: String,
}

impl PermissionRule {
    pub fn new(pattern: &str, spec: impl Into<String>) -> Result<Self> {
        let pattern = Pattern::new(pattern).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            pattern,
            spec: spec.into(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

/// Outcome of resolving the permission for one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No rule matched
    Unmatched,
    /// A rule matched and its spec is valid for the target
    Resolved {
        pattern: String,
        permission: Permission,
    },
    /// A rule matched but its spec cannot be applied to the target
    Invalid { pattern: String, spec: String },
}

/// Ordered permission rules
#[derive(Debug, Clone, Default)]
pub struct PermissionRules {
    rules: Vec<PermissionRule>,
}

impl PermissionRules {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self { rules }
    }

    /// Build rules from `(pattern, spec)` pairs
    pub fn from_pairs<I, P, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<str>,
        S: Into<String>,
    {
        let rules = pairs
            .into_iter()
            .map(|(pattern, spec)| PermissionRule::new(pattern.as_ref(), spec))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// First rule whose pattern matches the path
    pub fn matching(&self, path: &str) -> Option<&PermissionRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    /// Resolve the permission for a path on a target with the given model
    pub fn resolve(&self, path: &str, is_dir: bool, model: VisibilityModel) -> Resolution {
        let Some(rule) = self.matching(path) else {
            return Resolution::Unmatched;
        };

        let spec = resolve_spec(rule.spec(), is_dir);
        match parse_permission(spec, model) {
            Some(permission) => Resolution::Resolved {
                pattern: rule.pattern().to_string(),
                permission,
            },
            None => Resolution::Invalid {
                pattern: rule.pattern().to_string(),
                spec: spec.to_string(),
            },
        }
    }
}

/// Pick the directory or file half of a spec
///
/// `a-b` (exactly two tokens) yields `a` for directories and `b` for files.
/// Anything else applies to both as-is.
pub fn resolve_spec(spec: &str, is_dir: bool) -> &str {
    let tokens: Vec<&str> = spec.split('-').collect();
    match tokens.as_slice() {
        [dir, file] => {
            if is_dir {
                dir.trim()
            } else {
                file.trim()
            }
        }
        _ => spec.trim(),
    }
}

/// Parse a single permission for a target
///
/// Returns `None` if the permission is not valid for the model.
pub fn parse_permission(spec: &str, model: VisibilityModel) -> Option<Permission> {
    match spec {
        "public" => return Some(Permission::Visibility(Visibility::Public)),
        "private" => return Some(Permission::Visibility(Visibility::Private)),
        _ => {}
    }

    match model {
        VisibilityModel::Binary => None,
        VisibilityModel::Numeric => parse_octal_mode(spec).map(Permission::Mode),
    }
}

/// Parse a four-digit octal mode such as `0644`
pub fn parse_octal_mode(spec: &str) -> Option<u32> {
    if spec.len() != 4 || !spec.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        return None;
    }
    u32::from_str_radix(spec, 8).ok()
}
