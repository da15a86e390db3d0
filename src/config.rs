// src/config.rs

//! Deployment profiles
//!
//! A profile is a TOML file describing one deployment: the local working
//! tree, the target, exclude patterns and permission rules.
//!
//! ```toml
//! exclude = ["*.md", "tests/*"]
//!
//! [profile]
//! name = "production"
//! source = "."
//!
//! [target]
//! type = "local"
//! root = "/srv/www"
//! public_mode = "0755"
//! private_mode = "0700"
//!
//! [[permission]]
//! pattern = "logs/*"
//! mode = "0700-0600"
//! ```
//!
//! Relative paths in a profile file are resolved against the directory
//! holding the file.

use crate::changeset::ChangeSetBuilder;
use crate::layout::{StagingLayout, PUSH_DIR, REVERT_DIR, REV_FILE, TMP_DIR};
use crate::permission::{parse_octal_mode, PermissionRule, PermissionRules};
use crate::target::{LocalTarget, DEFAULT_PRIVATE_MODE, DEFAULT_PUBLIC_MODE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading a profile
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read profile: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse profile: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Profile name must not be empty")]
    EmptyName,

    #[error("Invalid {field} pattern '{pattern}': {message}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        message: String,
    },

    #[error("Invalid {field} '{value}': expected four octal digits such as 0755")]
    InvalidMode { field: &'static str, value: String },

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err.to_string())
    }
}

/// A deployment profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "profile")]
    pub config: ProfileConfig,

    pub target: TargetConfig,

    /// Glob patterns of paths never deployed
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Permission rules, first match wins
    #[serde(default, rename = "permission")]
    pub permissions: Vec<PermissionConfig>,

    /// Names of the temporary root and revision marker on the target
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// `[profile]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,

    /// Local working tree the change paths refer to
    #[serde(default = "default_source")]
    pub source: PathBuf,
}

fn default_source() -> PathBuf {
    PathBuf::from(".")
}

/// Kind of target adapter
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Local,
}

/// `[target]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(rename = "type", default)]
    pub kind: TargetKind,

    pub root: PathBuf,

    #[serde(default)]
    pub public_mode: Option<String>,

    #[serde(default)]
    pub private_mode: Option<String>,
}

/// `[[permission]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionConfig {
    pub pattern: String,
    pub mode: String,
}

/// `[layout]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutConfig {
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,
    #[serde(default = "default_push_dir")]
    pub push_dir: String,
    #[serde(default = "default_revert_dir")]
    pub revert_dir: String,
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tmp_dir: default_tmp_dir(),
            push_dir: default_push_dir(),
            revert_dir: default_revert_dir(),
            marker: default_marker(),
        }
    }
}

fn default_tmp_dir() -> String {
    TMP_DIR.to_string()
}

fn default_push_dir() -> String {
    PUSH_DIR.to_string()
}

fn default_revert_dir() -> String {
    REVERT_DIR.to_string()
}

fn default_marker() -> String {
    REV_FILE.to_string()
}

impl Profile {
    /// Validate the profile
    pub fn validate(&self) -> ConfigResult<()> {
        if self.config.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }

        for pattern in &self.exclude {
            check_pattern("exclude", pattern)?;
        }
        for rule in &self.permissions {
            check_pattern("permission", &rule.pattern)?;
        }

        check_mode("public_mode", self.target.public_mode.as_deref())?;
        check_mode("private_mode", self.target.private_mode.as_deref())?;

        let layout = &self.layout;
        for (field, value) in [
            ("tmp_dir", &layout.tmp_dir),
            ("push_dir", &layout.push_dir),
            ("revert_dir", &layout.revert_dir),
            ("marker", &layout.marker),
        ] {
            if crate::path::normalize(value).is_err() {
                return Err(ConfigError::InvalidLayout(format!(
                    "{} '{}' is not a valid relative path",
                    field, value
                )));
            }
        }
        if layout.push_dir == layout.revert_dir {
            return Err(ConfigError::InvalidLayout(
                "push_dir and revert_dir must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve relative source and root paths against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.config.source.is_relative() {
            self.config.source = base.join(&self.config.source);
        }
        if self.target.root.is_relative() {
            self.target.root = base.join(&self.target.root);
        }
    }

    /// Exclude filter for this profile
    pub fn change_set_builder(&self) -> crate::Result<ChangeSetBuilder> {
        ChangeSetBuilder::new(&self.exclude)
    }

    /// Permission rules for this profile
    pub fn permission_rules(&self) -> crate::Result<PermissionRules> {
        let rules = self
            .permissions
            .iter()
            .map(|rule| PermissionRule::new(&rule.pattern, rule.mode.clone()))
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(PermissionRules::new(rules))
    }

    /// Staging layout for this profile
    pub fn staging_layout(&self) -> StagingLayout {
        StagingLayout::new(
            &self.layout.tmp_dir,
            &self.layout.push_dir,
            &self.layout.revert_dir,
            &self.layout.marker,
        )
    }

    /// Open the configured target
    pub fn open_target(&self) -> crate::Result<LocalTarget> {
        match self.target.kind {
            TargetKind::Local => {
                let public = mode_or(self.target.public_mode.as_deref(), DEFAULT_PUBLIC_MODE);
                let private = mode_or(self.target.private_mode.as_deref(), DEFAULT_PRIVATE_MODE);
                Ok(LocalTarget::new(&self.target.root)?.with_modes(public, private))
            }
        }
    }
}

fn check_pattern(field: &'static str, pattern: &str) -> ConfigResult<()> {
    glob::Pattern::new(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidPattern {
            field,
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn check_mode(field: &'static str, value: Option<&str>) -> ConfigResult<()> {
    match value {
        Some(mode) if parse_octal_mode(mode).is_none() => Err(ConfigError::InvalidMode {
            field,
            value: mode.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Parsed mode, or the default when unset (values are validated already)
fn mode_or(value: Option<&str>, default: u32) -> u32 {
    value.and_then(parse_octal_mode).unwrap_or(default)
}

/// Parse a profile from a TOML file
pub fn parse_profile_file(path: &Path) -> ConfigResult<Profile> {
    let content = std::fs::read_to_string(path)?;
    let mut profile = parse_profile_string(&content)?;
    if let Some(base) = path.parent() {
        profile.resolve_paths(base);
    }
    Ok(profile)
}

/// Parse a profile from a TOML string
pub fn parse_profile_string(content: &str) -> ConfigResult<Profile> {
    let profile: Profile = toml::from_str(content)?;
    profile.validate()?;
    Ok(profile)
}
