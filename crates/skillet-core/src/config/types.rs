use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::target::BUILTIN_TARGETS;

pub const CONFIG_VERSION: u32 = 1;

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_global_path() -> String {
    "~/.agents".into()
}

fn default_true() -> bool {
    true
}

fn default_targets() -> BTreeMap<String, TargetConfig> {
    BUILTIN_TARGETS
        .iter()
        .map(|builtin| (builtin.name.to_owned(), TargetConfig::default()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Root of the global store; skills live in `<global_path>/skills`.
    #[serde(default = "default_global_path")]
    pub global_path: String,
    #[serde(default)]
    pub default_strategy: Strategy,
    #[serde(default = "default_targets")]
    pub targets: BTreeMap<String, TargetConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            global_path: default_global_path(),
            default_strategy: Strategy::default(),
            targets: default_targets(),
        }
    }
}

/// How a skill is projected into a target directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Symlink,
    Copy,
}

impl Strategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Symlink => "symlink",
            Self::Copy => "copy",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symlink" => Ok(Self::Symlink),
            "copy" => Ok(Self::Copy),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides the target's global root, e.g. `~/.claude`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_path: Option<String>,
    /// Overrides the project-relative root, e.g. `.claude`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_dir: Option<String>,
    #[serde(default = "default_true")]
    pub global: bool,
    #[serde(default = "default_true")]
    pub project: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global_path: None,
            project_path: None,
            skills_dir: None,
            global: true,
            project: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no targets are enabled")]
    NoTargetsEnabled,

    #[error("invalid target {name:?}: {reason}")]
    InvalidTarget { name: String, reason: String },
}
