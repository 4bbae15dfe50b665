mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::{Path, PathBuf};

use anyhow::Context;
use skillet_fs::{FileSystem, FsError, expand_home};
use skillet_skills::store::SKILLS_DIR;
use skillet_skills::validate_name;

use crate::target::builtin_target;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "SKILLET_CONFIG";

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem operation fails.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if no target is enabled or an enabled target
    /// cannot be resolved to concrete paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, target) in &self.targets {
            let invalid = |reason: &str| ConfigError::InvalidTarget {
                name: name.clone(),
                reason: reason.to_owned(),
            };
            if validate_name(name).is_err() {
                return Err(invalid("name must be a plain identifier"));
            }
            if !target.enabled {
                continue;
            }
            if !target.global && !target.project {
                return Err(invalid("both scopes are disabled"));
            }
            if target.global && target.global_path.is_none() && builtin_target(name).is_none() {
                return Err(invalid("custom targets need a global_path"));
            }
            if let Some(dir) = &target.skills_dir
                && validate_name(dir).is_err()
            {
                return Err(invalid("skills_dir must be a single directory name"));
            }
        }
        if !self.targets.values().any(|t| t.enabled) {
            return Err(ConfigError::NoTargetsEnabled);
        }
        Ok(())
    }

    /// Expanded root of the global store.
    ///
    /// # Errors
    ///
    /// Returns an error if `~` cannot be expanded.
    pub fn global_root(&self, fs: &dyn FileSystem) -> Result<PathBuf, FsError> {
        expand_home(fs, &self.global_path)
    }

    /// Expanded global skills directory, `<global_path>/skills`.
    ///
    /// # Errors
    ///
    /// Returns an error if `~` cannot be expanded.
    pub fn global_skills_dir(&self, fs: &dyn FileSystem) -> Result<PathBuf, FsError> {
        Ok(self.global_root(fs)?.join(SKILLS_DIR))
    }

    /// Names of enabled targets, in name order.
    #[must_use]
    pub fn enabled_targets(&self) -> Vec<&str> {
        self.targets
            .iter()
            .filter(|(_, t)| t.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// `~/.config/skillet/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("skillet").join("config.toml"))
}

/// YAML config files next to `path` that [`Config::load`] does not read.
#[must_use]
pub fn ignored_config_files(path: &Path) -> Vec<PathBuf> {
    let Some(dir) = path.parent() else {
        return Vec::new();
    };
    ["config.yaml", "config.yml"]
        .into_iter()
        .map(|name| dir.join(name))
        .filter(|candidate| candidate != path && candidate.is_file())
        .collect()
}

/// Pick the config file: an explicit path, then `SKILLET_CONFIG`, then the
/// default location.
///
/// # Errors
///
/// Returns an error if none is given and the home directory is unknown.
pub fn resolve_config_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV)
        && !path.is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    default_config_path().context("cannot determine home directory for the config file")
}
