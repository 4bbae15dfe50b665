use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use skillet_fs::{FileSystem, FsError, FsResultExt};
use skillet_skills::store::{AGENTS_DIR, OPTIONAL_DIR, SKILLS_DIR};

use crate::config::{Config, Strategy};

#[derive(Debug, Clone)]
pub struct SetupParams {
    pub global_path: String,
    pub enabled_targets: BTreeSet<String>,
    pub strategy: Strategy,
}

fn create_layout(fs: &dyn FileSystem, root: &Path) -> Result<PathBuf, FsError> {
    let skills = root.join(SKILLS_DIR);
    let optional = skills.join(OPTIONAL_DIR);
    fs.create_dir_all(&optional)
        .fs_context("create directory", &optional)?;
    Ok(skills)
}

/// Create the global store layout and write the config file. An existing
/// config is updated in place; targets not in `enabled_targets` are
/// disabled.
///
/// # Errors
///
/// Returns an error if a directory cannot be created, the existing config
/// cannot be read, no target ends up enabled, or the config cannot be
/// written.
pub fn setup_global(
    fs: &dyn FileSystem,
    config_path: &Path,
    params: &SetupParams,
) -> anyhow::Result<Config> {
    let mut config = Config::load(config_path)?;
    config.global_path.clone_from(&params.global_path);
    config.default_strategy = params.strategy;
    for (name, target) in &mut config.targets {
        target.enabled = params.enabled_targets.contains(name);
    }
    config.validate()?;

    let root = config.global_root(fs)?;
    create_layout(fs, &root)?;
    config
        .save(config_path)
        .context("failed to write config file")?;
    tracing::info!(path = %config_path.display(), "wrote config");
    Ok(config)
}

/// Create `<root>/.agents/skills/optional`. Returns the project skills
/// directory.
///
/// # Errors
///
/// Returns an error if a directory cannot be created.
pub fn setup_project(fs: &dyn FileSystem, project_root: &Path) -> Result<PathBuf, FsError> {
    create_layout(fs, &project_root.join(AGENTS_DIR))
}
