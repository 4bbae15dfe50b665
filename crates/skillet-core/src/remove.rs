use std::path::PathBuf;

use skillet_skills::{Scope, Skill, SkillStore, validate_name};

use crate::error::CoreError;
use crate::target::{TargetError, TargetRegistry};

#[derive(Debug, Clone)]
pub struct RemoveOptions {
    pub name: String,
    /// Remove from this scope only. Without it the highest-priority skill of
    /// that name is removed.
    pub scope: Option<Scope>,
}

#[derive(Debug)]
pub struct TargetRemoval {
    pub target: String,
    /// The entry that was uninstalled, if the target had one.
    pub removed: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RemoveReport {
    pub skill: Skill,
    pub targets: Vec<TargetRemoval>,
}

impl RemoveReport {
    pub fn uninstalled(&self) -> impl Iterator<Item = &TargetRemoval> {
        self.targets.iter().filter(|t| t.removed.is_some())
    }
}

/// Uninstall a skill from every enabled target, then delete it from the
/// store. The store is only touched once every target is clean.
///
/// # Errors
///
/// Returns an error for an invalid or unknown name, or the first target or
/// store failure. A target failure leaves the canonical directory in place.
pub fn remove_skill(
    store: &SkillStore,
    registry: &TargetRegistry,
    options: &RemoveOptions,
) -> Result<RemoveReport, CoreError> {
    validate_name(&options.name)?;
    let skill = match options.scope {
        Some(scope) => store.find_in_scope(&options.name, scope)?,
        None => store.get_by_name(&options.name)?,
    };

    let mut targets = Vec::new();
    for target in registry.enabled() {
        if !target.scope_enabled(skill.scope) {
            continue;
        }
        let removed = match target.uninstall_from_scope(&skill.name, skill.scope) {
            Ok(path) => Some(path),
            Err(TargetError::NotInstalled(_) | TargetError::ProjectRootNotSet) => None,
            Err(e) => return Err(CoreError::target(target.name(), e)),
        };
        targets.push(TargetRemoval {
            target: target.name().to_owned(),
            removed,
        });
    }

    store.remove(&skill)?;
    Ok(RemoveReport { skill, targets })
}
