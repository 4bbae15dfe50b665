use std::collections::BTreeSet;

use skillet_skills::{Scope, SkillStore};

use crate::error::CoreError;
use crate::target::{TargetError, TargetRegistry};

/// Drift between the resolved skill set and one target.
#[derive(Debug)]
pub struct TargetStatus {
    pub target: String,
    /// Resolved skills present in the target, by name.
    pub installed: Vec<String>,
    /// Resolved skills absent from the target.
    pub missing: Vec<String>,
    /// Entries in the target that match no resolved skill.
    pub extra: Vec<String>,
    pub in_sync: bool,
    /// Set when the target could not be inspected; the lists are then empty.
    pub error: Option<TargetError>,
}

/// Compare every enabled target against the store. Read-only.
///
/// With `scope` set, only that scope's skills and target directories are
/// considered.
///
/// # Errors
///
/// Returns an error only if the store cannot be read; a target that cannot be
/// listed gets a status carrying the error.
pub fn get_status(
    store: &SkillStore,
    registry: &TargetRegistry,
    scope: Option<Scope>,
) -> Result<Vec<TargetStatus>, CoreError> {
    let mut skills = store.get_resolved()?;
    if let Some(scope) = scope {
        skills.retain(|s| s.scope == scope);
    }
    let known: BTreeSet<&str> = skills.iter().map(|s| s.name.as_str()).collect();

    let mut statuses = Vec::new();
    for target in registry.enabled() {
        let listed = match scope {
            Some(scope) => target.list_installed_in_scope(scope),
            None => target.list_installed(),
        };
        let listed = match listed {
            Ok(listed) => listed,
            Err(e) => {
                tracing::warn!(target = %target.name(), "cannot list installed skills: {e}");
                statuses.push(TargetStatus {
                    target: target.name().to_owned(),
                    installed: Vec::new(),
                    missing: Vec::new(),
                    extra: Vec::new(),
                    in_sync: false,
                    error: Some(e),
                });
                continue;
            }
        };

        let (installed, missing): (Vec<_>, Vec<_>) = skills
            .iter()
            .filter(|s| target.scope_enabled(s.scope))
            .partition(|s| target.is_installed_in_scope(&s.name, s.scope));
        let extra: Vec<String> = listed
            .into_iter()
            .filter(|name| !known.contains(name.as_str()))
            .collect();

        statuses.push(TargetStatus {
            target: target.name().to_owned(),
            in_sync: missing.is_empty() && extra.is_empty(),
            installed: installed.into_iter().map(|s| s.name.clone()).collect(),
            missing: missing.into_iter().map(|s| s.name.clone()).collect(),
            extra,
            error: None,
        });
    }
    Ok(statuses)
}
