use skillet_skills::{Scope, Skill, SkillStore};

use crate::config::Strategy;
use crate::error::CoreError;
use crate::target::{InstallMethod, InstallOptions, Target, TargetError, TargetRegistry};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Report what would happen without touching the filesystem.
    pub dry_run: bool,
    /// Reinstall skills that are already present.
    pub force: bool,
    /// Only sync skills from this scope.
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Install,
    Update,
    Skip,
    Error,
}

impl SyncAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Skip => "skip",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct SyncResult {
    pub skill: String,
    pub scope: Scope,
    pub target: String,
    pub action: SyncAction,
    /// Set when an install actually ran.
    pub method: Option<InstallMethod>,
    pub error: Option<TargetError>,
}

/// Projects the store's resolved skills into every enabled target. Never
/// uninstalls anything.
#[derive(Debug)]
pub struct SyncEngine<'a> {
    store: &'a SkillStore,
    registry: &'a TargetRegistry,
    strategy: Strategy,
}

impl<'a> SyncEngine<'a> {
    #[must_use]
    pub fn new(store: &'a SkillStore, registry: &'a TargetRegistry, strategy: Strategy) -> Self {
        Self {
            store,
            registry,
            strategy,
        }
    }

    /// One result per (enabled target, resolved skill) pair, targets and
    /// skills in name order. Pairs whose scope the target does not use are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be read; install failures
    /// are reported as [`SyncAction::Error`] results.
    pub fn sync(&self, options: &SyncOptions) -> Result<Vec<SyncResult>, CoreError> {
        let mut skills = self.store.get_resolved()?;
        if let Some(scope) = options.scope {
            skills.retain(|s| s.scope == scope);
        }

        let mut results = Vec::new();
        for target in self.registry.enabled() {
            for skill in &skills {
                if !target.scope_enabled(skill.scope) {
                    continue;
                }
                results.push(self.sync_skill(target, skill, options));
            }
        }
        Ok(results)
    }

    fn sync_skill(&self, target: &Target, skill: &Skill, options: &SyncOptions) -> SyncResult {
        let installed = target.is_installed_in_scope(&skill.name, skill.scope);
        let mut result = SyncResult {
            skill: skill.name.clone(),
            scope: skill.scope,
            target: target.name().to_owned(),
            action: SyncAction::Skip,
            method: None,
            error: None,
        };

        if installed && !options.force {
            return result;
        }
        result.action = if installed {
            SyncAction::Update
        } else {
            SyncAction::Install
        };
        if options.dry_run {
            return result;
        }

        let install = InstallOptions {
            strategy: Some(self.strategy),
            force: options.force || installed,
        };
        match target.install(skill, install) {
            Ok(method) => result.method = Some(method),
            Err(e) => {
                tracing::warn!(skill = %skill.name, target = %target.name(), "install failed: {e}");
                result.action = SyncAction::Error;
                result.error = Some(e);
            }
        }
        result
    }
}

/// Per-action counts over a batch of results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub installed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl SyncSummary {
    #[must_use]
    pub fn from_results(results: &[SyncResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.action {
                SyncAction::Install => summary.installed += 1,
                SyncAction::Update => summary.updated += 1,
                SyncAction::Skip => summary.skipped += 1,
                SyncAction::Error => summary.errors += 1,
            }
        }
        summary
    }
}
