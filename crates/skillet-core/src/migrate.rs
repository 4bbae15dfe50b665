use std::collections::{BTreeMap, BTreeSet};

use skillet_fs::{FsError, FsResultExt};
use skillet_skills::loader::{MAX_SEARCH_DEPTH, is_valid_skill_dir};
use skillet_skills::{Scope, SkillStore, validate_name};

use crate::config::Strategy;
use crate::error::CoreError;
use crate::sync::{SyncEngine, SyncOptions, SyncResult};
use crate::target::TargetRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    Moved,
    /// The store already had the skill; the target copy was deleted.
    Skipped,
    /// Another target's copy was moved earlier in the run; this one was
    /// deleted.
    Removed,
    Error,
}

impl MigrateAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Moved => "moved",
            Self::Skipped => "skipped",
            Self::Removed => "removed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for MigrateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct MoveResult {
    pub skill: String,
    pub from_target: String,
    pub action: MigrateAction,
    pub message: Option<&'static str>,
    pub error: Option<FsError>,
}

#[derive(Debug)]
pub struct MigrateResult {
    /// Target name to the skill names found there.
    pub found: BTreeMap<String, Vec<String>>,
    pub moves: Vec<MoveResult>,
    pub sync: Vec<SyncResult>,
}

impl MigrateResult {
    #[must_use]
    pub fn has_skills_to_migrate(&self) -> bool {
        !self.found.is_empty()
    }
}

/// Absorbs skill directories that were placed directly in target skill
/// directories into the store, then links them back.
#[derive(Debug)]
pub struct Migrator<'a> {
    store: &'a SkillStore,
    registry: &'a TargetRegistry,
    strategy: Strategy,
}

impl<'a> Migrator<'a> {
    #[must_use]
    pub fn new(store: &'a SkillStore, registry: &'a TargetRegistry, strategy: Strategy) -> Self {
        Self {
            store,
            registry,
            strategy,
        }
    }

    /// Real skill directories (not symlinks) in each enabled target's skills
    /// directory for `scope`. Targets with nothing to migrate are omitted.
    #[must_use]
    pub fn find_skills_to_migrate(&self, scope: Scope) -> BTreeMap<String, Vec<String>> {
        let fs = self.store.fs().as_ref();
        let mut found = BTreeMap::new();

        for target in self.registry.enabled() {
            let Ok(dir) = target.skills_path(scope) else {
                continue;
            };
            let Ok(entries) = fs.read_dir(&dir) else {
                continue;
            };
            let mut names: Vec<String> = entries
                .into_iter()
                .filter(|e| e.is_dir && !e.is_symlink)
                .filter(|e| validate_name(&e.name).is_ok())
                .filter(|e| is_valid_skill_dir(fs, &dir.join(&e.name), MAX_SEARCH_DEPTH))
                .map(|e| e.name)
                .collect();
            if names.is_empty() {
                continue;
            }
            names.sort();
            found.insert(target.name().to_owned(), names);
        }
        found
    }

    /// Move the `found` skills into the store's skills directory for
    /// `scope`. Targets are processed in name order, so when several targets
    /// hold the same name the first one's copy is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be resolved or
    /// created. Unregistered targets in `found` are skipped, and per-skill
    /// failures are reported as [`MigrateAction::Error`].
    pub fn move_skills(
        &self,
        scope: Scope,
        found: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<MoveResult>, CoreError> {
        let fs = self.store.fs().as_ref();
        let dest_root = self.store.skills_dir(scope)?;
        fs.create_dir_all(&dest_root)
            .fs_context("create directory", &dest_root)?;

        let mut moved = BTreeSet::new();
        let mut results = Vec::new();
        for (target_name, names) in found {
            let Some(target) = self.registry.get(target_name) else {
                tracing::warn!(target = %target_name, "skipping unregistered target");
                continue;
            };
            let Ok(src_root) = target.skills_path(scope) else {
                continue;
            };

            for name in names {
                let mut result = MoveResult {
                    skill: name.clone(),
                    from_target: target_name.clone(),
                    action: MigrateAction::Error,
                    message: None,
                    error: None,
                };
                if let Err(e) = validate_name(name) {
                    tracing::warn!("skipping {name}: {e}");
                    continue;
                }
                let src = src_root.join(name);
                let dest = dest_root.join(name);

                let (ok, failed, outcome) = if moved.contains(name) {
                    (
                        (MigrateAction::Removed, "removed duplicate"),
                        "failed to remove duplicate",
                        fs.remove_all(&src).fs_context("remove", &src),
                    )
                } else if fs.entry_exists(&dest) {
                    (
                        (MigrateAction::Skipped, "already exists in store"),
                        "failed to remove after skip",
                        fs.remove_all(&src).fs_context("remove", &src),
                    )
                } else {
                    let outcome = fs.rename(&src, &dest).fs_context("move", &src);
                    if outcome.is_ok() {
                        moved.insert(name.clone());
                    }
                    ((MigrateAction::Moved, "moved"), "failed to move", outcome)
                };

                match outcome {
                    Ok(()) => {
                        result.action = ok.0;
                        result.message = Some(ok.1);
                        tracing::info!(skill = %name, target = %target_name, action = %ok.0, "migrated");
                    }
                    Err(e) => {
                        tracing::warn!(skill = %name, target = %target_name, "{failed}: {e}");
                        result.message = Some(failed);
                        result.error = Some(e);
                    }
                }
                results.push(result);
            }
        }
        Ok(results)
    }

    /// Move `found` into the store, then force-sync every scope so each
    /// target links back to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be prepared or the
    /// store cannot be read for the sync.
    pub fn migrate(
        &self,
        scope: Scope,
        found: BTreeMap<String, Vec<String>>,
    ) -> Result<MigrateResult, CoreError> {
        let moves = self.move_skills(scope, &found)?;
        let sync = SyncEngine::new(self.store, self.registry, self.strategy).sync(&SyncOptions {
            force: true,
            ..SyncOptions::default()
        })?;
        Ok(MigrateResult { found, moves, sync })
    }
}
