use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use skillet_fs::{FileSystem, FsResultExt};

use crate::error::SkillError;
use crate::loader::{MAX_SEARCH_DEPTH, is_valid_skill_dir, load_skill};
use crate::skill::{Category, Scope, Skill, validate_name};

/// Directory marking a scope root, e.g. `<project>/.agents`.
pub const AGENTS_DIR: &str = ".agents";
pub const SKILLS_DIR: &str = "skills";
/// Reserved subdirectory of a skills directory holding optional skills.
pub const OPTIONAL_DIR: &str = "optional";

/// Canonical store of skills across the global and project scopes.
pub struct SkillStore {
    fs: Arc<dyn FileSystem>,
    global_dir: PathBuf,
    project_root: Option<PathBuf>,
    max_depth: usize,
}

impl std::fmt::Debug for SkillStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillStore")
            .field("global_dir", &self.global_dir)
            .field("project_root", &self.project_root)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl SkillStore {
    /// `global_dir` is the global skills directory itself (e.g.
    /// `~/.agents/skills`, already expanded). Project skills live in
    /// `<project_root>/.agents/skills`.
    #[must_use]
    pub fn new(
        fs: Arc<dyn FileSystem>,
        global_dir: impl Into<PathBuf>,
        project_root: Option<PathBuf>,
    ) -> Self {
        Self {
            fs,
            global_dir: global_dir.into(),
            project_root,
            max_depth: MAX_SEARCH_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    #[must_use]
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// # Errors
    ///
    /// Returns [`SkillError::ProjectRootNotSet`] for the project scope when no
    /// project root was given.
    pub fn skills_dir(&self, scope: Scope) -> Result<PathBuf, SkillError> {
        match scope {
            Scope::Global => Ok(self.global_dir.clone()),
            Scope::Project => self
                .project_root
                .as_ref()
                .map(|root| root.join(AGENTS_DIR).join(SKILLS_DIR))
                .ok_or(SkillError::ProjectRootNotSet),
        }
    }

    /// Every skill in both scopes, global first, default before optional
    /// within a scope.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing skills directory cannot be read.
    pub fn get_all(&self) -> Result<Vec<Skill>, SkillError> {
        let mut skills = self.get_by_scope(Scope::Global)?;
        skills.extend(self.get_by_scope(Scope::Project)?);
        Ok(skills)
    }

    /// # Errors
    ///
    /// Returns an error if the scope's skills directory exists but cannot be
    /// read.
    pub fn get_by_scope(&self, scope: Scope) -> Result<Vec<Skill>, SkillError> {
        let root = match self.skills_dir(scope) {
            Ok(root) => root,
            Err(SkillError::ProjectRootNotSet) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut skills = self.load_dir(&root, scope, Category::Default)?;
        let optional = root.join(OPTIONAL_DIR);
        if self.fs.is_dir(&optional) {
            skills.extend(self.load_dir(&optional, scope, Category::Optional)?);
        }
        Ok(skills)
    }

    fn load_dir(
        &self,
        dir: &Path,
        scope: Scope,
        category: Category,
    ) -> Result<Vec<Skill>, SkillError> {
        if !self.fs.exists(dir) {
            return Ok(Vec::new());
        }
        let mut entries = self.fs.read_dir(dir).fs_context("read directory", dir)?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut skills = Vec::new();
        for entry in entries {
            if category == Category::Default && entry.name == OPTIONAL_DIR {
                continue;
            }
            let path = dir.join(&entry.name);
            let is_candidate = entry.is_dir || (entry.is_symlink && self.fs.is_dir(&path));
            if !is_candidate || !is_valid_skill_dir(self.fs.as_ref(), &path, self.max_depth) {
                continue;
            }
            match load_skill(self.fs.as_ref(), &path, scope, category, self.max_depth) {
                Ok(skill) => skills.push(skill),
                Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
            }
        }
        Ok(skills)
    }

    /// The highest-priority skill called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::InvalidName`] for an unsafe name and
    /// [`SkillError::NotFound`] if no scope has the skill.
    pub fn get_by_name(&self, name: &str) -> Result<Skill, SkillError> {
        validate_name(name)?;
        self.get_all()?
            .into_iter()
            .filter(|s| s.name == name)
            .max_by_key(Skill::priority)
            .ok_or_else(|| SkillError::NotFound(name.to_owned()))
    }

    /// One skill per name, the highest-priority one, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if a skills directory cannot be read.
    pub fn get_resolved(&self) -> Result<Vec<Skill>, SkillError> {
        let mut resolved: BTreeMap<String, Skill> = BTreeMap::new();
        for skill in self.get_all()? {
            match resolved.get(&skill.name) {
                Some(existing) if existing.priority() >= skill.priority() => {}
                _ => {
                    resolved.insert(skill.name.clone(), skill);
                }
            }
        }
        Ok(resolved.into_values().collect())
    }

    /// # Errors
    ///
    /// Returns [`SkillError::NotFoundInScope`] if `scope` has no skill called
    /// `name`.
    pub fn find_in_scope(&self, name: &str, scope: Scope) -> Result<Skill, SkillError> {
        validate_name(name)?;
        self.get_by_scope(scope)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| SkillError::NotFoundInScope {
                name: name.to_owned(),
                scope,
            })
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.get_by_name(name).is_ok()
    }

    /// Delete the skill's canonical directory. Targets are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::OutsideStore`] if the skill's path is not inside
    /// one of this store's skills directories, or the removal error.
    pub fn remove(&self, skill: &Skill) -> Result<(), SkillError> {
        if !self.contains(&skill.path) {
            return Err(SkillError::OutsideStore(skill.path.clone()));
        }
        self.fs
            .remove_all(&skill.path)
            .fs_context("remove", &skill.path)?;
        tracing::info!(skill = %skill.name, scope = %skill.scope, "removed from store");
        Ok(())
    }

    fn contains(&self, path: &Path) -> bool {
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return false;
        }
        Scope::ALL
            .into_iter()
            .filter_map(|scope| self.skills_dir(scope).ok())
            .any(|root| path != root && path.starts_with(&root))
    }
}
