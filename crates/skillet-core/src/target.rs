use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use skillet_fs::{FileSystem, FsError, FsResultExt, expand_home};
use skillet_skills::{Scope, Skill, validate_name};

use crate::config::{Config, ConfigError, Strategy};

pub const DEFAULT_SKILLS_DIR: &str = "skills";

/// A consumer application known without any configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTarget {
    pub name: &'static str,
    pub global_root: &'static str,
    pub project_root: &'static str,
}

pub const BUILTIN_TARGETS: &[BuiltinTarget] = &[
    BuiltinTarget {
        name: "claude",
        global_root: "~/.claude",
        project_root: ".claude",
    },
    BuiltinTarget {
        name: "codex",
        global_root: "~/.codex",
        project_root: ".codex",
    },
];

#[must_use]
pub fn builtin_target(name: &str) -> Option<&'static BuiltinTarget> {
    BUILTIN_TARGETS.iter().find(|t| t.name == name)
}

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("{name} already occupies {} (use --force to replace it)", path.display())]
    AlreadyInstalled { name: String, path: PathBuf },

    #[error("{0} is not installed")]
    NotInstalled(String),

    #[error("project root is not set")]
    ProjectRootNotSet,

    #[error("{0} scope is disabled for this target")]
    ScopeDisabled(Scope),

    #[error(transparent)]
    Fs(#[from] FsError),
}

/// What [`Target::install`] actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod {
    Symlink,
    Copy,
    /// A symlink was requested but could not be created, so the skill was
    /// copied instead.
    CopyFallback,
}

impl InstallMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Symlink => "symlink",
            Self::Copy => "copy",
            Self::CopyFallback => "copy (symlink failed)",
        }
    }
}

impl std::fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// `None` means [`Strategy::Symlink`].
    pub strategy: Option<Strategy>,
    /// Replace whatever already occupies the destination.
    pub force: bool,
}

/// A consumer application's skill directories, one per scope.
pub struct Target {
    name: String,
    fs: Arc<dyn FileSystem>,
    global_root: String,
    project_path: String,
    skills_dir: String,
    project_root: Option<PathBuf>,
    global_enabled: bool,
    project_enabled: bool,
    enabled: bool,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("global_root", &self.global_root)
            .field("project_path", &self.project_path)
            .field("skills_dir", &self.skills_dir)
            .field("project_root", &self.project_root)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl Target {
    /// `global_root` may start with `~`. `project_path` is relative to the
    /// project root.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        fs: Arc<dyn FileSystem>,
        global_root: impl Into<String>,
        project_path: impl Into<String>,
        project_root: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            fs,
            global_root: global_root.into(),
            project_path: project_path.into(),
            skills_dir: DEFAULT_SKILLS_DIR.into(),
            project_root,
            global_enabled: true,
            project_enabled: true,
            enabled: true,
        }
    }

    #[must_use]
    pub fn with_skills_dir(mut self, skills_dir: impl Into<String>) -> Self {
        self.skills_dir = skills_dir.into();
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Scope, enabled: bool) -> Self {
        match scope {
            Scope::Global => self.global_enabled = enabled,
            Scope::Project => self.project_enabled = enabled,
        }
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn scope_enabled(&self, scope: Scope) -> bool {
        match scope {
            Scope::Global => self.global_enabled,
            Scope::Project => self.project_enabled,
        }
    }

    /// # Errors
    ///
    /// Returns [`TargetError::ScopeDisabled`] if this target does not use
    /// `scope`, [`TargetError::ProjectRootNotSet`] for the project scope
    /// outside a project, or an error expanding `~`.
    pub fn skills_path(&self, scope: Scope) -> Result<PathBuf, TargetError> {
        if !self.scope_enabled(scope) {
            return Err(TargetError::ScopeDisabled(scope));
        }
        let root = match scope {
            Scope::Global => expand_home(self.fs.as_ref(), &self.global_root)?,
            Scope::Project => self
                .project_root
                .as_ref()
                .ok_or(TargetError::ProjectRootNotSet)?
                .join(&self.project_path),
        };
        Ok(root.join(&self.skills_dir))
    }

    fn entry_path(&self, name: &str, scope: Scope) -> Option<PathBuf> {
        validate_name(name).ok()?;
        Some(self.skills_path(scope).ok()?.join(name))
    }

    /// True if something resolvable is installed under `name` in `scope`.
    #[must_use]
    pub fn is_installed_in_scope(&self, name: &str, scope: Scope) -> bool {
        self.entry_path(name, scope)
            .is_some_and(|path| self.fs.exists(&path))
    }

    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        self.is_installed_in_scope(name, Scope::Project)
            || self.is_installed_in_scope(name, Scope::Global)
    }

    /// The entry [`uninstall`](Self::uninstall) would remove: the project
    /// entry if present, else the global one. Dangling symlinks count.
    #[must_use]
    pub fn installed_path(&self, name: &str) -> Option<PathBuf> {
        [Scope::Project, Scope::Global].into_iter().find_map(|scope| {
            self.entry_path(name, scope)
                .filter(|path| self.fs.entry_exists(path))
        })
    }

    /// Project `skill` into this target's skills directory for the skill's
    /// scope.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::AlreadyInstalled`] if the destination is
    /// occupied and `force` is not set, a path resolution error, or the
    /// filesystem error of the failed step.
    pub fn install(
        &self,
        skill: &Skill,
        options: InstallOptions,
    ) -> Result<InstallMethod, TargetError> {
        let dir = self.skills_path(skill.scope)?;
        let dest = dir.join(&skill.name);

        if self.fs.entry_exists(&dest) {
            if !options.force {
                return Err(TargetError::AlreadyInstalled {
                    name: skill.name.clone(),
                    path: dest,
                });
            }
            self.fs.remove_all(&dest).fs_context("remove", &dest)?;
        }
        self.fs
            .create_dir_all(&dir)
            .fs_context("create directory", &dir)?;

        let method = match options.strategy.unwrap_or_default() {
            Strategy::Copy => {
                self.fs
                    .copy_dir(&skill.path, &dest)
                    .fs_context("copy", &skill.path)?;
                InstallMethod::Copy
            }
            Strategy::Symlink => match self.fs.symlink(&skill.path, &dest) {
                Ok(()) => InstallMethod::Symlink,
                Err(e) => {
                    tracing::warn!(
                        skill = %skill.name,
                        target = %self.name,
                        "symlink failed, copying instead: {e}"
                    );
                    self.fs
                        .copy_dir(&skill.path, &dest)
                        .fs_context("copy", &skill.path)?;
                    InstallMethod::CopyFallback
                }
            },
        };
        tracing::debug!(skill = %skill.name, target = %self.name, %method, "installed");
        Ok(method)
    }

    /// Remove the entry reported by [`installed_path`](Self::installed_path).
    /// Only one scope is touched per call.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::NotInstalled`] if there is nothing to remove, or
    /// the removal error.
    pub fn uninstall(&self, name: &str) -> Result<PathBuf, TargetError> {
        let path = self
            .installed_path(name)
            .ok_or_else(|| TargetError::NotInstalled(name.to_owned()))?;
        self.remove_entry(name, path)
    }

    /// Remove `name` from the skills directory of `scope` only.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::NotInstalled`] if the scope has no such entry,
    /// or the removal error.
    pub fn uninstall_from_scope(&self, name: &str, scope: Scope) -> Result<PathBuf, TargetError> {
        let path = self
            .entry_path(name, scope)
            .filter(|path| self.fs.entry_exists(path))
            .ok_or_else(|| TargetError::NotInstalled(name.to_owned()))?;
        self.remove_entry(name, path)
    }

    fn remove_entry(&self, name: &str, path: PathBuf) -> Result<PathBuf, TargetError> {
        self.fs.remove_all(&path).fs_context("remove", &path)?;
        tracing::debug!(skill = name, target = %self.name, path = %path.display(), "uninstalled");
        Ok(path)
    }

    /// Names of every entry in this target's skills directories, both scopes,
    /// sorted and deduplicated. Absent or unavailable directories are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing skills directory cannot be read.
    pub fn list_installed(&self) -> Result<Vec<String>, TargetError> {
        self.collect_installed(&Scope::ALL)
    }

    /// Like [`list_installed`](Self::list_installed), for one scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing skills directory cannot be read.
    pub fn list_installed_in_scope(&self, scope: Scope) -> Result<Vec<String>, TargetError> {
        self.collect_installed(&[scope])
    }

    fn collect_installed(&self, scopes: &[Scope]) -> Result<Vec<String>, TargetError> {
        let mut names = BTreeSet::new();
        for &scope in scopes {
            let Ok(dir) = self.skills_path(scope) else {
                continue;
            };
            if !self.fs.exists(&dir) {
                continue;
            }
            let entries = self.fs.read_dir(&dir).fs_context("read directory", &dir)?;
            names.extend(
                entries
                    .into_iter()
                    .filter(|e| e.is_dir || e.is_symlink)
                    .map(|e| e.name),
            );
        }
        Ok(names.into_iter().collect())
    }
}

/// Every known target, keyed and iterated by name.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, Target>,
}

impl TargetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build targets from `config`. Built-in targets take their default
    /// roots unless overridden; custom targets default their project path
    /// to `.<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTarget`] if a custom target uses the
    /// global scope without a `global_path`.
    pub fn from_config(
        config: &Config,
        fs: &Arc<dyn FileSystem>,
        project_root: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, tc) in &config.targets {
            let builtin = builtin_target(name);
            let global_root = match (&tc.global_path, builtin) {
                (Some(path), _) => path.clone(),
                (None, Some(b)) => b.global_root.to_owned(),
                (None, None) if !tc.global => String::new(),
                (None, None) => {
                    return Err(ConfigError::InvalidTarget {
                        name: name.clone(),
                        reason: "custom targets need a global_path".into(),
                    });
                }
            };
            let project_path = match (&tc.project_path, builtin) {
                (Some(path), _) => path.clone(),
                (None, Some(b)) => b.project_root.to_owned(),
                (None, None) => format!(".{name}"),
            };

            let mut target = Target::new(
                name.clone(),
                Arc::clone(fs),
                global_root,
                project_path,
                project_root.clone(),
            )
            .with_scope(Scope::Global, tc.global)
            .with_scope(Scope::Project, tc.project)
            .with_enabled(tc.enabled);
            if let Some(dir) = &tc.skills_dir {
                target = target.with_skills_dir(dir.clone());
            }
            registry.register(target);
        }
        Ok(registry)
    }

    pub fn register(&mut self, target: Target) {
        self.targets.insert(target.name.clone(), target);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Target> {
        self.targets.values().filter(|t| t.enabled)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use skillet_fs::{MemoryFileSystem, OsFileSystem};
    use skillet_skills::Category;

    use super::*;
    use crate::config::TargetConfig;

    fn mem() -> (Arc<MemoryFileSystem>, Arc<dyn FileSystem>) {
        let fs = Arc::new(MemoryFileSystem::new());
        let dyn_fs: Arc<dyn FileSystem> = fs.clone();
        (fs, dyn_fs)
    }

    fn claude(fs: &Arc<dyn FileSystem>, project: Option<&str>) -> Target {
        Target::new(
            "claude",
            Arc::clone(fs),
            "~/.claude",
            ".claude",
            project.map(PathBuf::from),
        )
    }

    fn skill(fs: &MemoryFileSystem, name: &str, scope: Scope) -> Skill {
        let path = format!("/store/{scope}/{name}");
        fs.add_file(format!("{path}/SKILL.md"), "---\nname: x\n---\n");
        Skill::new(name, "", path, scope, Category::Default).unwrap()
    }

    #[test]
    fn skills_path_per_scope() {
        let (_, fs) = mem();
        let target = claude(&fs, Some("/work/app"));
        assert_eq!(
            target.skills_path(Scope::Global).unwrap(),
            PathBuf::from("/home/test/.claude/skills")
        );
        assert_eq!(
            target.skills_path(Scope::Project).unwrap(),
            PathBuf::from("/work/app/.claude/skills")
        );

        let outside = claude(&fs, None);
        assert!(matches!(
            outside.skills_path(Scope::Project),
            Err(TargetError::ProjectRootNotSet)
        ));

        let global_only = claude(&fs, None).with_scope(Scope::Project, false);
        assert!(matches!(
            global_only.skills_path(Scope::Project),
            Err(TargetError::ScopeDisabled(Scope::Project))
        ));
    }

    #[test]
    fn install_symlinks_by_default() {
        let (mem, fs) = mem();
        let target = claude(&fs, None);
        let docs = skill(&mem, "docs", Scope::Global);

        let method = target.install(&docs, InstallOptions::default()).unwrap();

        assert_eq!(method, InstallMethod::Symlink);
        let dest = Path::new("/home/test/.claude/skills/docs");
        assert!(mem.is_symlink(dest));
        assert_eq!(mem.read_link(dest).unwrap(), docs.path);
        assert!(target.is_installed("docs"));
        assert!(target.is_installed_in_scope("docs", Scope::Global));
        assert!(!target.is_installed_in_scope("docs", Scope::Project));
    }

    #[test]
    fn install_refuses_occupied_destination() {
        let (mem, fs) = mem();
        let target = claude(&fs, None);
        let docs = skill(&mem, "docs", Scope::Global);
        target.install(&docs, InstallOptions::default()).unwrap();

        let err = target
            .install(&docs, InstallOptions::default())
            .unwrap_err();
        assert!(matches!(err, TargetError::AlreadyInstalled { .. }));
        assert!(err.to_string().contains("--force"));

        let method = target
            .install(
                &docs,
                InstallOptions {
                    strategy: Some(Strategy::Copy),
                    force: true,
                },
            )
            .unwrap();
        assert_eq!(method, InstallMethod::Copy);
        assert!(!mem.is_symlink(Path::new("/home/test/.claude/skills/docs")));
    }

    #[test]
    fn symlink_failure_falls_back_to_copy() {
        let (mem, fs) = mem();
        mem.disable_symlinks();
        let target = claude(&fs, None);
        let docs = skill(&mem, "docs", Scope::Global);

        let method = target.install(&docs, InstallOptions::default()).unwrap();

        assert_eq!(method, InstallMethod::CopyFallback);
        assert!(mem.exists(Path::new("/home/test/.claude/skills/docs/SKILL.md")));
    }

    #[test]
    fn copy_strategy_does_not_fall_back() {
        let (mem, fs) = mem();
        mem.add_dir("/home/test/.claude/skills");
        mem.inject_failure("/home/test/.claude/skills/docs");
        let target = claude(&fs, None);
        let docs = skill(&mem, "docs", Scope::Global);

        let err = target
            .install(
                &docs,
                InstallOptions {
                    strategy: Some(Strategy::Copy),
                    force: false,
                },
            )
            .unwrap_err();
        assert!(matches!(err, TargetError::Fs(_)));
    }

    #[test]
    fn uninstall_prefers_project_scope() {
        let (mem, fs) = mem();
        let target = claude(&fs, Some("/work/app"));
        let global = skill(&mem, "docs", Scope::Global);
        let project = skill(&mem, "docs", Scope::Project);
        target.install(&global, InstallOptions::default()).unwrap();
        target.install(&project, InstallOptions::default()).unwrap();

        let removed = target.uninstall("docs").unwrap();
        assert_eq!(removed, PathBuf::from("/work/app/.claude/skills/docs"));
        assert!(target.is_installed_in_scope("docs", Scope::Global));

        target.uninstall("docs").unwrap();
        assert!(!target.is_installed("docs"));
        assert!(matches!(
            target.uninstall("docs"),
            Err(TargetError::NotInstalled(_))
        ));
    }

    #[test]
    fn uninstall_from_scope_leaves_other_scope() {
        let (mem, fs) = mem();
        let target = claude(&fs, Some("/work/app"));
        let global = skill(&mem, "docs", Scope::Global);
        let project = skill(&mem, "docs", Scope::Project);
        target.install(&global, InstallOptions::default()).unwrap();
        target.install(&project, InstallOptions::default()).unwrap();

        let removed = target.uninstall_from_scope("docs", Scope::Global).unwrap();

        assert_eq!(removed, PathBuf::from("/home/test/.claude/skills/docs"));
        assert!(target.is_installed_in_scope("docs", Scope::Project));
        assert!(matches!(
            target.uninstall_from_scope("docs", Scope::Global),
            Err(TargetError::NotInstalled(_))
        ));
    }

    #[test]
    fn dangling_links_can_be_uninstalled() {
        let (mem, fs) = mem();
        mem.add_dir("/home/test/.claude/skills");
        mem.symlink(
            Path::new("/store/gone"),
            Path::new("/home/test/.claude/skills/gone"),
        )
        .unwrap();
        let target = claude(&fs, None);

        assert!(!target.is_installed("gone"));
        assert!(target.installed_path("gone").is_some());
        target.uninstall("gone").unwrap();
        assert!(target.installed_path("gone").is_none());
    }

    #[test]
    fn unsafe_names_are_never_installed() {
        let (mem, fs) = mem();
        mem.add_dir("/home/test/.claude/skills");
        mem.add_dir("/home/test/.claude/secret");
        let target = claude(&fs, None);
        assert!(!target.is_installed("../secret"));
        assert!(matches!(
            target.uninstall("../secret"),
            Err(TargetError::NotInstalled(_))
        ));
        assert!(mem.exists(Path::new("/home/test/.claude/secret")));
    }

    #[test]
    fn list_installed_merges_scopes() {
        let (mem, fs) = mem();
        mem.add_dir("/home/test/.claude/skills/b");
        mem.add_dir("/home/test/.claude/skills/a");
        mem.add_file("/home/test/.claude/skills/notes.txt", "x");
        mem.add_dir("/work/app/.claude/skills/a");
        mem.add_dir("/work/app/.claude/skills/c");

        let target = claude(&fs, Some("/work/app"));
        assert_eq!(target.list_installed().unwrap(), ["a", "b", "c"]);

        let no_project = claude(&fs, None);
        assert_eq!(no_project.list_installed().unwrap(), ["a", "b"]);

        let empty = Target::new("codex", fs, "~/.codex", ".codex", None);
        assert!(empty.list_installed().unwrap().is_empty());
    }

    #[test]
    fn registry_from_default_config() {
        let (_, fs) = mem();
        let registry = TargetRegistry::from_config(&Config::default(), &fs, None).unwrap();
        assert_eq!(registry.names(), ["claude", "codex"]);
        assert_eq!(
            registry
                .get("codex")
                .unwrap()
                .skills_path(Scope::Global)
                .unwrap(),
            PathBuf::from("/home/test/.codex/skills")
        );
    }

    #[test]
    fn registry_applies_overrides() {
        let (_, fs) = mem();
        let mut config = Config::default();
        config.targets.get_mut("codex").unwrap().enabled = false;
        config.targets.insert(
            "cursor".into(),
            TargetConfig {
                global_path: Some("/opt/cursor".into()),
                skills_dir: Some("rules".into()),
                ..TargetConfig::default()
            },
        );

        let registry =
            TargetRegistry::from_config(&config, &fs, Some(PathBuf::from("/work/app"))).unwrap();
        let enabled: Vec<_> = registry.enabled().map(Target::name).collect();
        assert_eq!(enabled, ["claude", "cursor"]);

        let cursor = registry.get("cursor").unwrap();
        assert_eq!(
            cursor.skills_path(Scope::Global).unwrap(),
            PathBuf::from("/opt/cursor/rules")
        );
        assert_eq!(
            cursor.skills_path(Scope::Project).unwrap(),
            PathBuf::from("/work/app/.cursor/rules")
        );
    }

    #[test]
    fn registry_rejects_custom_target_without_root() {
        let (_, fs) = mem();
        let mut config = Config::default();
        config
            .targets
            .insert("custom".into(), TargetConfig::default());
        assert!(matches!(
            TargetRegistry::from_config(&config, &fs, None),
            Err(ConfigError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn install_on_real_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("store/docs");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("SKILL.md"), "---\nname: docs\n---\n").unwrap();
        let skill = Skill::new("docs", "", &source, Scope::Global, Category::Default).unwrap();

        let target = Target::new(
            "claude",
            Arc::new(OsFileSystem::new()),
            dir.path().join("claude").to_string_lossy(),
            ".claude",
            None,
        );
        let method = target
            .install(
                &skill,
                InstallOptions {
                    strategy: Some(Strategy::Copy),
                    force: false,
                },
            )
            .unwrap();

        assert_eq!(method, InstallMethod::Copy);
        assert!(dir.path().join("claude/skills/docs/SKILL.md").is_file());
        assert_eq!(target.list_installed().unwrap(), ["docs"]);
    }
}
