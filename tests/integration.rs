use std::path::{Path, PathBuf};
use std::sync::Arc;

use skillet_core::config::{Config, Strategy};
use skillet_core::project::find_project_root;
use skillet_core::{
    MigrateAction, Migrator, RemoveOptions, SyncAction, SyncEngine, SyncOptions, SyncSummary,
    TargetRegistry, get_status, remove_skill,
};
use skillet_fs::{FileSystem, OsFileSystem};
use skillet_skills::{Category, Scope, SkillStore};

struct Workspace {
    _dir: tempfile::TempDir,
    home: PathBuf,
    project: PathBuf,
    fs: Arc<dyn FileSystem>,
    config: Config,
}

fn write_skill(dir: &Path, name: &str, description: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("SKILL.md"),
        format!("---\nname: {name}\ndescription: {description}\n---\n\n# {name}\n"),
    )
    .unwrap();
}

impl Workspace {
    fn new(strategy: Strategy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        let project = dir.path().join("work/app");

        let global_skills = home.join(".agents/skills");
        write_skill(&global_skills.join("docs"), "docs", "Writes documentation");
        write_skill(&global_skills.join("lint"), "lint", "Global lint rules");
        write_skill(
            &global_skills.join("optional/profiling"),
            "profiling",
            "Only when asked",
        );
        let project_skills = project.join(".agents/skills");
        write_skill(&project_skills.join("lint"), "lint", "Project lint rules");
        write_skill(&project_skills.join("deploy"), "deploy", "Ships the app");

        let mut config = Config::default();
        config.global_path = home.join(".agents").to_string_lossy().into_owned();
        config.default_strategy = strategy;
        for (name, target) in &mut config.targets {
            target.global_path = Some(home.join(format!(".{name}")).to_string_lossy().into_owned());
        }
        config.validate().unwrap();

        Self {
            _dir: dir,
            home,
            project,
            fs: Arc::new(OsFileSystem::new()),
            config,
        }
    }

    fn project_root(&self) -> Option<PathBuf> {
        let global_root = self.config.global_root(self.fs.as_ref()).unwrap();
        let nested = self.project.join("src/module");
        std::fs::create_dir_all(&nested).unwrap();
        find_project_root(self.fs.as_ref(), &nested, &global_root)
    }

    fn store(&self) -> SkillStore {
        SkillStore::new(
            Arc::clone(&self.fs),
            self.config.global_skills_dir(self.fs.as_ref()).unwrap(),
            self.project_root(),
        )
    }

    fn registry(&self) -> TargetRegistry {
        TargetRegistry::from_config(&self.config, &self.fs, self.project_root()).unwrap()
    }
}

#[test]
fn project_root_is_found_from_a_subdirectory() {
    let ws = Workspace::new(Strategy::Symlink);
    assert_eq!(ws.project_root(), Some(ws.project.clone()));
}

#[test]
fn project_skill_shadows_global_skill() {
    let ws = Workspace::new(Strategy::Symlink);
    let store = ws.store();

    let resolved = store.get_resolved().unwrap();
    let names: Vec<_> = resolved.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["deploy", "docs", "lint", "profiling"]);

    let lint = store.get_by_name("lint").unwrap();
    assert_eq!(lint.scope, Scope::Project);
    assert_eq!(lint.description, "Project lint rules");
    assert_eq!(
        store.get_by_name("profiling").unwrap().category,
        Category::Optional
    );
}

#[test]
fn sync_links_every_target_then_reports_in_sync() {
    let ws = Workspace::new(Strategy::Symlink);
    let store = ws.store();
    let registry = ws.registry();
    let engine = SyncEngine::new(&store, &registry, ws.config.default_strategy);

    let preview = engine
        .sync(&SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .unwrap();
    assert!(preview.iter().all(|r| r.action == SyncAction::Install));
    assert!(!ws.home.join(".claude/skills").exists());

    let results = engine.sync(&SyncOptions::default()).unwrap();
    let summary = SyncSummary::from_results(&results);
    assert_eq!(summary.installed, 8);
    assert_eq!(summary.errors, 0);

    let link = ws.home.join(".claude/skills/docs");
    assert_eq!(
        std::fs::read_link(&link).unwrap(),
        ws.home.join(".agents/skills/docs")
    );
    assert_eq!(
        std::fs::read_link(ws.project.join(".codex/skills/lint")).unwrap(),
        ws.project.join(".agents/skills/lint")
    );
    assert!(!ws.home.join(".claude/skills/lint").exists());

    let again = engine.sync(&SyncOptions::default()).unwrap();
    assert!(again.iter().all(|r| r.action == SyncAction::Skip));

    let statuses = get_status(&store, &registry, None).unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().all(|s| s.in_sync), "{statuses:?}");
}

#[test]
fn copy_strategy_produces_real_directories() {
    let ws = Workspace::new(Strategy::Copy);
    let store = ws.store();
    let registry = ws.registry();

    SyncEngine::new(&store, &registry, ws.config.default_strategy)
        .sync(&SyncOptions {
            scope: Some(Scope::Global),
            ..SyncOptions::default()
        })
        .unwrap();

    let copied = ws.home.join(".codex/skills/docs");
    assert!(!copied.is_symlink());
    assert!(copied.join("SKILL.md").is_file());
    assert!(!ws.project.join(".codex/skills").exists());
}

#[test]
fn migrate_absorbs_unmanaged_skills() {
    let ws = Workspace::new(Strategy::Symlink);
    write_skill(&ws.home.join(".claude/skills/legacy"), "legacy", "Hand-installed");
    write_skill(&ws.home.join(".codex/skills/legacy"), "legacy", "Second copy");
    let store = ws.store();
    let registry = ws.registry();

    let statuses = get_status(&store, &registry, Some(Scope::Global)).unwrap();
    assert_eq!(statuses[0].extra, ["legacy"]);

    let migrator = Migrator::new(&store, &registry, ws.config.default_strategy);
    let found = migrator.find_skills_to_migrate(Scope::Global);
    assert_eq!(found["claude"], ["legacy"]);
    assert_eq!(found["codex"], ["legacy"]);

    let result = migrator.migrate(Scope::Global, found).unwrap();
    let actions: Vec<_> = result.moves.iter().map(|m| m.action).collect();
    assert_eq!(actions, [MigrateAction::Moved, MigrateAction::Removed]);

    let canonical = ws.home.join(".agents/skills/legacy");
    assert!(canonical.join("SKILL.md").is_file());
    for target in [".claude", ".codex"] {
        let entry = ws.home.join(target).join("skills/legacy");
        assert_eq!(std::fs::read_link(&entry).unwrap(), canonical);
    }
    assert_eq!(store.get_by_name("legacy").unwrap().description, "Hand-installed");
    assert!(migrator.find_skills_to_migrate(Scope::Global).is_empty());
}

#[test]
fn remove_cleans_targets_before_the_store() {
    let ws = Workspace::new(Strategy::Symlink);
    let store = ws.store();
    let registry = ws.registry();
    SyncEngine::new(&store, &registry, ws.config.default_strategy)
        .sync(&SyncOptions::default())
        .unwrap();

    let report = remove_skill(
        &store,
        &registry,
        &RemoveOptions {
            name: "lint".into(),
            scope: None,
        },
    )
    .unwrap();

    assert_eq!(report.skill.scope, Scope::Project);
    assert_eq!(report.uninstalled().count(), 2);
    assert!(!ws.project.join(".agents/skills/lint").exists());
    assert!(!ws.project.join(".claude/skills/lint").exists());
    assert!(ws.home.join(".agents/skills/lint").is_dir());

    let fallback = store.get_by_name("lint").unwrap();
    assert_eq!(fallback.scope, Scope::Global);

    let err = remove_skill(
        &store,
        &registry,
        &RemoveOptions {
            name: "../etc".into(),
            scope: None,
        },
    );
    assert!(err.is_err());
}
