mod init;
mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use skillet_core::config::{ignored_config_files, resolve_config_path};
use skillet_core::project::find_project_root;
use skillet_core::setup::setup_project;
use skillet_core::{
    Config, Migrator, RemoveOptions, SyncEngine, SyncOptions, SyncSummary, TargetRegistry,
    get_status, remove_skill,
};
use skillet_fs::{FileSystem, OsFileSystem};
use skillet_skills::{Scope, SkillStore};

#[derive(Debug, Parser)]
#[command(
    name = "skillet",
    version,
    about = "Keep one set of agent skills and sync it into every AI client"
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $SKILLET_CONFIG or ~/.config/skillet/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Args)]
struct ScopeArgs {
    /// Only the global scope
    #[arg(short, long, conflicts_with = "project")]
    global: bool,

    /// Only the current project's scope
    #[arg(short, long)]
    project: bool,
}

impl ScopeArgs {
    fn scope(self) -> Option<Scope> {
        if self.global {
            Some(Scope::Global)
        } else if self.project {
            Some(Scope::Project)
        } else {
            None
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the skill store and config file
    Init {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Global store root
        #[arg(long, value_name = "DIR")]
        path: Option<String>,
        /// Accept defaults without prompting
        #[arg(short, long)]
        yes: bool,
    },
    /// List skills in the store
    #[command(visible_alias = "ls")]
    List {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Install store skills into every enabled target
    Sync {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Show what would change without touching anything
        #[arg(long)]
        dry_run: bool,
        /// Replace entries that already exist
        #[arg(short, long)]
        force: bool,
    },
    /// Compare targets against the store
    Status {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Uninstall a skill from all targets and delete it from the store
    #[command(visible_alias = "rm")]
    Remove {
        name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Move skills found in target directories into the store
    Migrate {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber(cli.verbose);

    let fs: Arc<dyn FileSystem> = Arc::new(OsFileSystem::new());
    let config_path = resolve_config_path(cli.config.as_deref())?;
    tracing::debug!(path = %config_path.display(), "using config");

    match cli.command {
        Command::Init { scope, path, yes } => run_init(fs, &config_path, scope, path, yes),
        Command::List { scope } => {
            let app = App::load(fs, &config_path)?;
            app.require_project(scope.scope())?;
            run_list(&app, scope.scope())
        }
        Command::Sync {
            scope,
            dry_run,
            force,
        } => {
            let app = App::load(fs, &config_path)?;
            app.require_project(scope.scope())?;
            run_sync(
                &app,
                &SyncOptions {
                    dry_run,
                    force,
                    scope: scope.scope(),
                },
            )
        }
        Command::Status { scope } => {
            let app = App::load(fs, &config_path)?;
            app.require_project(scope.scope())?;
            let statuses = get_status(&app.store()?, &app.registry()?, scope.scope())?;
            print!("{}", output::status_report(&statuses));
            Ok(())
        }
        Command::Remove { name, scope } => {
            let app = App::load(fs, &config_path)?;
            app.require_project(scope.scope())?;
            run_remove(&app, name, scope.scope())
        }
        Command::Migrate { scope, yes } => {
            let app = App::load(fs, &config_path)?;
            let scope = if scope.global {
                Scope::Global
            } else {
                Scope::Project
            };
            app.require_project(Some(scope))?;
            run_migrate(&app, scope, yes)
        }
    }
}

fn init_subscriber(verbose: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Everything a command needs, resolved once from config and cwd.
struct App {
    fs: Arc<dyn FileSystem>,
    config: Config,
    project_root: Option<PathBuf>,
}

impl App {
    fn load(fs: Arc<dyn FileSystem>, config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            tracing::warn!(
                path = %config_path.display(),
                "config file not found, using defaults (run `skillet init` to create it)"
            );
        }
        for ignored in ignored_config_files(config_path) {
            tracing::warn!(
                path = %ignored.display(),
                "ignoring YAML config; settings are read from {}",
                config_path.display()
            );
        }
        let config = Config::load(config_path)?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", config_path.display()))?;

        let cwd = std::env::current_dir().context("failed to read current directory")?;
        let global_root = config.global_root(fs.as_ref())?;
        let project_root = find_project_root(fs.as_ref(), &cwd, &global_root);
        tracing::debug!(
            global = %global_root.display(),
            project = ?project_root,
            "resolved roots"
        );

        Ok(Self {
            fs,
            config,
            project_root,
        })
    }

    fn require_project(&self, scope: Option<Scope>) -> anyhow::Result<()> {
        if scope == Some(Scope::Project) && self.project_root.is_none() {
            bail!("not in a project directory");
        }
        Ok(())
    }

    fn store(&self) -> anyhow::Result<SkillStore> {
        Ok(SkillStore::new(
            Arc::clone(&self.fs),
            self.config.global_skills_dir(self.fs.as_ref())?,
            self.project_root.clone(),
        ))
    }

    fn registry(&self) -> anyhow::Result<TargetRegistry> {
        Ok(TargetRegistry::from_config(
            &self.config,
            &self.fs,
            self.project_root.clone(),
        )?)
    }
}

fn run_init(
    fs: Arc<dyn FileSystem>,
    config_path: &Path,
    scope: ScopeArgs,
    path: Option<String>,
    yes: bool,
) -> anyhow::Result<()> {
    if scope.project {
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        let skills = setup_project(fs.as_ref(), &cwd)?;
        println!("Initialized project skills at {}", skills.display());
        return Ok(());
    }

    let config = init::run(fs.as_ref(), config_path, path, yes)?;
    println!("Config written to {}", config_path.display());
    println!(
        "Skills directory: {}",
        config.global_skills_dir(fs.as_ref())?.display()
    );

    let app = App::load(fs, config_path)?;
    run_migrate(&app, Scope::Global, yes)
}

fn run_list(app: &App, scope: Option<Scope>) -> anyhow::Result<()> {
    let store = app.store()?;
    let skills = match scope {
        Some(scope) => store.get_by_scope(scope)?,
        None => store.get_all()?,
    };
    if skills.is_empty() {
        println!("No skills found");
        return Ok(());
    }
    print!("{}", output::skill_table(&skills));
    Ok(())
}

fn run_sync(app: &App, options: &SyncOptions) -> anyhow::Result<()> {
    let store = app.store()?;
    let registry = app.registry()?;
    let results =
        SyncEngine::new(&store, &registry, app.config.default_strategy).sync(options)?;
    print!("{}", output::sync_report(&results, options.dry_run));

    let summary = SyncSummary::from_results(&results);
    if summary.errors > 0 {
        bail!("{} skill(s) failed to sync", summary.errors);
    }
    Ok(())
}

fn run_remove(app: &App, name: String, scope: Option<Scope>) -> anyhow::Result<()> {
    let store = app.store()?;
    let registry = app.registry()?;
    let report = remove_skill(&store, &registry, &RemoveOptions { name, scope })?;

    println!("Removed {} ({})", report.skill.name, report.skill.scope);
    for removal in report.uninstalled() {
        if let Some(path) = &removal.removed {
            println!("  - {}: {}", removal.target, path.display());
        }
    }
    Ok(())
}

fn run_migrate(app: &App, scope: Scope, yes: bool) -> anyhow::Result<()> {
    let store = app.store()?;
    let registry = app.registry()?;
    let migrator = Migrator::new(&store, &registry, app.config.default_strategy);

    let found = migrator.find_skills_to_migrate(scope);
    if found.is_empty() {
        println!("No skills to migrate.");
        return Ok(());
    }

    println!("\nFound existing skills:");
    for (target, names) in &found {
        for name in names {
            println!("  {target}: {name}");
        }
    }

    let proceed = yes
        || Confirm::new()
            .with_prompt("Migrate existing skills to agents directory?")
            .default(true)
            .interact()?;
    if !proceed {
        println!("Skipped migration.");
        return Ok(());
    }

    let result = migrator.migrate(scope, found)?;
    print!("{}", output::move_report(&result.moves));
    print!("{}", output::migrate_sync_report(&result.sync));
    Ok(())
}
