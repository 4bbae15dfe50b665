use std::io::Write;

use serial_test::serial;
use skillet_fs::MemoryFileSystem;

use super::*;

const ENV_KEYS: [&str; 3] = [
    "SKILLET_CONFIG",
    "SKILLET_GLOBAL_PATH",
    "SKILLET_DEFAULT_STRATEGY",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.global_path, "~/.agents");
    assert_eq!(config.default_strategy, Strategy::Symlink);
    assert_eq!(config.enabled_targets(), ["claude", "codex"]);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn defaults_when_file_missing() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn parse_valid_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(
        f,
        r#"
global_path = "/opt/agents"
default_strategy = "copy"

[targets.claude]
enabled = true
global_path = "~/custom-claude"

[targets.codex]
enabled = false

[targets.cursor]
global_path = "~/.cursor"
skills_dir = "rules"
project = false
"#
    )
    .unwrap();

    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.global_path, "/opt/agents");
    assert_eq!(config.default_strategy, Strategy::Copy);
    assert_eq!(
        config.targets["claude"].global_path.as_deref(),
        Some("~/custom-claude")
    );
    assert!(!config.targets["codex"].enabled);
    let cursor = &config.targets["cursor"];
    assert!(cursor.enabled);
    assert!(cursor.global);
    assert!(!cursor.project);
    assert_eq!(cursor.skills_dir.as_deref(), Some("rules"));
    assert_eq!(config.enabled_targets(), ["claude", "cursor"]);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn invalid_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "default_strategy = \"hardlink\"\n").unwrap();
    clear_env();

    let err = Config::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    unsafe {
        std::env::set_var("SKILLET_GLOBAL_PATH", "/env/agents");
        std::env::set_var("SKILLET_DEFAULT_STRATEGY", "copy");
    }
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    clear_env();

    assert_eq!(config.global_path, "/env/agents");
    assert_eq!(config.default_strategy, Strategy::Copy);
}

#[test]
#[serial]
fn env_override_invalid_strategy_ignored() {
    clear_env();
    unsafe { std::env::set_var("SKILLET_DEFAULT_STRATEGY", "hardlink") };
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    clear_env();

    assert_eq!(config.default_strategy, Strategy::Symlink);
}

#[test]
#[serial]
fn save_round_trips() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/dir/config.toml");
    let mut config = Config::default();
    config.default_strategy = Strategy::Copy;
    config.targets.get_mut("codex").unwrap().enabled = false;

    config.save(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("default_strategy = \"copy\""));
    assert!(!content.contains("skills_dir"));

    assert_eq!(Config::load(&path).unwrap(), config);
}

#[test]
fn validate_rejects_no_enabled_targets() {
    let mut config = Config::default();
    for target in config.targets.values_mut() {
        target.enabled = false;
    }
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NoTargetsEnabled)
    ));
}

#[test]
fn validate_rejects_bad_targets() {
    let mut config = Config::default();
    config
        .targets
        .insert("custom".into(), TargetConfig::default());
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidTarget { ref name, .. }) if name == "custom"
    ));

    let mut config = Config::default();
    config.targets.get_mut("claude").unwrap().skills_dir = Some("../escape".into());
    assert!(config.validate().is_err());

    let mut config = Config::default();
    let claude = config.targets.get_mut("claude").unwrap();
    claude.global = false;
    claude.project = false;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config
        .targets
        .insert("bad/name".into(), TargetConfig::default());
    assert!(config.validate().is_err());
}

#[test]
fn disabled_custom_target_needs_no_path() {
    let mut config = Config::default();
    config.targets.insert(
        "custom".into(),
        TargetConfig {
            enabled: false,
            ..TargetConfig::default()
        },
    );
    assert!(config.validate().is_ok());
}

#[test]
fn global_skills_dir_expands_home() {
    let fs = MemoryFileSystem::with_home("/home/alice");
    let config = Config::default();
    assert_eq!(
        config.global_skills_dir(&fs).unwrap(),
        PathBuf::from("/home/alice/.agents/skills")
    );
}

#[test]
#[serial]
fn config_path_resolution_order() {
    clear_env();
    let explicit = Path::new("/explicit/config.toml");
    assert_eq!(
        resolve_config_path(Some(explicit)).unwrap(),
        PathBuf::from("/explicit/config.toml")
    );

    unsafe { std::env::set_var(CONFIG_ENV, "/from/env.toml") };
    assert_eq!(
        resolve_config_path(None).unwrap(),
        PathBuf::from("/from/env.toml")
    );
    assert_eq!(
        resolve_config_path(Some(explicit)).unwrap(),
        PathBuf::from("/explicit/config.toml")
    );
    clear_env();

    if let Some(default) = default_config_path() {
        assert!(default.ends_with(".config/skillet/config.toml"));
        assert_eq!(resolve_config_path(None).unwrap(), default);
    }
}

#[test]
fn yaml_siblings_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    assert!(ignored_config_files(&path).is_empty());

    std::fs::write(dir.path().join("config.yaml"), "global_path: ~/.agents\n").unwrap();
    assert_eq!(
        ignored_config_files(&path),
        [dir.path().join("config.yaml")]
    );

    let yaml = dir.path().join("config.yaml");
    assert!(ignored_config_files(&yaml).is_empty());
}
