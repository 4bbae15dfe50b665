use std::collections::BTreeSet;
use std::path::Path;

use dialoguer::{Input, MultiSelect, Select};
use skillet_core::setup::{SetupParams, setup_global};
use skillet_core::{Config, Strategy};
use skillet_fs::FileSystem;

const STRATEGIES: [Strategy; 2] = [Strategy::Symlink, Strategy::Copy];

#[derive(Debug, Clone)]
pub(crate) struct WizardState {
    pub(crate) global_path: String,
    /// Every configured target name with whether it ends up enabled.
    pub(crate) targets: Vec<(String, bool)>,
    pub(crate) strategy: Strategy,
}

impl WizardState {
    /// Seed the answers from an existing (or default) config.
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            global_path: config.global_path.clone(),
            targets: config
                .targets
                .iter()
                .map(|(name, target)| (name.clone(), target.enabled))
                .collect(),
            strategy: config.default_strategy,
        }
    }

    pub(crate) fn params(&self) -> SetupParams {
        SetupParams {
            global_path: self.global_path.clone(),
            enabled_targets: self
                .targets
                .iter()
                .filter(|(_, enabled)| *enabled)
                .map(|(name, _)| name.clone())
                .collect::<BTreeSet<_>>(),
            strategy: self.strategy,
        }
    }
}

/// Ask for the global setup, or take the current answers as-is when `yes`
/// is set, then create the store and write the config.
pub fn run(
    fs: &dyn FileSystem,
    config_path: &Path,
    path: Option<String>,
    yes: bool,
) -> anyhow::Result<Config> {
    let mut state = WizardState::from_config(&Config::load(config_path)?);
    if let Some(path) = path {
        state.global_path = path;
    }

    if !yes {
        println!("skillet init - global setup\n");
        step_targets(&mut state)?;
        step_strategy(&mut state)?;
        step_global_path(&mut state)?;
    }

    setup_global(fs, config_path, &state.params())
}

fn step_targets(state: &mut WizardState) -> anyhow::Result<()> {
    let names: Vec<&str> = state.targets.iter().map(|(n, _)| n.as_str()).collect();
    let checked: Vec<bool> = state.targets.iter().map(|(_, e)| *e).collect();
    let selected = MultiSelect::new()
        .with_prompt("Sync skills to which targets? (space to toggle)")
        .items(&names)
        .defaults(&checked)
        .interact()?;

    for (i, (_, enabled)) in state.targets.iter_mut().enumerate() {
        *enabled = selected.contains(&i);
    }
    Ok(())
}

fn step_strategy(state: &mut WizardState) -> anyhow::Result<()> {
    let current = STRATEGIES
        .iter()
        .position(|s| *s == state.strategy)
        .unwrap_or_default();
    let sel = Select::new()
        .with_prompt("Install strategy")
        .items(["symlink (recommended)", "copy"])
        .default(current)
        .interact()?;
    state.strategy = STRATEGIES.get(sel).copied().unwrap_or_default();
    Ok(())
}

fn step_global_path(state: &mut WizardState) -> anyhow::Result<()> {
    state.global_path = Input::new()
        .with_prompt("Global skills root")
        .default(state.global_path.clone())
        .interact_text()?;
    println!();
    Ok(())
}
