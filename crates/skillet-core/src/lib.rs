//! Targets, synchronization, status and migration on top of the skill store.

pub mod config;
pub mod error;
pub mod migrate;
pub mod project;
pub mod remove;
pub mod setup;
pub mod status;
pub mod sync;
pub mod target;

pub use config::{Config, Strategy};
pub use error::CoreError;
pub use migrate::{MigrateAction, MigrateResult, Migrator, MoveResult};
pub use remove::{RemoveOptions, RemoveReport, remove_skill};
pub use status::{TargetStatus, get_status};
pub use sync::{SyncAction, SyncEngine, SyncOptions, SyncResult, SyncSummary};
pub use target::{InstallMethod, InstallOptions, Target, TargetError, TargetRegistry};
