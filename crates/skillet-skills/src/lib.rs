//! Skill model, SKILL.md loader and the scoped canonical store.

pub mod error;
pub mod loader;
pub mod skill;
pub mod store;

pub use error::SkillError;
pub use skill::{Category, Scope, Skill, validate_name};
pub use store::SkillStore;
