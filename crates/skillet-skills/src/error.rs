use std::path::PathBuf;

use skillet_fs::FsError;

use crate::skill::Scope;

#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("invalid skill name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("skill not found: {0}")]
    NotFound(String),

    #[error("skill not found in {scope} scope: {name}")]
    NotFoundInScope { name: String, scope: Scope },

    #[error("unknown scope: {0} (expected \"global\" or \"project\")")]
    UnknownScope(String),

    #[error("project root is not set")]
    ProjectRootNotSet,

    #[error("SKILL.md not found in {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("invalid frontmatter in {}: {reason}", path.display())]
    Frontmatter { path: PathBuf, reason: String },

    #[error("refusing to remove {}: not inside the skill store", .0.display())]
    OutsideStore(PathBuf),

    #[error(transparent)]
    Fs(#[from] FsError),
}
