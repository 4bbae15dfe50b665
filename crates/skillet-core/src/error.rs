use skillet_fs::FsError;
use skillet_skills::SkillError;

use crate::config::ConfigError;
use crate::target::TargetError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Skill(#[from] SkillError),

    #[error("target {target}: {source}")]
    Target {
        target: String,
        #[source]
        source: TargetError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl CoreError {
    pub(crate) fn target(target: &str, source: TargetError) -> Self {
        Self::Target {
            target: target.to_owned(),
            source,
        }
    }
}
