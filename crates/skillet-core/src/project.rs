use std::path::{Path, PathBuf};

use skillet_fs::FileSystem;
use skillet_skills::store::AGENTS_DIR;

/// Walk up from `start` to the first directory containing an `.agents`
/// directory. The global store root is never mistaken for a project, so a
/// home directory holding `~/.agents` is skipped.
#[must_use]
pub fn find_project_root(fs: &dyn FileSystem, start: &Path, global_root: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(AGENTS_DIR);
        if candidate != global_root && fs.is_dir(&candidate) {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}
