//! Filesystem primitives used by the skill store, targets and migration.
//!
//! Everything above this crate talks to a [`FileSystem`] trait object, so the
//! engine can run against [`OsFileSystem`] in production and
//! [`MemoryFileSystem`] in tests.

mod error;
mod memory;
mod os;

use std::io;
use std::path::{Path, PathBuf};

pub use error::{FsError, FsResultExt};
pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

/// A single entry returned by [`FileSystem::read_dir`].
///
/// `is_dir` does not follow symlinks: a link to a directory reports
/// `is_dir == false` and `is_symlink == true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// List the immediate children of `path`, in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// True if `path` resolves to something. Follows symlinks, so a dangling
    /// link reports `false`.
    fn exists(&self, path: &Path) -> bool;

    /// True if `path` resolves to a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;

    /// True if `path` itself is a symbolic link, dangling or not.
    fn is_symlink(&self, path: &Path) -> bool;

    /// Create `link` pointing at `target`.
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;

    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Recursively copy the directory `from` into a new directory `to`.
    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a single file, symlink or empty directory.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Remove `path` and everything below it. Symlinks are removed, never
    /// followed. Missing paths are not an error.
    fn remove_all(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn home_dir(&self) -> io::Result<PathBuf>;

    /// True if there is a directory entry at `path`, including a dangling
    /// symlink.
    fn entry_exists(&self, path: &Path) -> bool {
        self.exists(path) || self.is_symlink(path)
    }
}

/// Expand a leading `~` to the home directory reported by `fs`.
///
/// # Errors
///
/// Returns an error if the path starts with `~` and the home directory cannot
/// be determined.
pub fn expand_home(fs: &dyn FileSystem, path: &str) -> Result<PathBuf, FsError> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(PathBuf::from(path));
    };
    let home = fs.home_dir().fs_context("resolve home directory", path)?;
    let rest = rest.trim_start_matches(['/', '\\']);
    if rest.is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}
