use std::io;
use std::path::{Path, PathBuf};

/// An I/O failure annotated with the operation and the path it was applied to.
#[derive(Debug, thiserror::Error)]
#[error("failed to {op} {}: {source}", path.display())]
pub struct FsError {
    pub op: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FsError {
    #[must_use]
    pub fn new(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            op,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

pub trait FsResultExt<T> {
    /// Attach the operation name and path to an `io::Error`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error if `self` is `Err`.
    fn fs_context(self, op: &'static str, path: impl AsRef<Path>) -> Result<T, FsError>;
}

impl<T> FsResultExt<T> for io::Result<T> {
    fn fs_context(self, op: &'static str, path: impl AsRef<Path>) -> Result<T, FsError> {
        self.map_err(|e| FsError::new(op, path.as_ref(), e))
    }
}
