use std::collections::{BTreeMap, VecDeque};
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{DirEntry, FileSystem};

const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File(Vec<u8>),
    Dir,
    Symlink(PathBuf),
}

#[derive(Debug)]
struct State {
    nodes: BTreeMap<PathBuf, Node>,
    home: PathBuf,
    symlinks_enabled: bool,
    failing: Vec<PathBuf>,
}

/// In-memory [`FileSystem`] with real symlink semantics.
///
/// Paths are normalized lexically. Symlinks are resolved in every path
/// component, and in the last component for operations that follow links
/// (`exists`, `is_dir`, `read_dir`, `read_to_string`, copies). Mutations under
/// a path registered with [`inject_failure`](Self::inject_failure) fail with
/// `PermissionDenied`.
#[derive(Debug)]
pub struct MemoryFileSystem {
    state: Mutex<State>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::with_home("/home/test")
    }

    #[must_use]
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            state: Mutex::new(State {
                nodes,
                home: home.into(),
                symlinks_enabled: true,
                failing: Vec::new(),
            }),
        }
    }

    /// Make every subsequent `symlink` call fail, as on a filesystem without
    /// link support.
    pub fn disable_symlinks(&self) {
        self.lock().symlinks_enabled = false;
    }

    /// Make mutations at or below `path` fail with `PermissionDenied`.
    pub fn inject_failure(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.lock().failing.push(path);
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Create a file and any missing parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let mut state = self.lock();
        let path = normalize(path.as_ref());
        if let Some(parent) = path.parent() {
            mkdir_all(&mut state, parent);
        }
        let resolved = resolve(&state.nodes, &path, false).unwrap_or(path);
        state
            .nodes
            .insert(resolved, Node::File(contents.as_ref().to_vec()));
    }

    /// Create a directory and any missing parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.lock();
        mkdir_all(&mut state, &normalize(path.as_ref()));
    }

    /// Every entry as `path => description`, for before/after comparisons.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        self.lock()
            .nodes
            .iter()
            .map(|(path, node)| {
                let desc = match node {
                    Node::File(data) => format!("file:{}", String::from_utf8_lossy(data)),
                    Node::Dir => "dir".to_owned(),
                    Node::Symlink(target) => format!("link:{}", target.display()),
                };
                (path.clone(), desc)
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn split(path: &Path) -> (PathBuf, VecDeque<OsString>) {
    let mut base = PathBuf::new();
    let mut names = VecDeque::new();
    for component in normalize(path).components() {
        match component {
            Component::Normal(name) => names.push_back(name.to_os_string()),
            other => base.push(other.as_os_str()),
        }
    }
    (base, names)
}

fn resolve(
    nodes: &BTreeMap<PathBuf, Node>,
    path: &Path,
    follow_last: bool,
) -> io::Result<PathBuf> {
    let (mut current, mut remaining) = split(path);
    let mut hops = 0;
    while let Some(name) = remaining.pop_front() {
        let candidate = current.join(&name);
        let is_last = remaining.is_empty();
        match nodes.get(&candidate) {
            Some(Node::Symlink(target)) if follow_last || !is_last => {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(io::Error::other(format!(
                        "too many levels of symbolic links: {}",
                        path.display()
                    )));
                }
                let target = if target.is_absolute() {
                    target.clone()
                } else {
                    current.join(target)
                };
                let (base, mut names) = split(&target);
                names.extend(remaining.drain(..));
                remaining = names;
                current = base;
            }
            _ => current = candidate,
        }
    }
    Ok(current)
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

fn mkdir_all(state: &mut State, path: &Path) {
    let mut current = PathBuf::new();
    for component in normalize(path).components() {
        current.push(component.as_os_str());
        let resolved = resolve(&state.nodes, &current, true).unwrap_or_else(|_| current.clone());
        state.nodes.entry(resolved).or_insert(Node::Dir);
    }
}

fn check_writable(state: &State, path: &Path) -> io::Result<()> {
    if state.failing.iter().any(|f| path.starts_with(f)) {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("permission denied: {}", path.display()),
        ));
    }
    Ok(())
}

fn ensure_parent_dir(state: &State, path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            let parent = resolve(&state.nodes, parent, true)?;
            match state.nodes.get(&parent) {
                Some(Node::Dir) => Ok(()),
                Some(_) => Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", parent.display()),
                )),
                None => Err(not_found(&parent)),
            }
        }
        _ => Ok(()),
    }
}

fn children(nodes: &BTreeMap<PathBuf, Node>, dir: &Path) -> Vec<(PathBuf, Node)> {
    nodes
        .iter()
        .filter(|(path, _)| path.parent() == Some(dir))
        .map(|(path, node)| (path.clone(), node.clone()))
        .collect()
}

fn copy_tree(state: &mut State, from: &Path, to: &Path) -> io::Result<()> {
    let from = resolve(&state.nodes, from, true)?;
    if state.nodes.get(&from) != Some(&Node::Dir) {
        return Err(not_found(&from));
    }
    let to = resolve(&state.nodes, to, false)?;
    check_writable(state, &to)?;
    mkdir_all(state, &to);
    for (child, _) in children(&state.nodes, &from) {
        let Some(name) = child.file_name() else {
            continue;
        };
        let dst = to.join(name);
        let source = resolve(&state.nodes, &child, true)?;
        match state.nodes.get(&source).cloned() {
            Some(Node::Dir) => copy_tree(state, &source, &dst)?,
            Some(Node::File(data)) => {
                state.nodes.insert(dst, Node::File(data));
            }
            _ => return Err(not_found(&child)),
        }
    }
    Ok(())
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let state = self.lock();
        let resolved = resolve(&state.nodes, path, true)?;
        match state.nodes.get(&resolved) {
            Some(Node::File(data)) => String::from_utf8(data.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        let resolved = resolve(&state.nodes, path, true)?;
        check_writable(&state, &resolved)?;
        ensure_parent_dir(&state, &resolved)?;
        if state.nodes.get(&resolved) == Some(&Node::Dir) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            ));
        }
        state
            .nodes
            .insert(resolved, Node::File(contents.to_vec()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        let resolved = resolve(&state.nodes, path, true)?;
        check_writable(&state, &resolved)?;
        if let Some(Node::File(_)) = state.nodes.get(&resolved) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            ));
        }
        mkdir_all(&mut state, path);
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let state = self.lock();
        let resolved = resolve(&state.nodes, path, true)?;
        match state.nodes.get(&resolved) {
            Some(Node::Dir) => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ));
            }
            None => return Err(not_found(path)),
        }
        Ok(children(&state.nodes, &resolved)
            .into_iter()
            .filter_map(|(child, node)| {
                let name = child.file_name()?.to_string_lossy().into_owned();
                Some(DirEntry {
                    name,
                    is_dir: node == Node::Dir,
                    is_symlink: matches!(node, Node::Symlink(_)),
                })
            })
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        resolve(&state.nodes, path, true).is_ok_and(|p| state.nodes.contains_key(&p))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.lock();
        resolve(&state.nodes, path, true).is_ok_and(|p| state.nodes.get(&p) == Some(&Node::Dir))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        let state = self.lock();
        resolve(&state.nodes, path, false)
            .is_ok_and(|p| matches!(state.nodes.get(&p), Some(Node::Symlink(_))))
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if !state.symlinks_enabled {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "symbolic links are not supported on this filesystem",
            ));
        }
        let resolved = resolve(&state.nodes, link, false)?;
        check_writable(&state, &resolved)?;
        ensure_parent_dir(&state, &resolved)?;
        if state.nodes.contains_key(&resolved) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", link.display()),
            ));
        }
        state
            .nodes
            .insert(resolved, Node::Symlink(target.to_path_buf()));
        Ok(())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let state = self.lock();
        let resolved = resolve(&state.nodes, path, false)?;
        match state.nodes.get(&resolved) {
            Some(Node::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symbolic link: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        let source = resolve(&state.nodes, from, true)?;
        let Some(Node::File(data)) = state.nodes.get(&source).cloned() else {
            return Err(not_found(from));
        };
        let dest = resolve(&state.nodes, to, true)?;
        check_writable(&state, &dest)?;
        if let Some(parent) = dest.parent() {
            mkdir_all(&mut state, parent);
        }
        state.nodes.insert(dest, Node::File(data));
        Ok(())
    }

    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        copy_tree(&mut state, from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        let resolved = resolve(&state.nodes, path, false)?;
        check_writable(&state, &resolved)?;
        match state.nodes.get(&resolved) {
            None => Err(not_found(path)),
            Some(Node::Dir) if !children(&state.nodes, &resolved).is_empty() => {
                Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("directory not empty: {}", path.display()),
                ))
            }
            Some(_) => {
                state.nodes.remove(&resolved);
                Ok(())
            }
        }
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        let resolved = resolve(&state.nodes, path, false)?;
        match state.nodes.get(&resolved) {
            None => Ok(()),
            Some(Node::Dir) => {
                check_writable(&state, &resolved)?;
                state.nodes.retain(|p, _| !p.starts_with(&resolved));
                Ok(())
            }
            Some(_) => {
                check_writable(&state, &resolved)?;
                state.nodes.remove(&resolved);
                Ok(())
            }
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        let source = resolve(&state.nodes, from, false)?;
        let dest = resolve(&state.nodes, to, false)?;
        check_writable(&state, &source)?;
        check_writable(&state, &dest)?;
        if !state.nodes.contains_key(&source) {
            return Err(not_found(from));
        }
        ensure_parent_dir(&state, &dest)?;
        if state.nodes.contains_key(&dest) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", to.display()),
            ));
        }
        let moved: Vec<(PathBuf, Node)> = state
            .nodes
            .iter()
            .filter(|(p, _)| p.starts_with(&source))
            .map(|(p, n)| (p.clone(), n.clone()))
            .collect();
        for (path, node) in moved {
            state.nodes.remove(&path);
            let suffix = path.strip_prefix(&source).unwrap_or(Path::new(""));
            let target = if suffix.as_os_str().is_empty() {
                dest.clone()
            } else {
                dest.join(suffix)
            };
            state.nodes.insert(target, node);
        }
        Ok(())
    }

    fn home_dir(&self) -> io::Result<PathBuf> {
        Ok(self.lock().home.clone())
    }
}
