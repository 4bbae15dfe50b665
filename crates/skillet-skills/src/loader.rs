use std::path::{Path, PathBuf};

use skillet_fs::{FileSystem, FsResultExt};

use crate::error::SkillError;
use crate::skill::{Category, Scope, Skill};

pub const MANIFEST_FILE: &str = "SKILL.md";

/// Default bound on how many directory levels below a skill directory are
/// searched for its manifest.
pub const MAX_SEARCH_DEPTH: usize = 5;

/// Metadata recognised in a SKILL.md frontmatter block. Other keys are
/// ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Find `SKILL.md` in `dir` or, failing that, in its subdirectories up to
/// `max_depth` levels down. Subdirectories are visited in name order and the
/// first match wins. Symlinked subdirectories are not descended into.
#[must_use]
pub fn find_manifest(fs: &dyn FileSystem, dir: &Path, max_depth: usize) -> Option<PathBuf> {
    let manifest = dir.join(MANIFEST_FILE);
    if fs.exists(&manifest) && !fs.is_dir(&manifest) {
        return Some(manifest);
    }
    if max_depth == 0 {
        return None;
    }

    let mut entries = fs.read_dir(dir).ok()?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
        .iter()
        .filter(|e| e.is_dir)
        .find_map(|e| find_manifest(fs, &dir.join(&e.name), max_depth - 1))
}

#[must_use]
pub fn is_valid_skill_dir(fs: &dyn FileSystem, dir: &Path, max_depth: usize) -> bool {
    find_manifest(fs, dir, max_depth).is_some()
}

/// Parse the leading `---` delimited frontmatter of a manifest.
///
/// Values may be quoted, and `>`/`|` block scalars or indented continuation
/// lines are folded into the preceding key.
///
/// # Errors
///
/// Returns [`SkillError::Frontmatter`] if the opening or closing `---` is
/// missing. Lines that are not `key: value`, such as unindented list items,
/// are skipped.
pub fn parse_frontmatter(path: &Path, content: &str) -> Result<Frontmatter, SkillError> {
    let invalid = |reason: String| SkillError::Frontmatter {
        path: path.to_path_buf(),
        reason,
    };

    let mut lines = content.lines().enumerate();
    match lines.next() {
        Some((_, first)) if first.trim_end() == "---" => {}
        _ => return Err(invalid("missing frontmatter delimiter".into())),
    }

    let mut fields: Vec<(String, Field)> = Vec::new();
    // Whether indented lines still belong to the last pushed key.
    let mut open = false;
    let mut closed = false;
    for (idx, line) in lines {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            if open && let Some((_, field)) = fields.last_mut() {
                field.blank();
            }
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if open && let Some((_, field)) = fields.last_mut() {
                field.push(line.trim());
            }
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() && !key.starts_with('-') => {
                fields.push((key.trim().to_owned(), Field::start(value.trim())));
                open = true;
            }
            _ => {
                tracing::trace!(
                    path = %path.display(),
                    line = idx + 1,
                    "skipping frontmatter line"
                );
                open = false;
            }
        }
    }
    if !closed {
        return Err(invalid("unclosed frontmatter".into()));
    }

    let mut meta = Frontmatter::default();
    for (key, field) in fields {
        match key.as_str() {
            "name" => meta.name = Some(field.finish()),
            "description" => meta.description = Some(field.finish()),
            _ => {}
        }
    }
    Ok(meta)
}

#[derive(Debug)]
enum Style {
    Plain,
    Folded,
    Literal,
}

#[derive(Debug)]
struct Field {
    style: Style,
    lines: Vec<String>,
}

impl Field {
    fn start(value: &str) -> Self {
        let style = match value {
            ">" | ">-" | ">+" => Style::Folded,
            "|" | "|-" | "|+" => Style::Literal,
            _ => Style::Plain,
        };
        let lines = match style {
            Style::Plain if !value.is_empty() => vec![value.to_owned()],
            _ => Vec::new(),
        };
        Self { style, lines }
    }

    fn push(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }

    fn blank(&mut self) {
        if matches!(self.style, Style::Literal) && !self.lines.is_empty() {
            self.lines.push(String::new());
        }
    }

    fn finish(self) -> String {
        let joined = match self.style {
            Style::Literal => self.lines.join("\n"),
            Style::Plain | Style::Folded => self.lines.join(" "),
        };
        unquote(joined.trim()).to_owned()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Load the skill whose canonical directory is `dir`. The skill is named
/// after the directory, whatever the manifest says.
///
/// # Errors
///
/// Returns an error if no manifest is found within `max_depth`, it cannot be
/// read or parsed, or the directory name is not a valid skill name.
pub fn load_skill(
    fs: &dyn FileSystem,
    dir: &Path,
    scope: Scope,
    category: Category,
    max_depth: usize,
) -> Result<Skill, SkillError> {
    let manifest = find_manifest(fs, dir, max_depth)
        .ok_or_else(|| SkillError::ManifestNotFound(dir.to_path_buf()))?;
    let content = fs.read_to_string(&manifest).fs_context("read", &manifest)?;
    let meta = parse_frontmatter(&manifest, &content)?;

    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(declared) = meta.name.as_deref()
        && declared != name
    {
        tracing::debug!(skill = %name, declared, "manifest name differs from directory name");
    }

    Skill::new(
        name,
        meta.description.unwrap_or_default(),
        dir,
        scope,
        category,
    )
}
