use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::SkillError;

/// Where a skill lives. Project skills shadow global skills of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Global,
    Project,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Global, Scope::Project];

    /// Conflict-resolution priority. Higher wins.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Global => 1,
            Self::Project => 2,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "project" => Ok(Self::Project),
            other => Err(SkillError::UnknownScope(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Category {
    #[default]
    Default,
    Optional,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Optional => "optional",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub name: String,
    pub description: String,
    /// Canonical directory inside the store.
    pub path: PathBuf,
    pub scope: Scope,
    pub category: Category,
}

impl Skill {
    /// # Errors
    ///
    /// Returns [`SkillError::InvalidName`] if `name` is not a safe path segment.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        path: impl Into<PathBuf>,
        scope: Scope,
        category: Category,
    ) -> Result<Self, SkillError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            description: description.into().trim().to_owned(),
            path: path.into(),
            scope,
            category,
        })
    }

    #[must_use]
    pub fn priority(&self) -> u8 {
        self.scope.priority()
    }
}

/// Check that `name` can be used as a single path segment under a skills
/// directory.
///
/// # Errors
///
/// Returns [`SkillError::InvalidName`] describing the first rule the name
/// breaks.
pub fn validate_name(name: &str) -> Result<(), SkillError> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.contains(['/', '\\']) {
        Some("name must not contain path separators")
    } else if name.contains("..") {
        Some("name must not contain '..'")
    } else if name.starts_with('.') {
        Some("name must not start with '.'")
    } else if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        Some("name must start with a letter or digit")
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some("name may only contain letters, digits, '-' and '_'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SkillError::InvalidName {
            name: name.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Component, Path};

    use proptest::prelude::*;

    use super::*;

    fn reason(name: &str) -> &'static str {
        match validate_name(name) {
            Err(SkillError::InvalidName { reason, .. }) => reason,
            other => panic!("expected InvalidName for {name:?}, got {other:?}"),
        }
    }

    #[test]
    fn accepts_plain_names() {
        for name in ["docs", "my-skill", "skill_2", "A1", "9lives"] {
            validate_name(name).unwrap();
        }
    }

    #[test]
    fn rejects_unsafe_names() {
        assert_eq!(reason(""), "name is empty");
        assert_eq!(reason("a/b"), "name must not contain path separators");
        assert_eq!(reason("a\\b"), "name must not contain path separators");
        assert_eq!(reason(".."), "name must not contain '..'");
        assert_eq!(reason("a..b"), "name must not contain '..'");
        assert_eq!(reason(".hidden"), "name must not start with '.'");
        assert_eq!(reason("-dash"), "name must start with a letter or digit");
        assert_eq!(
            reason("has space"),
            "name may only contain letters, digits, '-' and '_'"
        );
        assert_eq!(
            reason("émoji"),
            "name must start with a letter or digit"
        );
    }

    #[test]
    fn error_names_the_offender() {
        let err = validate_name("../etc").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("../etc"), "{msg}");
    }

    #[test]
    fn project_outranks_global() {
        assert!(Scope::Project.priority() > Scope::Global.priority());
    }

    #[test]
    fn scope_parses_known_values() {
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::Global);
        assert_eq!("project".parse::<Scope>().unwrap(), Scope::Project);
        assert!(matches!(
            "user".parse::<Scope>(),
            Err(SkillError::UnknownScope(s)) if s == "user"
        ));
    }

    #[test]
    fn new_validates_and_trims() {
        let skill = Skill::new(
            "docs",
            "  Writes docs \n",
            "/s/docs",
            Scope::Global,
            Category::Default,
        )
        .unwrap();
        assert_eq!(skill.description, "Writes docs");
        assert!(Skill::new("../x", "", "/s", Scope::Global, Category::Default).is_err());
    }

    proptest! {
        #[test]
        fn well_formed_names_are_accepted(name in "[A-Za-z0-9][A-Za-z0-9_-]{0,40}") {
            prop_assert!(validate_name(&name).is_ok());
        }

        #[test]
        fn accepted_names_are_single_segments(name in "\\PC{0,24}") {
            if validate_name(&name).is_ok() {
                let components: Vec<_> = Path::new(&name).components().collect();
                prop_assert_eq!(components.len(), 1);
                prop_assert!(matches!(components[0], Component::Normal(_)));
            }
        }

        #[test]
        fn names_with_separators_are_rejected(
            head in "[a-z]{1,8}",
            sep in "[/\\\\]",
            tail in "[a-z]{0,8}",
        ) {
            let name = format!("{head}{sep}{tail}");
            prop_assert!(validate_name(&name).is_err());
        }
    }
}
