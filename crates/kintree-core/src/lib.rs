use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub mod member;
pub mod story;
pub mod tree;

pub use error::CoreError;
pub use member::{Gender, Member, MemberDraft};
pub use story::{Story, StoryDraft, StoryId, stories_involving};
pub use tree::FamilyTree;

/// Placeholder value some forms submit instead of leaving a parent slot empty.
pub const NO_PARENT_SENTINEL: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for a newly created record.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the values that mean "no parent here": empty, blank or the sentinel.
    pub fn is_unset(&self) -> bool {
        let trimmed = self.0.trim();
        trimmed.is_empty() || trimmed == NO_PARENT_SENTINEL
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MemberId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct TreeId(pub String);

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TreeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Which positioning strategy the layout engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    Hierarchical,
    Force,
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hierarchical => write!(f, "hierarchical"),
            Self::Force => write!(f, "force"),
        }
    }
}

impl std::str::FromStr for LayoutMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hierarchical" | "tree" | "levels" => Ok(Self::Hierarchical),
            "force" | "force-directed" | "physics" => Ok(Self::Force),
            other => Err(CoreError::UnknownLayoutMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_parent_values() {
        assert!(MemberId::from("").is_unset());
        assert!(MemberId::from("  ").is_unset());
        assert!(MemberId::from("none").is_unset());
        assert!(!MemberId::from("member-1").is_unset());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = MemberId::generate();
        let b = MemberId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn layout_mode_parsing() {
        assert_eq!("force".parse::<LayoutMode>().unwrap(), LayoutMode::Force);
        assert_eq!(
            "Hierarchical".parse::<LayoutMode>().unwrap(),
            LayoutMode::Hierarchical
        );
        assert!("radial".parse::<LayoutMode>().is_err());
        assert_eq!(LayoutMode::Force.to_string(), "force");
    }
}
