use crate::{CoreError, MemberId, TreeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StoryId(pub String);

impl StoryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A written memory attached to a tree, tagged with the members it concerns.
///
/// `related_member_ids` may name members that were since removed; readers
/// skip ids that no longer resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    pub tree_id: TreeId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default)]
    pub related_member_ids: Vec<MemberId>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Story {
    pub fn new(id: impl Into<StoryId>, title: &str, content: &str) -> Self {
        Self {
            id: id.into(),
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    pub fn about(mut self, members: &[&str]) -> Self {
        self.related_member_ids = members.iter().map(|m| MemberId::from(*m)).collect();
        self
    }

    pub fn involves(&self, member: &MemberId) -> bool {
        self.related_member_ids.iter().any(|m| m == member)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::EmptyField { field: "title" });
        }
        if self.content.trim().is_empty() {
            return Err(CoreError::EmptyField { field: "content" });
        }
        Ok(())
    }
}

/// Stories tagged with `member`, in the order they were given.
pub fn stories_involving<'a>(stories: &'a [Story], member: &MemberId) -> Vec<&'a Story> {
    stories.iter().filter(|s| s.involves(member)).collect()
}

/// Payload of the "add story" form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StoryDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub related_member_ids: Vec<MemberId>,
}

impl StoryDraft {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    /// Blank and sentinel member selections are dropped, as are repeats.
    pub fn into_story(
        self,
        id: StoryId,
        tree_id: TreeId,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Story {
        let mut related: Vec<MemberId> = Vec::with_capacity(self.related_member_ids.len());
        for member in self.related_member_ids {
            if !member.is_unset() && !related.contains(&member) {
                related.push(member);
            }
        }
        Story {
            id,
            tree_id,
            title: self.title.trim().to_string(),
            content: self.content,
            date: self.date,
            location: self.location,
            images: self.images,
            related_member_ids: related,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
