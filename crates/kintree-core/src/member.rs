use crate::{CoreError, MemberId, TreeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

/// A person record in one family tree.
///
/// Parent references are kept exactly as the forms submitted them; whether
/// they resolve is decided when the graph is built, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub tree_id: TreeId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id1: Option<MemberId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id2: Option<MemberId>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Minimal record with just an identity and a name.
    pub fn named(id: impl Into<MemberId>, first_name: &str, last_name: &str) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_parents(mut self, parent1: Option<&str>, parent2: Option<&str>) -> Self {
        self.parent_id1 = parent1.map(MemberId::from);
        self.parent_id2 = parent2.map(MemberId::from);
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Both parent slots in order, set or not.
    pub fn parent_refs(&self) -> [Option<&MemberId>; 2] {
        [self.parent_id1.as_ref(), self.parent_id2.as_ref()]
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.first_name.trim().is_empty() {
            return Err(CoreError::EmptyField { field: "firstName" });
        }
        if self.last_name.trim().is_empty() {
            return Err(CoreError::EmptyField { field: "lastName" });
        }
        Ok(())
    }
}

/// Payload of the "add member" form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub death_date: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birth_place: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub parent_id1: Option<MemberId>,
    #[serde(default)]
    pub parent_id2: Option<MemberId>,
}

impl MemberDraft {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            ..Default::default()
        }
    }

    /// Turns the draft into a stored record. Empty parent selections become `None`.
    pub fn into_member(
        self,
        id: MemberId,
        tree_id: TreeId,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Member {
        Member {
            id,
            tree_id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            birth_date: self.birth_date,
            death_date: self.death_date,
            gender: self.gender,
            birth_place: self.birth_place,
            bio: self.bio,
            avatar: self.avatar,
            parent_id1: self.parent_id1.filter(|p| !p.is_unset()),
            parent_id2: self.parent_id2.filter(|p| !p.is_unset()),
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
