use crate::TreeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of one family tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FamilyTree {
    pub id: TreeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl FamilyTree {
    pub fn new(id: impl Into<TreeId>, name: &str, owner_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.to_string(),
            description: None,
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
