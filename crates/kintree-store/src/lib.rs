use chrono::Utc;
use kintree_core::{
    CoreError, FamilyTree, Member, MemberDraft, MemberId, Story, StoryDraft, StoryId,
    stories_involving,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Member not found: {0}")]
    NotFound(MemberId),
    #[error("Duplicate member id: {0}")]
    DuplicateId(MemberId),
    #[error("Story not found: {0}")]
    StoryNotFound(StoryId),
    #[error("Duplicate story id: {0}")]
    DuplicateStoryId(StoryId),
    #[error("Invalid record: {0}")]
    Invalid(#[from] CoreError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk shape of one tree: its metadata, the flat member list and the
/// stories written about those members.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TreeDocument {
    pub tree: FamilyTree,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub stories: Vec<Story>,
}

/// In-memory member collection for the currently open tree.
///
/// Insertion order is kept; every mutation bumps `revision` so consumers can
/// tell whether the snapshot they built a graph from is still current.
#[derive(Debug, Clone)]
pub struct MemberStore {
    tree: FamilyTree,
    members: Vec<Member>,
    stories: Vec<Story>,
    revision: u64,
}

impl MemberStore {
    pub fn new(tree: FamilyTree) -> Self {
        Self {
            tree,
            members: Vec::new(),
            stories: Vec::new(),
            revision: 0,
        }
    }

    pub fn from_document(doc: TreeDocument) -> Result<Self, StoreError> {
        let mut store = Self::new(doc.tree);
        for member in doc.members {
            store.insert_member(member)?;
        }
        for story in doc.stories {
            store.insert_story_record(story)?;
        }
        Ok(store)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let doc: TreeDocument = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded tree {} with {} members and {} stories from {:?}",
            doc.tree.id,
            doc.members.len(),
            doc.stories.len(),
            path.as_ref()
        );
        Self::from_document(doc)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.to_document())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_document(&self) -> TreeDocument {
        TreeDocument {
            tree: self.tree.clone(),
            members: self.members.clone(),
            stories: self.stories.clone(),
        }
    }

    pub fn tree(&self) -> &FamilyTree {
        &self.tree
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Ordered copy of the collection, handed to the graph engine.
    pub fn snapshot(&self) -> Vec<Member> {
        self.members.clone()
    }

    pub fn get(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    fn position(&self, id: &MemberId) -> Option<usize> {
        self.members.iter().position(|m| &m.id == id)
    }

    fn bump(&mut self) {
        self.revision += 1;
        self.tree.touch();
    }

    /// Creates a member from form input with a fresh id and creation timestamp.
    pub fn insert(&mut self, draft: MemberDraft, created_by: &str) -> Result<Member, StoreError> {
        let member = draft.into_member(
            MemberId::generate(),
            self.tree.id.clone(),
            created_by,
            Utc::now(),
        );
        member.validate()?;
        self.members.push(member.clone());
        self.bump();
        tracing::debug!("Inserted member {} ({})", member.id, member.display_name());
        Ok(member)
    }

    /// Adds an existing record as-is (imports, fixtures).
    pub fn insert_member(&mut self, member: Member) -> Result<(), StoreError> {
        member.validate()?;
        if self.position(&member.id).is_some() {
            return Err(StoreError::DuplicateId(member.id));
        }
        self.members.push(member);
        self.bump();
        Ok(())
    }

    /// Replaces every field of an existing record and refreshes `updated_at`.
    pub fn replace(&mut self, mut member: Member) -> Result<Member, StoreError> {
        member.validate()?;
        let idx = self
            .position(&member.id)
            .ok_or_else(|| StoreError::NotFound(member.id.clone()))?;
        let existing = &self.members[idx];
        member.tree_id = existing.tree_id.clone();
        member.created_at = existing.created_at;
        member.created_by = existing.created_by.clone();
        member.updated_at = Utc::now();
        self.members[idx] = member.clone();
        self.bump();
        Ok(member)
    }

    /// Removes a record. References to it from other members are left in
    /// place; the graph builder treats them as dangling.
    pub fn remove(&mut self, id: &MemberId) -> Result<Member, StoreError> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let removed = self.members.remove(idx);
        self.bump();

        let orphaned = self
            .members
            .iter()
            .filter(|m| m.parent_refs().into_iter().flatten().any(|p| p == id))
            .count();
        if orphaned > 0 {
            tracing::debug!(
                "Removed member {} still referenced as parent by {} members",
                id,
                orphaned
            );
        }
        let tagged = self.stories.iter().filter(|s| s.involves(id)).count();
        if tagged > 0 {
            tracing::debug!("Removed member {} is still tagged in {} stories", id, tagged);
        }
        Ok(removed)
    }

    /// Ids referenced as parents that no member in this tree carries.
    pub fn dangling_parent_refs(&self) -> Vec<(MemberId, MemberId)> {
        let ids: HashSet<&MemberId> = self.members.iter().map(|m| &m.id).collect();
        let mut dangling = Vec::new();
        for member in &self.members {
            for parent in member.parent_refs().into_iter().flatten() {
                if !parent.is_unset() && !ids.contains(parent) {
                    dangling.push((member.id.clone(), parent.clone()));
                }
            }
        }
        dangling
    }

    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    pub fn get_story(&self, id: &StoryId) -> Option<&Story> {
        self.stories.iter().find(|s| &s.id == id)
    }

    fn story_position(&self, id: &StoryId) -> Option<usize> {
        self.stories.iter().position(|s| &s.id == id)
    }

    /// Creates a story from form input with a fresh id and creation timestamp.
    pub fn insert_story(
        &mut self,
        draft: StoryDraft,
        created_by: &str,
    ) -> Result<Story, StoreError> {
        let story = draft.into_story(
            StoryId::generate(),
            self.tree.id.clone(),
            created_by,
            Utc::now(),
        );
        story.validate()?;
        self.stories.push(story.clone());
        self.bump();
        tracing::debug!(
            "Inserted story {} about {} members",
            story.id,
            story.related_member_ids.len()
        );
        Ok(story)
    }

    pub fn insert_story_record(&mut self, story: Story) -> Result<(), StoreError> {
        story.validate()?;
        if self.story_position(&story.id).is_some() {
            return Err(StoreError::DuplicateStoryId(story.id));
        }
        self.stories.push(story);
        self.bump();
        Ok(())
    }

    pub fn replace_story(&mut self, mut story: Story) -> Result<Story, StoreError> {
        story.validate()?;
        let idx = self
            .story_position(&story.id)
            .ok_or_else(|| StoreError::StoryNotFound(story.id.clone()))?;
        let existing = &self.stories[idx];
        story.tree_id = existing.tree_id.clone();
        story.created_at = existing.created_at;
        story.created_by = existing.created_by.clone();
        story.updated_at = Utc::now();
        self.stories[idx] = story.clone();
        self.bump();
        Ok(story)
    }

    pub fn remove_story(&mut self, id: &StoryId) -> Result<Story, StoreError> {
        let idx = self
            .story_position(id)
            .ok_or_else(|| StoreError::StoryNotFound(id.clone()))?;
        let removed = self.stories.remove(idx);
        self.bump();
        Ok(removed)
    }

    /// Stories tagged with a member of this tree. Empty for unknown ids, even
    /// when a story still names them.
    pub fn stories_involving(&self, member: &MemberId) -> Vec<&Story> {
        if self.get(member).is_none() {
            return Vec::new();
        }
        stories_involving(&self.stories, member)
    }

    /// The members a story is about, skipping ids that no longer resolve.
    pub fn related_members(&self, story: &Story) -> Vec<&Member> {
        story
            .related_member_ids
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Story tags that name no member in this tree.
    pub fn dangling_story_refs(&self) -> Vec<(StoryId, MemberId)> {
        let ids: HashSet<&MemberId> = self.members.iter().map(|m| &m.id).collect();
        let mut dangling = Vec::new();
        for story in &self.stories {
            for member in &story.related_member_ids {
                if !ids.contains(member) {
                    dangling.push((story.id.clone(), member.clone()));
                }
            }
        }
        dangling
    }
}
