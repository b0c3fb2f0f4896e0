use kintree_core::{Member, MemberId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Index, Mul, Sub};

/// Position of a member in the graph's arena; stable for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberIndex(pub usize);

impl fmt::Display for MemberIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Non-fatal findings from a graph build. None of these stop the build; the
/// offending reference is simply left out of the edge set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphDiagnostic {
    DuplicateMember { id: MemberId },
    SelfParent { member: MemberId },
    DanglingParent { member: MemberId, parent: MemberId },
    DuplicateParent { member: MemberId, parent: MemberId },
}

impl fmt::Display for GraphDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMember { id } => write!(f, "member id {id} appears more than once"),
            Self::SelfParent { member } => write!(f, "member {member} lists itself as parent"),
            Self::DanglingParent { member, parent } => {
                write!(f, "member {member} references missing parent {parent}")
            }
            Self::DuplicateParent { member, parent } => {
                write!(f, "member {member} lists parent {parent} twice")
            }
        }
    }
}

/// Parent/child graph derived from one snapshot of a tree's members.
///
/// Members live in an arena in input order; every relation is an index into
/// that arena, so there are no reference cycles even when the data has them.
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    members: Vec<Member>,
    index: HashMap<MemberId, MemberIndex>,
    parents: Vec<Vec<MemberIndex>>,
    children: Vec<Vec<MemberIndex>>,
    roots: Vec<MemberIndex>,
    diagnostics: Vec<GraphDiagnostic>,
}

impl FamilyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(source: &[Member]) -> Self {
        let mut members: Vec<Member> = Vec::with_capacity(source.len());
        let mut index = HashMap::with_capacity(source.len());
        let mut diagnostics = Vec::new();

        for member in source {
            if index.contains_key(&member.id) {
                tracing::warn!("Dropping duplicate member record {}", member.id);
                diagnostics.push(GraphDiagnostic::DuplicateMember {
                    id: member.id.clone(),
                });
                continue;
            }
            index.insert(member.id.clone(), MemberIndex(members.len()));
            members.push(member.clone());
        }

        let mut parents: Vec<Vec<MemberIndex>> = vec![Vec::new(); members.len()];
        let mut children: Vec<Vec<MemberIndex>> = vec![Vec::new(); members.len()];

        for (i, member) in members.iter().enumerate() {
            for parent_ref in member.parent_refs().into_iter().flatten() {
                if parent_ref.is_unset() {
                    continue;
                }
                if parent_ref == &member.id {
                    tracing::warn!("Dropping self-parent reference on member {}", member.id);
                    diagnostics.push(GraphDiagnostic::SelfParent {
                        member: member.id.clone(),
                    });
                    continue;
                }
                let Some(&parent_idx) = index.get(parent_ref) else {
                    tracing::warn!(
                        "Dropping parent edge {} -> {} because the parent is missing from the tree",
                        parent_ref,
                        member.id
                    );
                    diagnostics.push(GraphDiagnostic::DanglingParent {
                        member: member.id.clone(),
                        parent: parent_ref.clone(),
                    });
                    continue;
                };
                if parents[i].contains(&parent_idx) {
                    diagnostics.push(GraphDiagnostic::DuplicateParent {
                        member: member.id.clone(),
                        parent: parent_ref.clone(),
                    });
                    continue;
                }
                parents[i].push(parent_idx);
                children[parent_idx.0].push(MemberIndex(i));
            }
        }

        let roots = (0..members.len())
            .filter(|&i| parents[i].is_empty())
            .map(MemberIndex)
            .collect::<Vec<_>>();

        tracing::debug!(
            members = members.len(),
            roots = roots.len(),
            diagnostics = diagnostics.len(),
            "Built family graph"
        );

        Self {
            members,
            index,
            parents,
            children,
            roots,
            diagnostics,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = MemberIndex> + '_ {
        (0..self.members.len()).map(MemberIndex)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, idx: MemberIndex) -> Option<&Member> {
        self.members.get(idx.0)
    }

    pub fn get(&self, id: &MemberId) -> Option<&Member> {
        self.index_of(id).map(|idx| &self.members[idx.0])
    }

    pub fn index_of(&self, id: &MemberId) -> Option<MemberIndex> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &MemberId) -> bool {
        self.index.contains_key(id)
    }

    /// Resolved parents in slot order (parent 1 first).
    pub fn parents_of(&self, idx: MemberIndex) -> &[MemberIndex] {
        self.parents.get(idx.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Children in member order.
    pub fn children_of(&self, idx: MemberIndex) -> &[MemberIndex] {
        self.children.get(idx.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[MemberIndex] {
        &self.roots
    }

    pub fn root_ids(&self) -> Vec<MemberId> {
        self.roots
            .iter()
            .map(|&idx| self.members[idx.0].id.clone())
            .collect()
    }

    pub fn diagnostics(&self) -> &[GraphDiagnostic] {
        &self.diagnostics
    }

    /// Every valid `(parent, child)` edge, ordered by child then parent slot.
    pub fn edges(&self) -> impl Iterator<Item = (MemberIndex, MemberIndex)> + '_ {
        self.parents.iter().enumerate().flat_map(|(child, parents)| {
            parents
                .iter()
                .map(move |&parent| (parent, MemberIndex(child)))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.parents.iter().map(Vec::len).sum()
    }
}

impl Index<MemberIndex> for FamilyGraph {
    type Output = Member;
    fn index(&self, index: MemberIndex) -> &Self::Output {
        &self.members[index.0]
    }
}
