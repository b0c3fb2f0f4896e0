//! Derived family relations for a single member.

use crate::depth::DepthTable;
use crate::graph::{FamilyGraph, MemberIndex};
use kintree_core::{Member, MemberId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Everything the relations panel shows for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationSet {
    pub member: Member,
    pub parents: Vec<Member>,
    /// Anyone sharing at least one parent; half-siblings included.
    pub siblings: Vec<Member>,
    pub children: Vec<Member>,
    pub descendants_by_generation: BTreeMap<u32, Vec<Member>>,
    /// Number of generations below this member (0 when childless).
    pub degree: u32,
    /// Other parents of this member's children.
    pub co_parents: Vec<Member>,
    pub cousins: Vec<Member>,
}

impl RelationSet {
    /// True when nothing at all is known about this member's family.
    pub fn is_isolated(&self) -> bool {
        self.parents.is_empty()
            && self.siblings.is_empty()
            && self.children.is_empty()
            && self.degree == 0
    }

    pub fn descendant_count(&self) -> usize {
        self.descendants_by_generation.values().map(Vec::len).sum()
    }
}

/// Read-only relation queries over one graph build.
#[derive(Debug, Clone, Copy)]
pub struct RelationQuery<'a> {
    graph: &'a FamilyGraph,
    depths: &'a DepthTable,
}

impl<'a> RelationQuery<'a> {
    pub fn new(graph: &'a FamilyGraph, depths: &'a DepthTable) -> Self {
        Self { graph, depths }
    }

    pub fn relations(&self, id: &MemberId) -> Option<RelationSet> {
        let idx = self.graph.index_of(id)?;
        let descendants = self.descendants(idx);
        let degree = descendants.keys().next_back().copied().unwrap_or(0);

        Some(RelationSet {
            member: self.graph[idx].clone(),
            parents: self.materialize(self.parents(idx)),
            siblings: self.materialize(&self.siblings(idx)),
            children: self.materialize(self.children(idx)),
            descendants_by_generation: descendants
                .into_iter()
                .map(|(generation, members)| (generation, self.materialize(&members)))
                .collect(),
            degree,
            co_parents: self.materialize(&self.co_parents(idx)),
            cousins: self.materialize(&self.cousins(idx)),
        })
    }

    fn materialize(&self, indices: &[MemberIndex]) -> Vec<Member> {
        indices.iter().map(|&i| self.graph[i].clone()).collect()
    }

    pub fn parents(&self, idx: MemberIndex) -> &'a [MemberIndex] {
        self.graph.parents_of(idx)
    }

    pub fn children(&self, idx: MemberIndex) -> &'a [MemberIndex] {
        self.graph.children_of(idx)
    }

    pub fn siblings(&self, idx: MemberIndex) -> Vec<MemberIndex> {
        let mut seen = HashSet::new();
        let mut siblings = Vec::new();
        for &parent in self.graph.parents_of(idx) {
            for &child in self.graph.children_of(parent) {
                if child != idx && seen.insert(child) {
                    siblings.push(child);
                }
            }
        }
        siblings.sort_unstable();
        siblings
    }

    /// Breadth-first walk down the child lists. Each member is reported once,
    /// at the lowest generation it is reachable from, so repeated or cyclic
    /// parent chains cannot make this loop.
    pub fn descendants(&self, idx: MemberIndex) -> BTreeMap<u32, Vec<MemberIndex>> {
        let mut by_generation = BTreeMap::new();
        let mut visited: HashSet<MemberIndex> = HashSet::from([idx]);
        let mut frontier: Vec<MemberIndex> = self
            .graph
            .children_of(idx)
            .iter()
            .copied()
            .filter(|&child| visited.insert(child))
            .collect();
        let mut generation = 1u32;

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &member in &frontier {
                for &child in self.graph.children_of(member) {
                    if visited.insert(child) {
                        next.push(child);
                    }
                }
            }
            by_generation.insert(generation, frontier);
            frontier = next;
            generation += 1;
        }

        by_generation
    }

    pub fn degree(&self, idx: MemberIndex) -> u32 {
        self.descendants(idx)
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0)
    }

    pub fn co_parents(&self, idx: MemberIndex) -> Vec<MemberIndex> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for &child in self.graph.children_of(idx) {
            for &parent in self.graph.parents_of(child) {
                if parent != idx && seen.insert(parent) {
                    result.push(parent);
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Same-generation members who share a grandparent but no parent.
    pub fn cousins(&self, idx: MemberIndex) -> Vec<MemberIndex> {
        let own_parents: HashSet<MemberIndex> = self.graph.parents_of(idx).iter().copied().collect();
        let own_depth = self.depths.get(idx);
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for &parent in self.graph.parents_of(idx) {
            for &grandparent in self.graph.parents_of(parent) {
                for &uncle in self.graph.children_of(grandparent) {
                    if own_parents.contains(&uncle) {
                        continue;
                    }
                    for &cousin in self.graph.children_of(uncle) {
                        if cousin == idx || !seen.insert(cousin) {
                            continue;
                        }
                        let shares_parent = self
                            .graph
                            .parents_of(cousin)
                            .iter()
                            .any(|p| own_parents.contains(p));
                        if !shares_parent && self.depths.get(cousin) == own_depth {
                            result.push(cousin);
                        }
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }
}
