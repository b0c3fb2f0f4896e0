use crate::depth::DepthTable;
use crate::edge_router::LinkPath;
use crate::graph::{FamilyGraph, MemberIndex, Vec2};
use crate::style::NodeCategory;
use kintree_core::MemberId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod force;
pub mod hierarchical;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Force simulation diverged at member {member} after {ticks} ticks")]
    Diverged { member: MemberId, ticks: usize },
    #[error("Member {0} is not part of the current layout")]
    UnknownMember(MemberId),
}

/// Drawable area handed in by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Replaces zero, negative or non-finite dimensions by the given minimums.
    pub fn sanitized(self, min_width: f32, min_height: f32) -> Self {
        let fix = |value: f32, min: f32| {
            if value.is_finite() && value >= min {
                value
            } else {
                tracing::debug!("Viewport dimension {} unusable, falling back to {}", value, min);
                min
            }
        };
        Self {
            width: fix(self.width, min_width),
            height: fix(self.height, min_height),
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPosition {
    pub x: f32,
    pub y: f32,
    /// Held in place by an active drag.
    pub pinned: bool,
}

impl LayoutPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            pinned: false,
        }
    }

    pub fn point(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: MemberId,
    pub label: String,
    pub category: NodeCategory,
    pub position: LayoutPosition,
}

/// One parent edge, drawn from `source` (parent) to `target` (child).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkView {
    pub source: MemberId,
    pub target: MemberId,
    pub path: LinkPath,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOutput {
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
}

impl LayoutOutput {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position_of(&self, id: &MemberId) -> Option<LayoutPosition> {
        self.nodes
            .iter()
            .find(|node| &node.id == id)
            .map(|node| node.position)
    }

    pub(crate) fn assemble(
        graph: &FamilyGraph,
        positions: &[LayoutPosition],
        route: impl Fn(Vec2, Vec2) -> LinkPath,
    ) -> Self {
        let nodes = graph
            .indices()
            .map(|idx| node_view(graph, idx, positions))
            .collect();
        let links = graph
            .edges()
            .map(|(parent, child)| link_view(graph, parent, child, positions, &route))
            .collect();
        Self { nodes, links }
    }
}

pub(crate) fn node_view(
    graph: &FamilyGraph,
    idx: MemberIndex,
    positions: &[LayoutPosition],
) -> NodeView {
    let member = &graph[idx];
    NodeView {
        id: member.id.clone(),
        label: member.display_name(),
        category: NodeCategory::of(member),
        position: positions.get(idx.0).copied().unwrap_or_default(),
    }
}

pub(crate) fn link_view(
    graph: &FamilyGraph,
    parent: MemberIndex,
    child: MemberIndex,
    positions: &[LayoutPosition],
    route: &impl Fn(Vec2, Vec2) -> LinkPath,
) -> LinkView {
    let from = positions
        .get(parent.0)
        .map(LayoutPosition::point)
        .unwrap_or_default();
    let to = positions
        .get(child.0)
        .map(LayoutPosition::point)
        .unwrap_or_default();
    LinkView {
        source: graph[parent].id.clone(),
        target: graph[child].id.clone(),
        path: route(from, to),
    }
}

pub trait Layouter {
    fn execute(
        &self,
        graph: &FamilyGraph,
        depths: &DepthTable,
        viewport: Viewport,
    ) -> Result<LayoutOutput, LayoutError>;
}
