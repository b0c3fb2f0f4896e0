use super::{LayoutError, LayoutOutput, LayoutPosition, Layouter, LinkView, Viewport, link_view};
use crate::depth::DepthTable;
use crate::edge_router::{CubicBezier, LinkPath};
use crate::graph::{FamilyGraph, MemberIndex, Vec2};
use kintree_core::MemberId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalSettings {
    /// Vertical distance between two generations.
    pub level_spacing: f32,
    pub top_margin: f32,
    pub min_width: f32,
    pub min_height: f32,
}

impl Default for HierarchicalSettings {
    fn default() -> Self {
        Self {
            level_spacing: 120.0,
            top_margin: 60.0,
            min_width: 320.0,
            min_height: 240.0,
        }
    }
}

fn curved(from: Vec2, to: Vec2) -> LinkPath {
    LinkPath::Curve(CubicBezier::vertical(from, to))
}

/// Stateless one-shot generation-banded layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalLayouter {
    pub settings: HierarchicalSettings,
}

impl Layouter for HierarchicalLayouter {
    fn execute(
        &self,
        graph: &FamilyGraph,
        depths: &DepthTable,
        viewport: Viewport,
    ) -> Result<LayoutOutput, LayoutError> {
        Ok(HierarchicalLayout::new(graph, depths, self.settings, viewport).output(graph))
    }
}

/// Generation-banded positions plus drag state.
///
/// Each depth level is a horizontal band; members of a level are spread
/// evenly across the width in member order, so the same input always gives
/// the same picture.
#[derive(Debug, Clone)]
pub struct HierarchicalLayout {
    settings: HierarchicalSettings,
    viewport: Viewport,
    positions: Vec<LayoutPosition>,
}

impl HierarchicalLayout {
    pub fn new(
        graph: &FamilyGraph,
        depths: &DepthTable,
        settings: HierarchicalSettings,
        viewport: Viewport,
    ) -> Self {
        let mut layout = Self {
            settings,
            viewport: viewport.sanitized(settings.min_width, settings.min_height),
            positions: vec![LayoutPosition::default(); graph.len()],
        };
        layout.arrange(depths);
        layout
    }

    fn arrange(&mut self, depths: &DepthTable) {
        let width = self.viewport.width;
        for (depth, level) in depths.levels().iter().enumerate() {
            let band = width / (level.len() as f32 + 1.0);
            let y = depth as f32 * self.settings.level_spacing + self.settings.top_margin;
            for (i, &idx) in level.iter().enumerate() {
                let Some(pos) = self.positions.get_mut(idx.0) else {
                    continue;
                };
                if !pos.pinned {
                    pos.x = (i as f32 + 1.0) * band;
                }
                pos.y = y;
            }
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn positions(&self) -> &[LayoutPosition] {
        &self.positions
    }

    pub fn position(&self, idx: MemberIndex) -> Option<LayoutPosition> {
        self.positions.get(idx.0).copied()
    }

    /// Re-divides the x bands for a new width. A node held by an active drag
    /// keeps its x.
    pub fn resize(&mut self, depths: &DepthTable, viewport: Viewport) {
        self.viewport = viewport.sanitized(self.settings.min_width, self.settings.min_height);
        self.arrange(depths);
    }

    fn slot(&self, graph: &FamilyGraph, id: &MemberId) -> Result<MemberIndex, LayoutError> {
        graph
            .index_of(id)
            .filter(|idx| idx.0 < self.positions.len())
            .ok_or_else(|| LayoutError::UnknownMember(id.clone()))
    }

    pub fn drag_start(&mut self, graph: &FamilyGraph, id: &MemberId) -> Result<(), LayoutError> {
        let idx = self.slot(graph, id)?;
        self.positions[idx.0].pinned = true;
        Ok(())
    }

    /// Moves a node horizontally; y stays on its generation band. Returns the
    /// links whose geometry changed.
    pub fn drag_move(
        &mut self,
        graph: &FamilyGraph,
        id: &MemberId,
        x: f32,
    ) -> Result<Vec<LinkView>, LayoutError> {
        let idx = self.slot(graph, id)?;
        if x.is_finite() {
            self.positions[idx.0].x = x;
        }
        Ok(self.links_touching(graph, idx))
    }

    pub fn drag_end(&mut self, graph: &FamilyGraph, id: &MemberId) -> Result<(), LayoutError> {
        let idx = self.slot(graph, id)?;
        self.positions[idx.0].pinned = false;
        Ok(())
    }

    pub fn links_touching(&self, graph: &FamilyGraph, idx: MemberIndex) -> Vec<LinkView> {
        let as_child = graph
            .parents_of(idx)
            .iter()
            .map(|&parent| link_view(graph, parent, idx, &self.positions, &curved));
        let as_parent = graph
            .children_of(idx)
            .iter()
            .map(|&child| link_view(graph, idx, child, &self.positions, &curved));
        as_child.chain(as_parent).collect()
    }

    pub fn output(&self, graph: &FamilyGraph) -> LayoutOutput {
        LayoutOutput::assemble(graph, &self.positions, curved)
    }
}
