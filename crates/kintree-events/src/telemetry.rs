//! Structured log records for controller operations.
//!
//! Every operation gets a [`Span`] carrying a correlation id; start, finish
//! and failure lines share it so one rebuild can be followed through the log.

use kintree_graph::{DepthTable, FamilyGraph};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const TELEMETRY_TARGET: &str = "kintree::events::telemetry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    MembersChanged,
    StoriesChanged,
    SetLayoutMode,
    Resize,
    SelectMember,
    AdvanceFrame,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MembersChanged => "members_changed",
            Self::StoriesChanged => "stories_changed",
            Self::SetLayoutMode => "set_layout_mode",
            Self::Resize => "viewport_resized",
            Self::SelectMember => "member_selected",
            Self::AdvanceFrame => "advance_frame",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a freshly built graph and its depth table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub members: usize,
    pub edges: usize,
    pub roots: usize,
    pub generations: u32,
    /// Dropped or duplicate references found while building.
    pub graph_diagnostics: usize,
    /// Parent edges ignored because they closed a cycle.
    pub cycle_edges: usize,
}

impl BuildStats {
    pub fn collect(graph: &FamilyGraph, depths: &DepthTable) -> Self {
        Self {
            members: graph.len(),
            edges: graph.edge_count(),
            roots: graph.roots().len(),
            generations: if graph.is_empty() {
                0
            } else {
                depths.max_depth() + 1
            },
            graph_diagnostics: graph.diagnostics().len(),
            cycle_edges: depths.diagnostics().len(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.graph_diagnostics == 0 && self.cycle_edges == 0
    }
}

/// One in-flight operation. Consumed by [`Span::finish`] or [`Span::fail`].
#[derive(Debug)]
pub struct Span {
    operation: Operation,
    correlation_id: Uuid,
    started: Instant,
}

impl Span {
    pub fn start(operation: Operation) -> Self {
        let span = Self {
            operation,
            correlation_id: Uuid::new_v4(),
            started: Instant::now(),
        };
        tracing::debug!(
            target: TELEMETRY_TARGET,
            operation = %span.operation,
            correlation_id = %span.correlation_id,
            "operation_start"
        );
        span
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn record_build(&self, stats: &BuildStats) {
        if !stats.is_clean() {
            tracing::warn!(
                target: TELEMETRY_TARGET,
                operation = %self.operation,
                correlation_id = %self.correlation_id,
                members = stats.members,
                edges = stats.edges,
                graph_diagnostics = stats.graph_diagnostics,
                cycle_edges = stats.cycle_edges,
                "graph_built_with_diagnostics"
            );
        } else {
            tracing::debug!(
                target: TELEMETRY_TARGET,
                operation = %self.operation,
                correlation_id = %self.correlation_id,
                members = stats.members,
                edges = stats.edges,
                roots = stats.roots,
                generations = stats.generations,
                "graph_built"
            );
        }
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        tracing::info!(
            target: TELEMETRY_TARGET,
            operation = %self.operation,
            correlation_id = %self.correlation_id,
            duration_ms = elapsed.as_millis() as u64,
            "operation_success"
        );
        elapsed
    }

    pub fn fail(self, reason: &str) {
        tracing::error!(
            target: TELEMETRY_TARGET,
            operation = %self.operation,
            correlation_id = %self.correlation_id,
            error = %reason,
            "operation_failure"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kintree_core::Member;

    #[test]
    fn spans_get_distinct_correlation_ids() {
        let a = Span::start(Operation::Resize);
        let b = Span::start(Operation::Resize);
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert_eq!(a.operation().to_string(), "viewport_resized");
        a.finish();
        b.fail("boom");
    }

    #[test]
    fn build_stats_count_graph_shape() {
        let members = vec![
            Member::named("1", "Marie", "Dupont"),
            Member::named("2", "Jean", "Dupont").with_parents(Some("1"), Some("404")),
            Member::named("3", "Luc", "Dupont").with_parents(Some("2"), None),
        ];
        let graph = FamilyGraph::build(&members);
        let depths = DepthTable::compute(&graph);
        let stats = BuildStats::collect(&graph, &depths);

        assert_eq!(stats.members, 3);
        assert_eq!(stats.edges, 2);
        assert_eq!(stats.roots, 1);
        assert_eq!(stats.generations, 3);
        assert_eq!(stats.graph_diagnostics, 1);
        assert_eq!(stats.cycle_edges, 0);
        assert!(!stats.is_clean());

        let empty = FamilyGraph::new();
        let stats = BuildStats::collect(&empty, &DepthTable::compute(&empty));
        assert_eq!(stats, BuildStats::default());
        assert!(stats.is_clean());
    }
}
