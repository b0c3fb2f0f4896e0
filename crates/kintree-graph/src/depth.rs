use crate::graph::{FamilyGraph, MemberIndex};
use kintree_core::MemberId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepthDiagnostic {
    /// `member -> parent` closes a cycle and was ignored for depth purposes.
    CycleEdge { member: MemberId, parent: MemberId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    OnPath,
    Done(u32),
}

/// Generation number of every member, computed once per graph build.
///
/// Roots are generation 0; anyone else sits one below their deepest parent.
#[derive(Debug, Clone, Default)]
pub struct DepthTable {
    depths: Vec<u32>,
    max_depth: u32,
    diagnostics: Vec<DepthDiagnostic>,
}

impl DepthTable {
    pub fn compute(graph: &FamilyGraph) -> Self {
        let n = graph.len();
        let mut marks = vec![Mark::New; n];
        // Deepest finished parent seen so far for each node on the stack; -1 = none.
        let mut best: Vec<i64> = vec![-1; n];
        let mut diagnostics = Vec::new();

        for start in graph.indices() {
            if marks[start.0] != Mark::New {
                continue;
            }

            marks[start.0] = Mark::OnPath;
            let mut stack: Vec<(MemberIndex, usize)> = vec![(start, 0)];

            while let Some(&(node, next_parent)) = stack.last() {
                let parents = graph.parents_of(node);
                if let Some(&parent) = parents.get(next_parent) {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match marks[parent.0] {
                        Mark::Done(depth) => {
                            best[node.0] = best[node.0].max(i64::from(depth));
                        }
                        Mark::OnPath => {
                            tracing::warn!(
                                "Ignoring parent edge {} -> {} because it closes a cycle",
                                graph[parent].id,
                                graph[node].id
                            );
                            diagnostics.push(DepthDiagnostic::CycleEdge {
                                member: graph[node].id.clone(),
                                parent: graph[parent].id.clone(),
                            });
                        }
                        Mark::New => {
                            marks[parent.0] = Mark::OnPath;
                            stack.push((parent, 0));
                        }
                    }
                    continue;
                }

                stack.pop();
                let depth = u32::try_from(best[node.0] + 1).unwrap_or(0);
                marks[node.0] = Mark::Done(depth);
                if let Some(&(child, _)) = stack.last() {
                    best[child.0] = best[child.0].max(i64::from(depth));
                }
            }
        }

        let depths: Vec<u32> = marks
            .into_iter()
            .map(|mark| match mark {
                Mark::Done(depth) => depth,
                Mark::New | Mark::OnPath => 0,
            })
            .collect();
        let max_depth = depths.iter().copied().max().unwrap_or(0);

        Self {
            depths,
            max_depth,
            diagnostics,
        }
    }

    pub fn get(&self, idx: MemberIndex) -> u32 {
        self.depths.get(idx.0).copied().unwrap_or(0)
    }

    pub fn depth_of(&self, graph: &FamilyGraph, id: &MemberId) -> Option<u32> {
        graph.index_of(id).map(|idx| self.get(idx))
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn diagnostics(&self) -> &[DepthDiagnostic] {
        &self.diagnostics
    }

    /// Members grouped by depth, each level in member order.
    pub fn levels(&self) -> Vec<Vec<MemberIndex>> {
        if self.depths.is_empty() {
            return Vec::new();
        }
        let mut levels = vec![Vec::new(); self.max_depth as usize + 1];
        for (i, &depth) in self.depths.iter().enumerate() {
            levels[depth as usize].push(MemberIndex(i));
        }
        levels
    }
}
