//! Vertex/edge view of a logical plan.
//!
//! Built once per compilation before translation starts; the walk doubles
//! as the structural sanity check, rejecting dangling child ids and cycles.

use crate::{PlanArena, PlanId};
use common::{EngineError, EngineResult};

/// Adjacency view of the logical DAG reachable from a root.
#[derive(Debug)]
pub struct LogicalGraph {
    vertices: Vec<PlanId>,
    edges: Vec<(PlanId, PlanId)>,
}

impl LogicalGraph {
    /// Walk the plan from `root`, collecting vertices and parent→child
    /// edges. A shared subplan is one vertex with several incoming edges; a
    /// back edge is a cycle and is rejected with an `OpGen` error.
    pub fn from_plan(arena: &PlanArena, root: PlanId) -> EngineResult<Self> {
        if !arena.contains(root) {
            return Err(EngineError::OpGen(format!(
                "root node {root} is not in the plan arena"
            )));
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; arena.len()];
        let mut vertices = Vec::new();
        let mut edges = Vec::new();
        // (node, next child ordinal) pairs, explicit stack instead of recursion
        let mut stack: Vec<(PlanId, usize)> = vec![(root, 0)];
        marks[root.0 as usize] = Mark::OnStack;
        vertices.push(root);

        while let Some((node, child_pos)) = stack.pop() {
            let children = arena.node(node).children();
            if child_pos == children.len() {
                marks[node.0 as usize] = Mark::Done;
                continue;
            }
            stack.push((node, child_pos + 1));

            let child = children[child_pos];
            if !arena.contains(child) {
                return Err(EngineError::OpGen(format!(
                    "node {node} references missing child {child}"
                )));
            }
            edges.push((node, child));
            match marks[child.0 as usize] {
                Mark::OnStack => {
                    return Err(EngineError::OpGen(format!(
                        "cycle through node {child} in logical plan"
                    )));
                }
                Mark::Done => {}
                Mark::Unvisited => {
                    marks[child.0 as usize] = Mark::OnStack;
                    vertices.push(child);
                    stack.push((child, 0));
                }
            }
        }

        Ok(Self { vertices, edges })
    }

    pub fn vertices(&self) -> &[PlanId] {
        &self.vertices
    }

    pub fn edges(&self) -> &[(PlanId, PlanId)] {
        &self.edges
    }
}
