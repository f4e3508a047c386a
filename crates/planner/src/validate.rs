//! Request-mode primary-path validation.
//!
//! The request row enters the plan at exactly one base table; every join or
//! union along the way must lead both sides back to that same table node.
//! The validator returns the id of that node so the transformer can emit a
//! `FetchRequest` for it and plain scans for everything else.

use common::{EngineError, EngineResult};
use plan::{PlanArena, PlanId, PlanNode};
use tracing::warn;

/// Walk the plan from `root` and return the unique primary `Table` node.
pub fn validate_primary_path(arena: &PlanArena, root: PlanId) -> EngineResult<PlanId> {
    match arena.node(root) {
        PlanNode::Table { .. } => Ok(root),
        PlanNode::Join { left, right, .. } | PlanNode::Union { left, right, .. } => {
            let left_primary = validate_primary_path(arena, *left)?;
            let right_primary = validate_primary_path(arena, *right)?;
            if left_primary == right_primary {
                Ok(left_primary)
            } else {
                let msg =
                    "primary path validate fail: left path and right path has different source";
                warn!("{msg}");
                Err(EngineError::Plan(msg.into()))
            }
        }
        PlanNode::Create { .. } | PlanNode::Insert { .. } | PlanNode::Cmd { .. } => {
            let msg = "primary path validate fail: invalid node of primary path";
            warn!("{msg}");
            Err(EngineError::Plan(msg.into()))
        }
        PlanNode::Query { input }
        | PlanNode::Rename { input, .. }
        | PlanNode::Filter { input, .. }
        | PlanNode::Project { input, .. }
        | PlanNode::Group { input, .. }
        | PlanNode::Sort { input, .. }
        | PlanNode::Limit { input, .. }
        | PlanNode::Distinct { input } => validate_primary_path(arena, *input),
    }
}
