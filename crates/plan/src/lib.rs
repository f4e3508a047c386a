//! Logical plan node model.
//!
//! The parser/binder delivers a rooted logical plan; this crate owns its
//! node kinds and the arena they live in. Nodes are immutable once added;
//! a subplan can be shared by several parents simply by reusing its
//! [`PlanId`], which is what lets the transformer preserve DAG identity.

pub mod graph;

use expr::{Expr, OrderBy};
use std::fmt;

/// Stable handle to a node inside a [`PlanArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanId(pub u32);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Join flavors. `Concat` is the keyless, conditionless row-aligned join the
/// transformer synthesizes between per-project-list operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Concat,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "Inner",
            JoinType::Left => "Left",
            JoinType::Right => "Right",
            JoinType::Full => "Full",
            JoinType::Concat => "Concat",
        };
        f.write_str(name)
    }
}

/// One scalar projection with its declared output name.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectNode {
    pub name: String,
    pub expr: Expr,
}

impl ProjectNode {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

/// Window specification shared by the projections of one project-list:
/// partition keys, order keys and the row-range frame offsets.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSpec {
    pub keys: Vec<String>,
    pub orders: Vec<String>,
    pub start: i64,
    pub end: i64,
}

/// A group of projections sharing one optional window.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectList {
    pub projects: Vec<ProjectNode>,
    pub window: Option<WindowSpec>,
    pub is_window_agg: bool,
}

impl ProjectList {
    /// Plain row-level projection list.
    pub fn row(projects: Vec<ProjectNode>) -> Self {
        Self {
            projects,
            window: None,
            is_window_agg: false,
        }
    }

    /// Windowed aggregation list.
    pub fn windowed(projects: Vec<ProjectNode>, window: WindowSpec) -> Self {
        Self {
            projects,
            window: Some(window),
            is_window_agg: true,
        }
    }
}

/// Logical plan node. Unary kinds have exactly one child, binary kinds two,
/// leaves none.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanNode {
    /// Transparent query root.
    Query { input: PlanId },
    Table { name: String },
    Rename { input: PlanId, alias: String },
    Filter { input: PlanId, condition: Expr },
    /// Projection with one or more project-lists. `pos_mapping` gives, for
    /// each output position, the `(list_index, position_within_list)` pair
    /// it is produced by.
    Project {
        input: PlanId,
        lists: Vec<ProjectList>,
        pos_mapping: Vec<(usize, usize)>,
    },
    Group { input: PlanId, keys: Vec<Expr> },
    Sort { input: PlanId, order: OrderBy },
    Join {
        left: PlanId,
        right: PlanId,
        join_type: JoinType,
        condition: Option<Expr>,
    },
    Union {
        left: PlanId,
        right: PlanId,
        is_all: bool,
    },
    Limit { input: PlanId, count: u64 },
    Distinct { input: PlanId },
    // DDL/utility kinds produced upstream; the planner rejects them.
    Create { table: String },
    Insert { table: String },
    Cmd { cmd: String },
}

impl PlanNode {
    /// Ordered children of this node.
    pub fn children(&self) -> Vec<PlanId> {
        match self {
            PlanNode::Query { input }
            | PlanNode::Rename { input, .. }
            | PlanNode::Filter { input, .. }
            | PlanNode::Project { input, .. }
            | PlanNode::Group { input, .. }
            | PlanNode::Sort { input, .. }
            | PlanNode::Limit { input, .. }
            | PlanNode::Distinct { input } => vec![*input],
            PlanNode::Join { left, right, .. } | PlanNode::Union { left, right, .. } => {
                vec![*left, *right]
            }
            PlanNode::Table { .. }
            | PlanNode::Create { .. }
            | PlanNode::Insert { .. }
            | PlanNode::Cmd { .. } => Vec::new(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            PlanNode::Query { .. } => "Query",
            PlanNode::Table { .. } => "Table",
            PlanNode::Rename { .. } => "Rename",
            PlanNode::Filter { .. } => "Filter",
            PlanNode::Project { .. } => "Project",
            PlanNode::Group { .. } => "Group",
            PlanNode::Sort { .. } => "Sort",
            PlanNode::Join { .. } => "Join",
            PlanNode::Union { .. } => "Union",
            PlanNode::Limit { .. } => "Limit",
            PlanNode::Distinct { .. } => "Distinct",
            PlanNode::Create { .. } => "Create",
            PlanNode::Insert { .. } => "Insert",
            PlanNode::Cmd { .. } => "Cmd",
        }
    }
}

/// Owning arena for logical nodes. Ids are dense and never invalidated.
#[derive(Clone, Debug, Default)]
pub struct PlanArena {
    nodes: Vec<PlanNode>,
}

impl PlanArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: PlanNode) -> PlanId {
        let id = PlanId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: PlanId) -> &PlanNode {
        &self.nodes[id.0 as usize]
    }

    /// Replace a node in place. Upstream rewrites use this; the id keeps
    /// pointing at the replacement.
    pub fn replace(&mut self, id: PlanId, node: PlanNode) {
        self.nodes[id.0 as usize] = node;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: PlanId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }
}
