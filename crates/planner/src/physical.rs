//! Physical operator model and the arena that owns it.
//!
//! Operators form a DAG: a node references its upstream producers by
//! [`PhysId`], never by ownership. The arena hands out dense ids and no
//! operation on it invalidates an id it already returned. Each node's
//! output schema is derived once, at registration, from its kind, payload
//! and producer schemas.

use catalog::TableHandler;
use common::Schema;
use expr::{Expr, OrderBy};
use plan::JoinType;
use std::fmt;
use std::sync::Arc;

/// Stable handle to a node inside a [`PhysicalArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysId(pub u32);

impl fmt::Display for PhysId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminant of a physical operator, for pass matching and display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    ScanTable,
    ScanIndex,
    FetchRequest,
    Filter,
    ProjectRow,
    Aggregation,
    WindowAggregation,
    Group,
    Sort,
    Join,
    Union,
    Rename,
    Limit,
    Distinct,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::ScanTable => "ScanTable",
            OpKind::ScanIndex => "ScanIndex",
            OpKind::FetchRequest => "FetchRequest",
            OpKind::Filter => "Filter",
            OpKind::ProjectRow => "ProjectRow",
            OpKind::Aggregation => "Aggregation",
            OpKind::WindowAggregation => "WindowAggregation",
            OpKind::Group => "Group",
            OpKind::Sort => "Sort",
            OpKind::Join => "Join",
            OpKind::Union => "Union",
            OpKind::Rename => "Rename",
            OpKind::Limit => "Limit",
            OpKind::Distinct => "Distinct",
        };
        f.write_str(name)
    }
}

/// Physical operator with its typed payload.
///
/// The three projection kinds carry the output schema the projection
/// compiler derived for them; every other kind's schema is a pure function
/// of its payload and producer schemas.
#[derive(Clone, Debug)]
pub enum PhysicalOp {
    ScanTable {
        table: Arc<TableHandler>,
    },
    ScanIndex {
        table: Arc<TableHandler>,
        index_name: String,
    },
    /// Single-row fetch on the primary path in request mode.
    FetchRequest {
        table: Arc<TableHandler>,
    },
    Filter {
        condition: Expr,
    },
    ProjectRow {
        fn_name: String,
        schema: Schema,
    },
    Aggregation {
        fn_name: String,
        schema: Schema,
    },
    WindowAggregation {
        fn_name: String,
        schema: Schema,
        start: i64,
        end: i64,
    },
    Group {
        keys: Vec<Expr>,
    },
    Sort {
        order: OrderBy,
    },
    Join {
        join_type: JoinType,
        condition: Option<Expr>,
    },
    Union {
        is_all: bool,
    },
    Rename {
        alias: String,
    },
    Limit {
        count: u64,
    },
    Distinct,
}

impl PhysicalOp {
    pub fn kind(&self) -> OpKind {
        match self {
            PhysicalOp::ScanTable { .. } => OpKind::ScanTable,
            PhysicalOp::ScanIndex { .. } => OpKind::ScanIndex,
            PhysicalOp::FetchRequest { .. } => OpKind::FetchRequest,
            PhysicalOp::Filter { .. } => OpKind::Filter,
            PhysicalOp::ProjectRow { .. } => OpKind::ProjectRow,
            PhysicalOp::Aggregation { .. } => OpKind::Aggregation,
            PhysicalOp::WindowAggregation { .. } => OpKind::WindowAggregation,
            PhysicalOp::Group { .. } => OpKind::Group,
            PhysicalOp::Sort { .. } => OpKind::Sort,
            PhysicalOp::Join { .. } => OpKind::Join,
            PhysicalOp::Union { .. } => OpKind::Union,
            PhysicalOp::Rename { .. } => OpKind::Rename,
            PhysicalOp::Limit { .. } => OpKind::Limit,
            PhysicalOp::Distinct => OpKind::Distinct,
        }
    }
}

impl fmt::Display for PhysicalOp {
    /// Kind plus payload summary, e.g. `ScanIndex(table=db1.t1, index=index12)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalOp::ScanTable { table } => {
                write!(f, "ScanTable(table={})", table.full_name())
            }
            PhysicalOp::ScanIndex { table, index_name } => {
                write!(
                    f,
                    "ScanIndex(table={}, index={index_name})",
                    table.full_name()
                )
            }
            PhysicalOp::FetchRequest { table } => {
                write!(f, "FetchRequest(table={})", table.full_name())
            }
            PhysicalOp::Filter { condition } => write!(f, "Filter({condition})"),
            PhysicalOp::ProjectRow { fn_name, .. } => write!(f, "ProjectRow(fn={fn_name})"),
            PhysicalOp::Aggregation { fn_name, .. } => {
                write!(f, "Aggregation(fn={fn_name})")
            }
            PhysicalOp::WindowAggregation {
                fn_name,
                start,
                end,
                ..
            } => write!(
                f,
                "WindowAggregation(fn={fn_name}, start={start}, end={end})"
            ),
            PhysicalOp::Group { keys } => {
                f.write_str("Group(")?;
                for (i, k) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}")?;
                }
                f.write_str(")")
            }
            PhysicalOp::Sort { order } => write!(f, "Sort({order})"),
            PhysicalOp::Join {
                join_type,
                condition: Some(cond),
            } => write!(f, "Join(type={join_type}, on={cond})"),
            PhysicalOp::Join {
                join_type,
                condition: None,
            } => write!(f, "Join(type={join_type})"),
            PhysicalOp::Union { is_all: true } => f.write_str("Union(all)"),
            PhysicalOp::Union { is_all: false } => f.write_str("Union(distinct)"),
            PhysicalOp::Rename { alias } => write!(f, "Rename(alias={alias})"),
            PhysicalOp::Limit { count } => write!(f, "Limit({count})"),
            PhysicalOp::Distinct => f.write_str("Distinct"),
        }
    }
}

/// One node of the physical DAG.
#[derive(Clone, Debug)]
pub struct PhysicalNode {
    pub op: PhysicalOp,
    pub producers: Vec<PhysId>,
    pub schema: Schema,
}

/// Common read surface over physical nodes.
pub trait Operator {
    fn kind(&self) -> OpKind;
    fn producers(&self) -> &[PhysId];
    fn output_schema(&self) -> &Schema;
}

impl Operator for PhysicalNode {
    fn kind(&self) -> OpKind {
        self.op.kind()
    }

    fn producers(&self) -> &[PhysId] {
        &self.producers
    }

    fn output_schema(&self) -> &Schema {
        &self.schema
    }
}

/// Owning arena for physical nodes, created per compilation and dropped
/// with the transformer. Single-threaded by design.
#[derive(Debug, Default)]
pub struct PhysicalArena {
    nodes: Vec<PhysicalNode>,
}

impl PhysicalArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register an operator, deriving its output schema from the
    /// payload and the producers' schemas.
    pub fn add(&mut self, op: PhysicalOp, producers: Vec<PhysId>) -> PhysId {
        let schema = self.derive_schema(&op, &producers);
        self.register(PhysicalNode {
            op,
            producers,
            schema,
        })
    }

    /// Take ownership of a fully-built node. The returned id stays valid for
    /// the arena's whole lifetime.
    pub fn register(&mut self, node: PhysicalNode) -> PhysId {
        let id = PhysId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: PhysId) -> &PhysicalNode {
        &self.nodes[id.0 as usize]
    }

    /// Swap one producer slot of a node. Used by the bottom-up pass walker;
    /// rewrites preserve the producer's output schema, so the node's own
    /// schema stays valid.
    pub fn update_producer(&mut self, id: PhysId, slot: usize, producer: PhysId) {
        self.nodes[id.0 as usize].producers[slot] = producer;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PhysId, &PhysicalNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (PhysId(i as u32), n))
    }

    fn derive_schema(&self, op: &PhysicalOp, producers: &[PhysId]) -> Schema {
        match op {
            PhysicalOp::ScanTable { table }
            | PhysicalOp::ScanIndex { table, .. }
            | PhysicalOp::FetchRequest { table } => table.schema().clone(),
            PhysicalOp::ProjectRow { schema, .. }
            | PhysicalOp::Aggregation { schema, .. }
            | PhysicalOp::WindowAggregation { schema, .. } => schema.clone(),
            PhysicalOp::Join { .. } => self
                .node(producers[0])
                .schema
                .concat(&self.node(producers[1]).schema),
            PhysicalOp::Union { .. } => self.node(producers[0]).schema.clone(),
            PhysicalOp::Filter { .. }
            | PhysicalOp::Group { .. }
            | PhysicalOp::Sort { .. }
            | PhysicalOp::Rename { .. }
            | PhysicalOp::Limit { .. }
            | PhysicalOp::Distinct => self.node(producers[0]).schema.clone(),
        }
    }
}
