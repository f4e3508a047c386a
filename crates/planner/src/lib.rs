//! Logical→physical plan transformer and rule-based optimizer.
//!
//! Takes a validated logical plan and produces a physical operator DAG the
//! code generator and runtime can execute, in either batch mode (scan whole
//! tables) or request mode (evaluate one input row against indexed
//! history). A small family of tree rewrites then pushes group/sort work
//! into index scans and below left joins.
//!
//! # Architecture
//!
//! ```text
//! Logical plan (plan::PlanArena)
//!     ↓  transform_batch / transform_request (memoized per logical node)
//! Physical DAG (PhysicalArena)
//!     ↓  run_passes (LeftJoin → GroupBy → SortBy, bottom-up)
//! Optimized physical DAG
//!     ↓
//! Codegen + runtime
//! ```
//!
//! Request mode first runs the primary-path validator, which finds the one
//! base table that carries the request row; that table becomes a
//! `FetchRequest` while every other leaf stays a scan.
//!
//! # Example
//!
//! ```no_run
//! use catalog::Catalog;
//! use plan::{PlanArena, PlanNode};
//! use planner::{explain, Transformer};
//!
//! let catalog = Catalog::new();
//! let mut arena = PlanArena::new();
//! let root = arena.add(PlanNode::Table { name: "t1".into() });
//!
//! let mut transformer = Transformer::new(&arena, &catalog, "db1");
//! transformer.add_default_passes();
//! let physical = transformer.transform_batch(root).unwrap();
//! let physical = transformer.run_passes(physical);
//! println!("{}", explain(transformer.arena(), physical));
//! ```

pub mod codegen;
pub mod explain;
pub mod passes;
pub mod physical;
pub mod transform;
pub mod validate;


pub use codegen::{CodegenRequest, ProjectionCompiler};
pub use explain::explain;
pub use passes::{
    GroupByOptimized, LeftJoinOptimized, PassKind, PassPipeline, PhysicalPass, SortByOptimized,
};
pub use physical::{OpKind, Operator, PhysId, PhysicalArena, PhysicalNode, PhysicalOp};
pub use transform::Transformer;
pub use validate::validate_primary_path;
