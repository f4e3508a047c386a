//! Textual dump of a physical DAG for debugging and golden-file tests.

use crate::physical::{PhysId, PhysicalArena};
use std::fmt::Write;

/// Deterministic indented rendering of the DAG rooted at `root`.
///
/// Each line carries the operator's kind, payload summary and arena id;
/// a producer shared by two parents shows up once per parent with the same
/// id, which makes DAG identity visible in the output.
pub fn explain(arena: &PhysicalArena, root: PhysId) -> String {
    let mut out = String::new();
    fmt_node(arena, root, 0, &mut out);
    out
}

fn fmt_node(arena: &PhysicalArena, id: PhysId, depth: usize, out: &mut String) {
    let node = arena.node(id);
    for _ in 0..depth {
        out.push_str("  ");
    }
    let _ = writeln!(out, "{}#{id}", node.op);
    for producer in &node.producers {
        fmt_node(arena, *producer, depth + 1, out);
    }
}
