//! Rule-based rewrites over the physical DAG.
//!
//! Each pass is a value implementing [`PhysicalPass`]; the trait's provided
//! `apply` is the shared bottom-up walker. A pass that does not match a node
//! returns `None`; no-rewrite is never an error. Every rule strictly
//! shrinks something (tree height, sort keys or group keys), so one sweep
//! per pass terminates and a second run of the pipeline leaves the DAG
//! unchanged.

use crate::physical::{PhysId, PhysicalArena, PhysicalOp};
use catalog::IndexHint;
use expr::{Expr, OrderBy};
use plan::JoinType;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Pass selector kept by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassKind {
    LeftJoinOptimized,
    GroupByOptimized,
    SortByOptimized,
}

/// A bottom-up rewrite over physical nodes.
pub trait PhysicalPass {
    /// Offer one node to the pass. `Some(id)` replaces the node in its
    /// parent's producer slot (or as the root).
    fn rewrite(&mut self, arena: &mut PhysicalArena, id: PhysId) -> Option<PhysId>;

    /// Shared walker: rewrite producers first, patching the producer slots
    /// in place, then offer the node itself.
    fn apply(&mut self, arena: &mut PhysicalArena, id: PhysId) -> Option<PhysId> {
        for slot in 0..arena.node(id).producers.len() {
            let producer = arena.node(id).producers[slot];
            if let Some(new_producer) = self.apply(arena, producer) {
                arena.update_producer(id, slot, new_producer);
            }
        }
        self.rewrite(arena, id)
    }
}

/// Fold a `Group` over a full table scan into an index scan when some index
/// covers a subset of the group keys. Matched key columns leave the group;
/// an emptied group disappears entirely.
pub struct GroupByOptimized;

impl PhysicalPass for GroupByOptimized {
    fn rewrite(&mut self, arena: &mut PhysicalArena, id: PhysId) -> Option<PhysId> {
        let node = arena.node(id);
        let PhysicalOp::Group { keys } = &node.op else {
            return None;
        };
        let keys = keys.clone();
        let producer = node.producers[0];
        let PhysicalOp::ScanTable { table } = &arena.node(producer).op else {
            return None;
        };
        let table = table.clone();

        let columns: Vec<String> = keys
            .iter()
            .filter_map(|k| k.as_column_name().map(str::to_string))
            .collect();
        if columns.is_empty() {
            return None;
        }

        let mut bitmap = vec![true; columns.len()];
        let index_name = match_best_index(&columns, table.index(), &mut bitmap)?;
        let index_keys: BTreeSet<&str> = table
            .index()
            .get(&index_name)?
            .keys
            .iter()
            .map(String::as_str)
            .collect();

        // Matched key columns are covered by the index; everything else
        // (unmatched columns, non-column expressions) survives.
        let residual: Vec<Expr> = keys
            .iter()
            .filter(|k| match k.as_column_name() {
                Some(name) => !index_keys.contains(name),
                None => true,
            })
            .cloned()
            .collect();

        debug!(index = %index_name, "group by folded into index scan");
        let scan = arena.add(
            PhysicalOp::ScanIndex {
                table,
                index_name,
            },
            Vec::new(),
        );
        if residual.is_empty() {
            Some(scan)
        } else {
            Some(arena.add(PhysicalOp::Group { keys: residual }, vec![scan]))
        }
    }
}

/// Exact-match an index against the enabled group-key columns; otherwise
/// drop one column at a time and recurse, keeping the widest matching index.
fn match_best_index(
    columns: &[String],
    hint: &IndexHint,
    bitmap: &mut Vec<bool>,
) -> Option<String> {
    let enabled: BTreeSet<&str> = columns
        .iter()
        .zip(bitmap.iter())
        .filter(|(_, on)| **on)
        .map(|(c, _)| c.as_str())
        .collect();
    if enabled.is_empty() {
        return None;
    }

    let mut indexes: Vec<_> = hint.values().collect();
    indexes.sort_by(|a, b| a.name.cmp(&b.name));
    for index in &indexes {
        let keys: BTreeSet<&str> = index.keys.iter().map(String::as_str).collect();
        if keys == enabled {
            return Some(index.name.clone());
        }
    }

    let mut best: Option<String> = None;
    for i in 0..bitmap.len() {
        if !bitmap[i] {
            continue;
        }
        bitmap[i] = false;
        if let Some(name) = match_best_index(columns, hint, bitmap) {
            best = match best {
                None => Some(name),
                Some(current) => {
                    let current_len = hint.get(&current).map_or(0, |s| s.keys.len());
                    let found_len = hint.get(&name).map_or(0, |s| s.keys.len());
                    if current_len < found_len {
                        Some(name)
                    } else {
                        Some(current)
                    }
                }
            };
        }
        bitmap[i] = true;
    }
    best
}

/// Drop the index's time-sort column from a `Sort` directly above an index
/// scan; the scan already delivers rows in that order. An emptied sort
/// disappears.
pub struct SortByOptimized;

impl PhysicalPass for SortByOptimized {
    fn rewrite(&mut self, arena: &mut PhysicalArena, id: PhysId) -> Option<PhysId> {
        let node = arena.node(id);
        let PhysicalOp::Sort { order } = &node.op else {
            return None;
        };
        let producer = node.producers[0];
        let PhysicalOp::ScanIndex { table, index_name } = &arena.node(producer).op else {
            return None;
        };
        let index = table.index().get(index_name)?;
        let ts_column = table.schema().column(index.ts_pos)?.name.clone();

        if !order
            .keys
            .iter()
            .any(|k| k.as_column_name() == Some(ts_column.as_str()))
        {
            return None;
        }

        let residual: Vec<Expr> = order
            .keys
            .iter()
            .filter(|k| k.as_column_name() != Some(ts_column.as_str()))
            .cloned()
            .collect();
        let ascending = order.ascending;

        debug!(ts = %ts_column, "sort key absorbed by index scan");
        if residual.is_empty() {
            Some(producer)
        } else {
            Some(arena.add(
                PhysicalOp::Sort {
                    order: OrderBy::new(residual, ascending),
                },
                vec![producer],
            ))
        }
    }
}

/// Push a `Group` or `Sort` below a left join when every key is a column of
/// the join's left input. Join type and condition are untouched.
pub struct LeftJoinOptimized;

enum Pushed {
    Group(Vec<Expr>),
    Sort(OrderBy),
}

impl PhysicalPass for LeftJoinOptimized {
    fn rewrite(&mut self, arena: &mut PhysicalArena, id: PhysId) -> Option<PhysId> {
        let node = arena.node(id);
        let pushed = match &node.op {
            PhysicalOp::Group { keys } => {
                if keys.is_empty() {
                    warn!("left join optimized skip: group keys are empty");
                    return None;
                }
                Pushed::Group(keys.clone())
            }
            PhysicalOp::Sort { order } => {
                if order.keys.is_empty() {
                    warn!("left join optimized skip: order keys are empty");
                    return None;
                }
                Pushed::Sort(order.clone())
            }
            _ => return None,
        };

        let join_id = node.producers[0];
        let join_node = arena.node(join_id);
        let PhysicalOp::Join {
            join_type: JoinType::Left,
            condition,
        } = &join_node.op
        else {
            return None;
        };
        let left = join_node.producers[0];
        let right = join_node.producers[1];

        // Every key must be a column reference resolvable on the left side;
        // anything else would change what the rewritten plan computes.
        let left_schema = &arena.node(left).schema;
        let key_exprs = match &pushed {
            Pushed::Group(keys) => keys.as_slice(),
            Pushed::Sort(order) => order.keys.as_slice(),
        };
        for key in key_exprs {
            let Some(name) = key.as_column_name() else {
                return None;
            };
            if !left_schema.contains(name) {
                return None;
            }
        }

        let condition = condition.clone();
        debug!("group/sort pushed below left join");
        let pushed_id = match pushed {
            Pushed::Group(keys) => arena.add(PhysicalOp::Group { keys }, vec![left]),
            Pushed::Sort(order) => arena.add(PhysicalOp::Sort { order }, vec![left]),
        };
        Some(arena.add(
            PhysicalOp::Join {
                join_type: JoinType::Left,
                condition,
            },
            vec![pushed_id, right],
        ))
    }
}

/// Ordered pass list with a single entry point.
#[derive(Debug, Default)]
pub struct PassPipeline {
    passes: Vec<PassKind>,
}

impl PassPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, kind: PassKind) {
        self.passes.push(kind);
    }

    /// Install the default order: left-join pushdown first, so a group it
    /// creates is still visible to the group-by pass, then sort-by last.
    pub fn add_default_passes(&mut self) {
        self.add_pass(PassKind::LeftJoinOptimized);
        self.add_pass(PassKind::GroupByOptimized);
        self.add_pass(PassKind::SortByOptimized);
    }

    pub fn passes(&self) -> &[PassKind] {
        &self.passes
    }

    /// One bottom-up sweep per pass, in registration order. Returns the
    /// (possibly replaced) root.
    pub fn run(&self, arena: &mut PhysicalArena, root: PhysId) -> PhysId {
        let mut root = root;
        for kind in &self.passes {
            let rewritten = match kind {
                PassKind::LeftJoinOptimized => LeftJoinOptimized.apply(arena, root),
                PassKind::GroupByOptimized => GroupByOptimized.apply(arena, root),
                PassKind::SortByOptimized => SortByOptimized.apply(arena, root),
            };
            if let Some(new_root) = rewritten {
                root = new_root;
            }
        }
        root
    }
}
