//! Logical→physical translation.
//!
//! One [`Transformer`] serves one compilation: it owns the physical arena,
//! the memo table that preserves DAG identity, and the projection compiler.
//! Translation is a recursive dispatch on the logical kind; a logical node
//! reachable from several parents is translated once and its physical id
//! reused.

use crate::codegen::{CodegenRequest, ProjectionCompiler};
use crate::passes::{PassKind, PassPipeline};
use crate::physical::{OpKind, PhysId, PhysicalArena, PhysicalOp};
use crate::validate::validate_primary_path;
use ahash::RandomState;
use catalog::Catalog;
use common::{EngineError, EngineResult, Schema};
use expr::{Expr, OrderBy};
use hashbrown::HashMap;
use plan::graph::LogicalGraph;
use plan::{JoinType, PlanArena, PlanId, PlanNode, ProjectList, ProjectNode};
use tracing::{debug, warn};

type Map<K, V> = HashMap<K, V, RandomState>;

/// Compiles one logical plan into a physical operator DAG.
///
/// Batch mode ([`Transformer::transform_batch`]) scans whole tables; request
/// mode ([`Transformer::transform_request`]) first validates the primary
/// path and emits a `FetchRequest` for the table that carries the request
/// row. A transformer instance is single-threaded and serves one
/// compilation from start to finish.
pub struct Transformer<'a> {
    plan: &'a PlanArena,
    catalog: &'a Catalog,
    db: String,
    arena: PhysicalArena,
    memo: Map<PlanId, PhysId>,
    compiler: ProjectionCompiler,
    primary: Option<PlanId>,
    pipeline: PassPipeline,
}

impl<'a> Transformer<'a> {
    pub fn new(plan: &'a PlanArena, catalog: &'a Catalog, db: impl Into<String>) -> Self {
        Self {
            plan,
            catalog,
            db: db.into(),
            arena: PhysicalArena::new(),
            memo: Map::default(),
            compiler: ProjectionCompiler::new(),
            primary: None,
            pipeline: PassPipeline::new(),
        }
    }

    /// Batch-mode entry: no primary-path validation, every table becomes a
    /// full scan.
    pub fn transform_batch(&mut self, root: PlanId) -> EngineResult<PhysId> {
        LogicalGraph::from_plan(self.plan, root)?;
        self.primary = None;
        self.transform_node(root)
    }

    /// Request-mode entry: validates the primary path first, then rewrites
    /// the primary table to a `FetchRequest`.
    pub fn transform_request(&mut self, root: PlanId) -> EngineResult<PhysId> {
        LogicalGraph::from_plan(self.plan, root)?;
        self.primary = Some(validate_primary_path(self.plan, root)?);
        self.transform_node(root)
    }

    /// Append an optimization pass to the pipeline.
    pub fn add_pass(&mut self, kind: PassKind) {
        self.pipeline.add_pass(kind);
    }

    /// Install the default pass order: left-join pushdown, group-by on
    /// scan, sort-by on index scan.
    pub fn add_default_passes(&mut self) {
        self.pipeline.add_default_passes();
    }

    /// Run the registered passes over the DAG; returns the (possibly new)
    /// root.
    pub fn run_passes(&mut self, root: PhysId) -> PhysId {
        self.pipeline.run(&mut self.arena, root)
    }

    pub fn arena(&self) -> &PhysicalArena {
        &self.arena
    }

    /// Projection functions requested so far, for the expression compiler.
    pub fn codegen_requests(&self) -> &[CodegenRequest] {
        self.compiler.requests()
    }

    fn transform_node(&mut self, id: PlanId) -> EngineResult<PhysId> {
        if let Some(&phys) = self.memo.get(&id) {
            return Ok(phys);
        }
        let phys = match self.plan.node(id).clone() {
            PlanNode::Query { input } => self.transform_node(input)?,
            PlanNode::Table { name } => self.transform_table(id, &name)?,
            PlanNode::Rename { input, alias } => {
                let depend = self.transform_node(input)?;
                self.arena.add(PhysicalOp::Rename { alias }, vec![depend])
            }
            PlanNode::Filter { input, condition } => {
                let depend = self.transform_node(input)?;
                self.arena.add(PhysicalOp::Filter { condition }, vec![depend])
            }
            PlanNode::Project {
                input,
                lists,
                pos_mapping,
            } => self.transform_project(input, &lists, &pos_mapping)?,
            PlanNode::Group { input, keys } => {
                let depend = self.transform_node(input)?;
                self.arena.add(PhysicalOp::Group { keys }, vec![depend])
            }
            PlanNode::Sort { input, order } => {
                let depend = self.transform_node(input)?;
                self.arena.add(PhysicalOp::Sort { order }, vec![depend])
            }
            PlanNode::Join {
                left,
                right,
                join_type,
                condition,
            } => {
                let left = self.transform_node(left)?;
                let right = self.transform_node(right)?;
                self.arena.add(
                    PhysicalOp::Join {
                        join_type,
                        condition,
                    },
                    vec![left, right],
                )
            }
            PlanNode::Union {
                left,
                right,
                is_all,
            } => {
                let left = self.transform_node(left)?;
                let right = self.transform_node(right)?;
                self.arena
                    .add(PhysicalOp::Union { is_all }, vec![left, right])
            }
            PlanNode::Limit { input, count } => {
                let depend = self.transform_node(input)?;
                self.arena.add(PhysicalOp::Limit { count }, vec![depend])
            }
            PlanNode::Distinct { input } => {
                let depend = self.transform_node(input)?;
                self.arena.add(PhysicalOp::Distinct, vec![depend])
            }
            node @ (PlanNode::Create { .. } | PlanNode::Insert { .. } | PlanNode::Cmd { .. }) => {
                let msg = format!(
                    "fail to transform physical plan: can't handle type {}",
                    node.kind_name()
                );
                warn!("{msg}");
                return Err(EngineError::Plan(msg));
            }
        };
        self.memo.insert(id, phys);
        Ok(phys)
    }

    fn transform_table(&mut self, id: PlanId, name: &str) -> EngineResult<PhysId> {
        let Some(table) = self.catalog.get_table(&self.db, name) else {
            let msg = format!(
                "fail to transform scan op: table {}.{name} not exist",
                self.db
            );
            warn!("{msg}");
            return Err(EngineError::Plan(msg));
        };
        let op = if self.primary == Some(id) {
            PhysicalOp::FetchRequest { table }
        } else {
            PhysicalOp::ScanTable { table }
        };
        Ok(self.arena.add(op, Vec::new()))
    }

    /// Project fan-out: one operator per project-list, a concat-join chain
    /// when there is more than one, and a final row projection restoring the
    /// public output order from `pos_mapping`.
    fn transform_project(
        &mut self,
        input: PlanId,
        lists: &[ProjectList],
        pos_mapping: &[(usize, usize)],
    ) -> EngineResult<PhysId> {
        let depend = self.transform_node(input)?;

        if lists.is_empty() {
            let msg = "fail to transform project op: empty projects";
            warn!("{msg}");
            return Err(EngineError::Plan(msg.into()));
        }

        let mut ops = Vec::with_capacity(lists.len());
        for list in lists {
            ops.push(self.build_project_list(list, depend)?);
        }

        if ops.len() == 1 {
            return Ok(ops[0]);
        }

        let mut join = self.arena.add(
            PhysicalOp::Join {
                join_type: JoinType::Concat,
                condition: None,
            },
            vec![ops[0], ops[1]],
        );
        for op in &ops[2..] {
            join = self.arena.add(
                PhysicalOp::Join {
                    join_type: JoinType::Concat,
                    condition: None,
                },
                vec![join, *op],
            );
        }

        let join_schema = self.arena.node(join).schema.clone();
        let mut projects = Vec::with_capacity(pos_mapping.len());
        for &(list_index, pos) in pos_mapping {
            let project = lists
                .get(list_index)
                .and_then(|l| l.projects.get(pos))
                .ok_or_else(|| {
                    let msg = format!(
                        "fail to transform project op: pos mapping ({list_index}, {pos}) out of range"
                    );
                    warn!("{msg}");
                    EngineError::Plan(msg)
                })?;
            match &project.expr {
                Expr::All { relation, columns } => {
                    let expr = if columns.is_empty() {
                        expand_star(relation.clone(), &join_schema)
                    } else {
                        project.expr.clone()
                    };
                    projects.push(ProjectNode::new("*", expr));
                }
                _ => projects.push(ProjectNode::new(
                    project.name.clone(),
                    Expr::column(project.name.clone()),
                )),
            }
        }
        self.build_row_project(join, &projects)
    }

    /// One project-list over a physical input: windowed aggregation, plain
    /// aggregation over a pre-grouped input, or a row projection.
    fn build_project_list(&mut self, list: &ProjectList, depend: PhysId) -> EngineResult<PhysId> {
        if list.is_window_agg && let Some(w) = &list.window {
            let mut dep = depend;
            if !w.keys.is_empty() {
                let keys = w.keys.iter().map(|k| Expr::column(k.clone())).collect();
                dep = self.arena.add(PhysicalOp::Group { keys }, vec![dep]);
            }
            if !w.orders.is_empty() {
                let keys = w.orders.iter().map(|k| Expr::column(k.clone())).collect();
                dep = self.arena.add(
                    PhysicalOp::Sort {
                        order: OrderBy::new(keys, true),
                    },
                    vec![dep],
                );
            }
            self.build_window_aggregation(dep, &list.projects, w.start, w.end)
        } else if self.arena.node(depend).op.kind() == OpKind::Group {
            self.build_aggregation(depend, &list.projects)
        } else {
            self.build_row_project(depend, &list.projects)
        }
    }

    fn build_aggregation(
        &mut self,
        input: PhysId,
        projects: &[ProjectNode],
    ) -> EngineResult<PhysId> {
        let input_schema = self.arena.node(input).schema.clone();
        let (fn_name, schema) = self.compiler.build(&input_schema, projects, false)?;
        Ok(self
            .arena
            .add(PhysicalOp::Aggregation { fn_name, schema }, vec![input]))
    }

    fn build_window_aggregation(
        &mut self,
        input: PhysId,
        projects: &[ProjectNode],
        start: i64,
        end: i64,
    ) -> EngineResult<PhysId> {
        let input_schema = self.arena.node(input).schema.clone();
        let (fn_name, schema) = self.compiler.build(&input_schema, projects, false)?;
        Ok(self.arena.add(
            PhysicalOp::WindowAggregation {
                fn_name,
                schema,
                start,
                end,
            },
            vec![input],
        ))
    }

    /// Row projection. A single projection that is just an (expanded) `*`
    /// produces no operator at all; the input already has the right shape.
    fn build_row_project(
        &mut self,
        input: PhysId,
        projects: &[ProjectNode],
    ) -> EngineResult<PhysId> {
        let input_schema = self.arena.node(input).schema.clone();

        let mut expanded = Vec::with_capacity(projects.len());
        let mut has_star = false;
        for project in projects {
            match &project.expr {
                Expr::All { relation, columns } => {
                    has_star = true;
                    let expr = if columns.is_empty() {
                        expand_star(relation.clone(), &input_schema)
                    } else {
                        project.expr.clone()
                    };
                    expanded.push(ProjectNode::new(project.name.clone(), expr));
                }
                _ => expanded.push(project.clone()),
            }
        }

        if has_star && expanded.len() == 1 {
            debug!("skip project node: single star projection");
            return Ok(input);
        }

        let (fn_name, schema) = self.compiler.build(&input_schema, &expanded, true)?;
        Ok(self
            .arena
            .add(PhysicalOp::ProjectRow { fn_name, schema }, vec![input]))
    }
}

/// Expand `*` into one column reference per input column.
fn expand_star(relation: Option<String>, schema: &Schema) -> Expr {
    let columns = schema
        .iter()
        .map(|c| Expr::Column {
            relation: relation.clone(),
            name: c.name.clone(),
        })
        .collect();
    Expr::All { relation, columns }
}
