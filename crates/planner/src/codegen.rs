//! Projection compilation interface.
//!
//! The planner does not lower projection expressions itself; it assigns each
//! projection operator a stable function name, derives the operator's output
//! schema, and records a [`CodegenRequest`] for the downstream expression
//! compiler to pick up. Function names are unique within one transformer
//! instance (monotonic counter behind a fixed prefix), which keeps repeated
//! compilations of the same plan deterministic.

use common::{ColumnDef, EngineError, EngineResult, Schema};
use expr::Expr;
use plan::ProjectNode;

const FN_NAME_PREFIX: &str = "__internal_sql_codegen_";

/// One recorded projection function for the expression compiler.
#[derive(Clone, Debug)]
pub struct CodegenRequest {
    pub fn_name: String,
    /// Row mode evaluates over a single input row; non-row mode feeds an
    /// aggregation window.
    pub row_project: bool,
    pub input_schema: Schema,
    pub projects: Vec<ProjectNode>,
}

/// Allocates function names and output schemas for projection operators.
#[derive(Debug, Default)]
pub struct ProjectionCompiler {
    next_id: u32,
    requests: Vec<CodegenRequest>,
}

impl ProjectionCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one projection function over `input`. Returns its name and the
    /// output schema: one column per project, in project order, named by the
    /// project's declared output name; an expanded `*` contributes every
    /// column it references.
    pub fn build(
        &mut self,
        input: &Schema,
        projects: &[ProjectNode],
        row_project: bool,
    ) -> EngineResult<(String, Schema)> {
        if projects.is_empty() {
            return Err(EngineError::Codegen("empty projection list".into()));
        }

        let mut output = Schema::default();
        for project in projects {
            match &project.expr {
                Expr::All { columns, .. } => {
                    if columns.is_empty() {
                        return Err(EngineError::Codegen(
                            "star expression must be expanded before codegen".into(),
                        ));
                    }
                    for column in columns {
                        let ty = column.result_type(input).map_err(codegen_err)?;
                        let name = column
                            .as_column_name()
                            .ok_or_else(|| {
                                EngineError::Codegen(
                                    "star expansion must contain column references".into(),
                                )
                            })?
                            .to_string();
                        output.push(ColumnDef::new(name, ty));
                    }
                }
                expr => {
                    let ty = expr.result_type(input).map_err(codegen_err)?;
                    output.push(ColumnDef::new(project.name.clone(), ty));
                }
            }
        }

        let fn_name = format!("{FN_NAME_PREFIX}{}", self.next_id);
        self.next_id += 1;
        self.requests.push(CodegenRequest {
            fn_name: fn_name.clone(),
            row_project,
            input_schema: input.clone(),
            projects: projects.to_vec(),
        });
        Ok((fn_name, output))
    }

    /// All functions requested so far, in allocation order.
    pub fn requests(&self) -> &[CodegenRequest] {
        &self.requests
    }
}

fn codegen_err(err: EngineError) -> EngineError {
    EngineError::Codegen(format!("fail to codegen projects: {err}"))
}
