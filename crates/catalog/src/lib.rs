//! Table and index metadata provider.
//!
//! The planner reads tables through [`Catalog::get_table`]; absence is
//! reported as `None` and the caller decides how to surface it. Handlers are
//! shared `Arc`s so physical scan operators can hold their table metadata
//! for the lifetime of a plan without borrowing the catalog.


use std::sync::Arc;
use std::{fs, path::Path};

use ahash::RandomState;
use common::{ColumnDef, EngineError, EngineResult, Schema};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use types::SqlType;

type Map<K, V> = HashMap<K, V, RandomState>;

/// A secondary index declaration: ordered key columns plus the ordinal of
/// the time-sort column rows are ordered by within each key bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexSt {
    pub name: String,
    pub keys: Vec<String>,
    pub ts_pos: usize,
}

/// All secondary indexes of a table, by index name.
pub type IndexHint = Map<String, IndexSt>;

/// Schema and index metadata for one table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableHandler {
    db: String,
    name: String,
    schema: Schema,
    indexes: IndexHint,
}

impl TableHandler {
    pub fn new(db: impl Into<String>, name: impl Into<String>, schema: Schema) -> Self {
        Self {
            db: db.into(),
            name: name.into(),
            schema,
            indexes: IndexHint::default(),
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully-qualified `db.table` name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.db, self.name)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn index(&self) -> &IndexHint {
        &self.indexes
    }
}

/// Persistent catalog of table handlers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    tables: Vec<TableHandler>,
    #[serde(skip)]
    #[serde(default)]
    handles: Map<(String, String), Arc<TableHandler>>,
}

#[bon::bon]
impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from disk, returning an empty catalog if the file does
    /// not exist.
    pub fn load(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = fs::read_to_string(path)
            .map_err(|err| EngineError::Plan(format!("read catalog file: {err}")))?;
        let mut catalog: Catalog = serde_json::from_str(&data)
            .map_err(|err| EngineError::Plan(format!("invalid catalog file: {err}")))?;
        catalog.rebuild_handles();
        Ok(catalog)
    }

    /// Persist the catalog contents as pretty JSON.
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| EngineError::Plan(format!("serialize catalog: {err}")))?;
        fs::write(path, data)
            .map_err(|err| EngineError::Plan(format!("write catalog file: {err}")))?;
        Ok(())
    }

    /// Shared handler for `db.name`, or `None` when the table is unknown.
    pub fn get_table(&self, db: &str, name: &str) -> Option<Arc<TableHandler>> {
        self.handles
            .get(&(db.to_string(), name.to_string()))
            .cloned()
    }

    /// Register a new table.
    pub fn create_table(
        &mut self,
        db: &str,
        name: &str,
        columns: Vec<ColumnDef>,
    ) -> EngineResult<()> {
        if self.find(db, name).is_some() {
            return Err(EngineError::Plan(format!(
                "table '{db}.{name}' already exists"
            )));
        }
        if columns.is_empty() {
            return Err(EngineError::Plan(format!(
                "table '{db}.{name}' must have at least one column"
            )));
        }
        self.tables
            .push(TableHandler::new(db, name, Schema::new(columns)));
        self.rebuild_handles();
        Ok(())
    }

    /// Declare a secondary index on an existing table.
    #[builder]
    pub fn create_index(
        &mut self,
        db: &str,
        table_name: &str,
        index_name: &str,
        keys: &[&str],
        ts_column: &str,
    ) -> EngineResult<()> {
        if keys.is_empty() {
            return Err(EngineError::Plan(
                "index must reference at least one key column".into(),
            ));
        }
        let table = self.find(db, table_name).ok_or_else(|| {
            EngineError::Plan(format!("unknown table '{db}.{table_name}'"))
        })?;
        let schema = self.tables[table].schema();
        for key in keys {
            if !schema.contains(key) {
                return Err(EngineError::Plan(format!(
                    "unknown key column '{key}' on table '{db}.{table_name}'"
                )));
            }
        }
        let ts_pos = schema.column_index(ts_column).ok_or_else(|| {
            EngineError::Plan(format!(
                "unknown ts column '{ts_column}' on table '{db}.{table_name}'"
            ))
        })?;
        let ts_ty = schema.columns()[ts_pos].ty;
        if !matches!(ts_ty, SqlType::Timestamp | SqlType::Bigint) {
            return Err(EngineError::Plan(format!(
                "ts column '{ts_column}' must be timestamp or bigint, got {ts_ty}"
            )));
        }
        let handler = &mut self.tables[table];
        if handler.indexes.contains_key(index_name) {
            return Err(EngineError::Plan(format!(
                "index '{index_name}' already exists on '{db}.{table_name}'"
            )));
        }
        handler.indexes.insert(
            index_name.to_string(),
            IndexSt {
                name: index_name.to_string(),
                keys: keys.iter().map(|k| k.to_string()).collect(),
                ts_pos,
            },
        );
        self.rebuild_handles();
        Ok(())
    }

    fn find(&self, db: &str, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.db == db && t.name == name)
    }

    /// Re-derive the shared handles after any mutation or load.
    fn rebuild_handles(&mut self) {
        self.handles = self
            .tables
            .iter()
            .map(|t| {
                (
                    (t.db.clone(), t.name.clone()),
                    Arc::new(t.clone()),
                )
            })
            .collect();
    }
}
