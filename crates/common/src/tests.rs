use super::*;
use pretty_assertions::assert_eq;
use types::SqlType;

fn trade_schema() -> Schema {
    Schema::new(vec![
        ColumnDef::new("symbol", SqlType::String),
        ColumnDef::new("price", SqlType::Double),
        ColumnDef::new("ts", SqlType::Timestamp),
    ])
}

#[test]
fn column_index_finds_first_match() {
    let schema = trade_schema();
    assert_eq!(schema.column_index("price"), Some(1));
    assert_eq!(schema.column_index("missing"), None);
    assert!(schema.contains("ts"));
}

#[test]
fn concat_preserves_order() {
    let left = trade_schema();
    let right = Schema::new(vec![ColumnDef::new("volume", SqlType::Bigint)]);

    let joined = left.concat(&right);

    assert_eq!(joined.len(), 4);
    assert_eq!(joined.column(0).unwrap().name, "symbol");
    assert_eq!(joined.column(3).unwrap().name, "volume");
    // Inputs untouched
    assert_eq!(left.len(), 3);
    assert_eq!(right.len(), 1);
}

#[test]
fn display_lists_name_type_pairs() {
    let schema = Schema::new(vec![
        ColumnDef::new("col1", SqlType::String),
        ColumnDef::new("col2", SqlType::Bigint),
    ]);
    assert_eq!(schema.to_string(), "[col1:string, col2:bigint]");
}

#[test]
fn error_messages_carry_code_prefix() {
    assert_eq!(
        EngineError::Plan("table t not exist".into()).to_string(),
        "plan: table t not exist"
    );
    assert_eq!(
        EngineError::Codegen("bad projection".into()).to_string(),
        "codegen: bad projection"
    );
    assert_eq!(
        EngineError::OpGen("cycle".into()).to_string(),
        "opgen: cycle"
    );
}
