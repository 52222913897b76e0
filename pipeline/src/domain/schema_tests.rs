use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(EntityKind::TableInventory, json!([{"schema": "dbo", "table": "Orders"}]))]
#[case(EntityKind::TableInventory, json!([]))]
#[case(
    EntityKind::Columns,
    json!([{
        "table_name": "Orders",
        "column_name": "Id",
        "data_type": "int",
        "length": null,
        "is_primary_key": "YES",
        "is_nullable": false
    }])
)]
#[case(
    EntityKind::Relationships,
    json!([{
        "name": "FK_Orders_Customers",
        "table": "Orders",
        "column": "CustomerId",
        "ref_table": "Customers",
        "ref_column": "Id",
        "on_delete": "cascade"
    }])
)]
#[case(
    EntityKind::Relationships,
    json!({
        "name": "FK_Orders_Customers",
        "table": "Orders",
        "column": "CustomerId",
        "ref_table": "Customers",
        "ref_column": "Id"
    })
)]
#[case(
    EntityKind::Columns,
    json!({"table_name": "Orders", "column_name": "Id", "data_type": "int"})
)]
#[case(
    EntityKind::AnalysisTask,
    json!({"task": "count", "query": "SELECT 1", "results": [[1]], "row_count": 1})
)]
fn accepts_expected_shapes(#[case] kind: EntityKind, #[case] payload: Value) {
    kind.validate_shape(&payload).expect("shape is valid");
}

#[rstest]
#[case(EntityKind::TableInventory, json!({"schema": "dbo", "table": "Orders"}))]
#[case(EntityKind::TableInventory, json!([{"schema": "dbo"}]))]
#[case(EntityKind::Columns, json!([{"table_name": "Orders"}]))]
#[case(EntityKind::Columns, json!({"table_name": "Orders"}))]
#[case(EntityKind::Relationships, json!("none"))]
#[case(EntityKind::Relationships, json!([["Orders", "CustomerId"]]))]
#[case(EntityKind::AnalysisTask, json!([]))]
fn rejects_unexpected_shapes(#[case] kind: EntityKind, #[case] payload: Value) {
    let err = kind.validate_shape(&payload).expect_err("shape is invalid");
    assert_eq!(err.kind, kind.label());
}

#[rstest]
fn table_ref_displays_qualified_name() {
    assert_eq!(TableRef::new("sales", "Orders").to_string(), "sales.Orders");
}
