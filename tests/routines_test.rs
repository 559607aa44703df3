//! Procedure and function tools against the in-memory provider.

mod common;

use common::{FakeProvider, args, body, registry};
use mssql_mcp_server::db::RowSet;
use serde_json::json;

#[tokio::test]
async fn test_list_routines_adds_full_name() {
    let provider = FakeProvider::new().on_query(|_, _| {
        Ok(RowSet::from_records(
            ["schema", "name", "type", "created", "modified"],
            vec![
                [
                    json!("dbo"),
                    json!("fn_Total"),
                    json!("SQL_SCALAR_FUNCTION"),
                    json!("2024-03-01T10:00:00"),
                    json!("2024-03-02T10:00:00"),
                ],
                [
                    json!("dbo"),
                    json!("usp_Refresh"),
                    json!("SQL_STORED_PROCEDURE"),
                    json!("2024-03-01T10:00:00"),
                    json!("2024-03-01T10:00:00"),
                ],
            ],
        ))
    });
    let (registry, _) = registry(provider, true);

    let response = registry.call("list_procedures_and_functions", None).await;

    assert!(!response.is_error, "{}", response.text);
    let data = body(&response.text)["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 2);
    assert_eq!(data[0]["full_name"], "dbo.fn_Total");
    assert_eq!(data[1]["full_name"], "dbo.usp_Refresh");
    assert_eq!(data[1]["type"], "SQL_STORED_PROCEDURE");
}

#[tokio::test]
async fn test_describe_routine_returns_definition_and_parameters() {
    let provider = FakeProvider::new().on_query(|sql, params| {
        assert_eq!(params[0].as_str(), Some("dbo"));
        assert_eq!(params[1].as_str(), Some("usp_GetOrders"));

        if sql.contains("sys.sql_modules") {
            return Ok(RowSet::from_records(
                ["schema", "name", "type", "created", "modified", "definition"],
                vec![[
                    json!("dbo"),
                    json!("usp_GetOrders"),
                    json!("SQL_STORED_PROCEDURE"),
                    json!("2024-03-01T10:00:00"),
                    json!("2024-03-01T10:00:00"),
                    json!("CREATE PROCEDURE dbo.usp_GetOrders @CustomerId INT, @Total MONEY OUTPUT AS SELECT 1"),
                ]],
            ));
        }
        Ok(RowSet::from_records(
            [
                "name",
                "data_type",
                "max_length",
                "precision",
                "scale",
                "is_output",
                "has_default",
                "default_value",
            ],
            vec![
                [
                    json!("@CustomerId"),
                    json!("int"),
                    json!(4),
                    json!(10),
                    json!(0),
                    json!(false),
                    json!(false),
                    json!(null),
                ],
                [
                    json!("@Total"),
                    json!("money"),
                    json!(8),
                    json!(19),
                    json!(4),
                    json!(true),
                    json!(false),
                    json!(null),
                ],
            ],
        ))
    });
    let (registry, provider) = registry(provider, false);

    let response = registry
        .call(
            "describe_procedure_or_function",
            Some(&args(json!({ "schema_name": "dbo", "object_name": "usp_GetOrders" }))),
        )
        .await;

    assert!(!response.is_error, "{}", response.text);
    let doc = body(&response.text)["data"].clone();
    assert_eq!(doc["object"]["name"], "usp_GetOrders");
    assert!(doc["object"]["definition"].as_str().unwrap().starts_with("CREATE PROCEDURE"));
    assert_eq!(doc["parameters"][0]["name"], "@CustomerId");
    assert_eq!(doc["parameters"][1]["is_output"], true);
    assert!(doc["parameters"][1].get("default_value").is_none());
    assert_eq!(provider.queries().len(), 2);
}

#[tokio::test]
async fn test_describe_missing_routine() {
    let (registry, provider) = registry(FakeProvider::new(), false);

    let response = registry
        .call(
            "describe_procedure_or_function",
            Some(&args(json!({ "schema_name": "dbo", "object_name": "usp_Gone" }))),
        )
        .await;

    assert!(response.is_error);
    assert_eq!(
        response.text,
        "Error: Procedure or function 'dbo.usp_Gone' not found."
    );
    // The parameter lookup is skipped once the object is known to be missing
    assert_eq!(provider.queries().len(), 1);
}

#[tokio::test]
async fn test_describe_requires_both_names_before_connecting() {
    let (registry, provider) = registry(FakeProvider::new(), false);

    let response = registry
        .call(
            "describe_procedure_or_function",
            Some(&args(json!({ "schema_name": " ", "object_name": "usp_GetOrders" }))),
        )
        .await;
    assert!(response.is_error);
    assert!(response.text.contains("Schema name is required"), "{}", response.text);

    let response = registry
        .call(
            "describe_procedure_or_function",
            Some(&args(json!({ "schema_name": "dbo" }))),
        )
        .await;
    assert!(response.is_error);
    assert!(response.text.contains("Object name is required"), "{}", response.text);

    assert!(provider.calls().is_empty());
}
