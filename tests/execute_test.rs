//! Routine execution and index creation against the in-memory provider.

mod common;

use common::{Call, FakeProvider, args, body, registry};
use mssql_mcp_server::db::{RowSet, SqlParam};
use mssql_mcp_server::error::DbError;
use serde_json::json;

fn p(value: &str) -> Option<String> {
    Some(value.to_string())
}

#[tokio::test]
async fn test_procedure_runs_as_exec_with_bound_arguments() {
    let provider = FakeProvider::new().on_query(|_, params| {
        assert_eq!(params[0], SqlParam::Int(42));
        Ok(RowSet::from_records(
            ["OrderId", "Total"],
            vec![[json!(1), json!("10.5000")], [json!(2), json!("3.2500")]],
        ))
    });
    let (registry, provider) = registry(provider, false);

    let response = registry
        .call(
            "execute_stored_procedure",
            Some(&args(json!({
                "procedureName": "dbo.usp_GetOrders",
                "parameters": { "CustomerId": 42, "@Status": "open", "Since": null }
            }))),
        )
        .await;

    assert!(!response.is_error, "{}", response.text);
    assert_eq!(
        body(&response.text),
        json!({
            "success": true,
            "rows_affected": 2,
            "data": [
                { "OrderId": 1, "Total": "10.5000" },
                { "OrderId": 2, "Total": "3.2500" }
            ]
        })
    );
    assert_eq!(
        provider.calls(),
        vec![
            Call::Connect,
            Call::Query {
                sql: "EXEC [dbo].[usp_GetOrders] @CustomerId = @P1, @Status = @P2, @Since = @P3"
                    .to_string(),
                params: vec![p("42"), p("open"), None],
            },
            Call::Close,
        ]
    );
}

#[tokio::test]
async fn test_procedure_without_result_set_reports_zero_rows() {
    let (registry, _) = registry(FakeProvider::new(), false);

    let response = registry
        .call(
            "execute_stored_procedure",
            Some(&args(json!({ "procedureName": "usp_Refresh" }))),
        )
        .await;

    assert_eq!(
        body(&response.text),
        json!({ "success": true, "rows_affected": 0, "data": [] })
    );
}

#[tokio::test]
async fn test_function_selects_from_quoted_name() {
    let provider = FakeProvider::new().on_query(|_, _| {
        Ok(RowSet::from_records(["value"], vec![[json!(7)]]))
    });
    let (registry, provider) = registry(provider, false);

    let response = registry
        .call(
            "execute_function",
            Some(&args(json!({
                "functionName": "fn_Add",
                "parameters": { "a": 3, "b": 4 }
            }))),
        )
        .await;

    assert_eq!(body(&response.text)["data"], json!([{ "value": 7 }]));
    assert_eq!(body(&response.text)["rows_affected"], 1);
    assert_eq!(
        provider.queries(),
        vec![(
            "SELECT * FROM [fn_Add](@P1, @P2)".to_string(),
            vec![p("3"), p("4")]
        )]
    );
}

#[tokio::test]
async fn test_function_is_available_in_readonly_mode() {
    let (registry, provider) = registry(FakeProvider::new(), true);

    let response = registry
        .call("execute_function", Some(&args(json!({ "functionName": "dbo.fn_Now" }))))
        .await;
    assert!(!response.is_error, "{}", response.text);
    assert_eq!(provider.queries()[0].0, "SELECT * FROM [dbo].[fn_Now]()");

    for name in ["execute_stored_procedure", "create_index"] {
        let response = registry.call(name, Some(&args(json!({})))).await;
        assert_eq!(response.text, format!("Unknown tool: {}", name));
    }
}

#[tokio::test]
async fn test_injected_routine_name_never_reaches_the_server() {
    let (registry, provider) = registry(FakeProvider::new(), false);

    let response = registry
        .call(
            "execute_function",
            Some(&args(json!({ "functionName": "fn(); DROP TABLE dbo.Orders; --" }))),
        )
        .await;

    assert!(response.is_error);
    assert_eq!(
        response.text,
        "Error: Invalid input: Invalid object name 'fn(); DROP TABLE dbo.Orders; --'"
    );
    assert!(provider.calls().is_empty());

    let response = registry
        .call(
            "execute_stored_procedure",
            Some(&args(json!({
                "procedureName": "usp",
                "parameters": { "x = 1; DROP TABLE t; --": 1 }
            }))),
        )
        .await;
    assert!(response.is_error);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_missing_routine_name_is_invalid_input() {
    let (registry, provider) = registry(FakeProvider::new(), false);

    let response = registry.call("execute_stored_procedure", None).await;

    assert!(response.is_error);
    assert!(response.text.starts_with("Error: Invalid input"));
    assert!(response.text.contains("procedureName"));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_procedure_server_error_is_verbatim() {
    let provider = FakeProvider::new().on_query(|_, _| {
        Err(DbError::statement(
            "Could not find stored procedure 'dbo.usp_Missing'.",
            Some(2812),
        ))
    });
    let (registry, provider) = registry(provider, false);

    let response = registry
        .call(
            "execute_stored_procedure",
            Some(&args(json!({ "procedureName": "dbo.usp_Missing" }))),
        )
        .await;

    assert!(response.is_error);
    assert_eq!(
        response.text,
        "Error: Could not find stored procedure 'dbo.usp_Missing'."
    );
    assert_eq!(provider.calls().last(), Some(&Call::Close));
}

#[tokio::test]
async fn test_create_index_commits_generated_statement() {
    let (registry, provider) = registry(FakeProvider::new(), false);

    let response = registry
        .call(
            "create_index",
            Some(&args(json!({
                "schemaName": "sales",
                "tableName": "Orders",
                "indexName": "UX_Orders_Number",
                "columns": ["OrderNumber", "Region"],
                "isUnique": true
            }))),
        )
        .await;

    assert!(!response.is_error, "{}", response.text);
    assert_eq!(
        body(&response.text)["data"],
        json!({
            "message": "Index [UX_Orders_Number] created successfully on table [sales.Orders]",
            "details": {
                "schemaName": "sales",
                "tableName": "Orders",
                "indexName": "UX_Orders_Number",
                "columnNames": "OrderNumber, Region",
                "isUnique": true,
                "isClustered": false
            }
        })
    );
    assert_eq!(
        provider.calls(),
        vec![
            Call::Connect,
            Call::Begin,
            Call::Execute(
                "CREATE UNIQUE NONCLUSTERED INDEX [UX_Orders_Number] ON [sales].[Orders] ([OrderNumber], [Region])"
                    .to_string()
            ),
            Call::Commit,
            Call::Close,
        ]
    );
}

#[tokio::test]
async fn test_create_index_failure_skips_commit() {
    let provider = FakeProvider::new().on_execute(|_| {
        Err(DbError::statement(
            "Column name 'Nope' does not exist in the target table or view.",
            Some(1911),
        ))
    });
    let (registry, provider) = registry(provider, false);

    let response = registry
        .call(
            "create_index",
            Some(&args(json!({
                "tableName": "Orders",
                "indexName": "IX_Nope",
                "columns": ["Nope"]
            }))),
        )
        .await;

    assert!(response.is_error);
    assert!(!provider.calls().contains(&Call::Commit));
    assert_eq!(provider.calls().last(), Some(&Call::Close));
}

#[tokio::test]
async fn test_create_index_without_columns_does_not_connect() {
    let (registry, provider) = registry(FakeProvider::new(), false);

    let response = registry
        .call(
            "create_index",
            Some(&args(json!({ "tableName": "Orders", "indexName": "IX", "columns": [] }))),
        )
        .await;

    assert_eq!(
        response.text,
        "Error: Invalid input: At least one column is required"
    );
    assert!(provider.calls().is_empty());
}
