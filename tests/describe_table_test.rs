//! Schema introspection against the in-memory provider.

mod common;

use common::{FakeProvider, args, body, registry};
use mssql_mcp_server::db::{RowSet, SqlParam};
use mssql_mcp_server::error::DbResult;
use serde_json::json;

fn p(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Catalog for a `dbo.Orders` table, plus a `sales.Orders` twin when asked.
fn catalog(with_sales_twin: bool) -> impl Fn(&str, &[SqlParam]) -> DbResult<RowSet> {
    move |sql: &str, params: &[SqlParam]| -> DbResult<RowSet> {
        if sql.contains("u.name AS owner") {
            let schema = params[1].as_str();
            let mut rows = Vec::new();
            if params[0].as_str() == Some("Orders") {
                if schema.is_none() || schema == Some("dbo") {
                    rows.push([
                        json!(901578250),
                        json!("Orders"),
                        json!("dbo"),
                        json!("Customer orders"),
                        json!("U"),
                        json!("dbo"),
                    ]);
                }
                if with_sales_twin && (schema.is_none() || schema == Some("sales")) {
                    rows.push([
                        json!(917578307),
                        json!("Orders"),
                        json!("sales"),
                        json!(null),
                        json!("U"),
                        json!(null),
                    ]);
                }
            }
            return Ok(RowSet::from_records(
                ["id", "name", "schema", "description", "type", "owner"],
                rows,
            ));
        }
        if sql.contains("c.is_nullable") {
            return Ok(RowSet::from_records(
                ["name", "type", "length", "precision", "scale", "nullable", "description"],
                vec![
                    [json!("id"), json!("int"), json!(4), json!(10), json!(0), json!(false), json!(null)],
                    [json!("total"), json!("decimal"), json!(9), json!(18), json!(2), json!(true), json!("Order total")],
                    [json!("customer_id"), json!("int"), json!(4), json!(10), json!(0), json!(false), json!(null)],
                ],
            ));
        }
        if sql.contains("FROM sys.indexes") {
            return Ok(RowSet::from_records(
                ["name", "type", "description", "keys"],
                vec![[json!("IX_Orders_Customer"), json!("NONCLUSTERED"), json!(null), json!("customer_id")]],
            ));
        }
        if sql.contains("FROM sys.key_constraints") {
            return Ok(RowSet::from_records(
                ["name", "type", "keys"],
                vec![[json!("PK_Orders"), json!("PRIMARY_KEY_CONSTRAINT"), json!("id")]],
            ));
        }
        if sql.contains("sys.foreign_keys") {
            return Ok(RowSet::from_records(
                [
                    "name",
                    "schema",
                    "table_name",
                    "column_names",
                    "referenced_schema",
                    "referenced_table",
                    "referenced_column_names",
                ],
                vec![[
                    json!("FK_Orders_Customers"),
                    json!("dbo"),
                    json!("Orders"),
                    json!("customer_id"),
                    json!("dbo"),
                    json!("Customers"),
                    json!("id"),
                ]],
            ));
        }
        Ok(RowSet::default())
    }
}

#[tokio::test]
async fn test_describe_table_assembles_document() {
    let (registry, provider) = registry(FakeProvider::new().on_query(catalog(false)), false);

    let response = registry
        .call("describe_table", Some(&args(json!({ "table_name": "Orders" }))))
        .await;

    assert!(!response.is_error, "{}", response.text);
    let doc = body(&response.text)["data"].clone();

    assert_eq!(
        doc["table"],
        json!({
            "id": 901578250,
            "name": "Orders",
            "schema": "dbo",
            "owner": "dbo",
            "type": "U",
            "description": "Customer orders"
        })
    );
    let columns: Vec<&str> = doc["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(columns, vec!["id", "total", "customer_id"]);
    assert_eq!(doc["columns"][1]["scale"], 2);
    assert_eq!(doc["columns"][1]["nullable"], true);
    assert_eq!(doc["indexes"][0]["keys"], "customer_id");
    assert_eq!(doc["constraints"][0]["type"], "PRIMARY_KEY_CONSTRAINT");
    assert_eq!(doc["foreignKeys"][0]["referenced_table"], "Customers");

    // One identity lookup, then four sub-queries on the same connection
    assert_eq!(provider.queries().len(), 5);
}

#[tokio::test]
async fn test_sub_queries_bind_the_resolved_table() {
    let (registry, provider) = registry(FakeProvider::new().on_query(catalog(false)), false);

    registry
        .call("describe_table", Some(&args(json!({ "table_name": "Orders" }))))
        .await;

    let queries = provider.queries();
    // The caller gave no schema
    assert_eq!(queries[0].1, vec![p("Orders"), None]);
    // Every later query is pinned to the schema the lookup found
    for (sql, params) in &queries[1..] {
        assert_eq!(params, &vec![p("Orders"), p("dbo")], "{}", sql);
    }
}

#[tokio::test]
async fn test_qualified_name_is_split_on_first_dot() {
    let (registry, provider) = registry(FakeProvider::new().on_query(catalog(true)), false);

    let response = registry
        .call("describe_table", Some(&args(json!({ "table_name": "sales.Orders" }))))
        .await;

    assert!(!response.is_error, "{}", response.text);
    let doc = body(&response.text)["data"].clone();
    assert_eq!(doc["table"]["schema"], "sales");
    assert!(doc["table"].get("description").is_none());
    assert_eq!(doc["table"]["owner"], json!(null));

    let queries = provider.queries();
    assert_eq!(queries[0].1, vec![p("Orders"), p("sales")]);
    for (_, params) in &queries[1..] {
        assert_eq!(params, &vec![p("Orders"), p("sales")]);
    }
}

#[tokio::test]
async fn test_missing_table_issues_a_single_query() {
    let (registry, provider) = registry(FakeProvider::new().on_query(catalog(false)), false);

    let response = registry
        .call("describe_table", Some(&args(json!({ "table_name": "dbo.Missing" }))))
        .await;

    assert!(response.is_error);
    assert_eq!(response.text, "Error: Table 'dbo.Missing' not found.");
    assert_eq!(provider.queries().len(), 1);
}

#[tokio::test]
async fn test_unqualified_name_in_several_schemas_is_ambiguous() {
    let (registry, provider) = registry(FakeProvider::new().on_query(catalog(true)), false);

    let response = registry
        .call("describe_table", Some(&args(json!({ "table_name": "Orders" }))))
        .await;

    assert!(response.is_error);
    assert!(response.text.contains("dbo, sales"), "{}", response.text);
    assert_eq!(provider.queries().len(), 1);
}

#[tokio::test]
async fn test_table_without_keys_has_empty_collections() {
    let provider = FakeProvider::new().on_query(|sql, _| {
        if sql.contains("u.name AS owner") {
            return Ok(RowSet::from_records(
                ["id", "name", "schema", "description", "type", "owner"],
                vec![[json!(1), json!("Heap"), json!("dbo"), json!(null), json!("U"), json!("dbo")]],
            ));
        }
        Ok(RowSet::default())
    });
    let (registry, _) = registry(provider, false);

    let response = registry
        .call("describe_table", Some(&args(json!({ "table_name": "Heap" }))))
        .await;

    let doc = body(&response.text)["data"].clone();
    assert_eq!(doc["indexes"], json!([]));
    assert_eq!(doc["constraints"], json!([]));
    assert_eq!(doc["foreignKeys"], json!([]));
}
