//! Stored procedure and function models.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// One row of `list_procedures_and_functions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineSummary {
    pub schema: String,
    pub name: String,
    /// `type_desc`, e.g. `SQL_STORED_PROCEDURE`
    #[serde(rename = "type")]
    pub routine_type: String,
    pub created: JsonValue,
    pub modified: JsonValue,
    pub full_name: String,
}

impl RoutineSummary {
    pub fn new(
        schema: String,
        name: String,
        routine_type: String,
        created: JsonValue,
        modified: JsonValue,
    ) -> Self {
        let full_name = format!("{}.{}", schema, name);
        Self {
            schema,
            name,
            routine_type,
            created,
            modified,
            full_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineObject {
    pub schema: String,
    pub name: String,
    #[serde(rename = "type")]
    pub routine_type: String,
    pub created: JsonValue,
    pub modified: JsonValue,
    /// Absent for CLR routines and encrypted modules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineParameter {
    /// Empty for a scalar function's return value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub data_type: String,
    pub max_length: i64,
    pub precision: i64,
    pub scale: i64,
    pub is_output: bool,
    pub has_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<JsonValue>,
}

/// Output of `describe_procedure_or_function`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutineDocument {
    pub object: RoutineObject,
    pub parameters: Vec<RoutineParameter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_full_name() {
        let summary = RoutineSummary::new(
            "dbo".into(),
            "usp_Refresh".into(),
            "SQL_STORED_PROCEDURE".into(),
            json!("2024-01-01T00:00:00"),
            json!("2024-01-02T00:00:00"),
        );
        assert_eq!(summary.full_name, "dbo.usp_Refresh");
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["type"], "SQL_STORED_PROCEDURE");
    }

    #[test]
    fn test_unnamed_parameter_omits_name() {
        let param = RoutineParameter {
            name: None,
            data_type: "int".into(),
            max_length: 4,
            precision: 10,
            scale: 0,
            is_output: true,
            has_default: false,
            default_value: None,
        };
        let value = serde_json::to_value(&param).unwrap();
        assert!(value.get("name").is_none());
        assert!(value.get("default_value").is_none());
        assert_eq!(value["is_output"], true);
    }
}
