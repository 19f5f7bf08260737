//! [`CheckSchema`]: the JSON schema a check publishes for its `data` payload,
//! consumed by `GenerateOpenAPI` (§4.6).

use schemars::{gen::SchemaGenerator, JsonSchema};
use serde_json::Value;

/// A check's published schema for the `data` field of the [`crate::CheckResult`]
/// it produces.
#[derive(Debug, Clone)]
pub struct CheckSchema {
    /// The check's stable name, used as the OpenAPI path segment.
    pub name: String,
    /// The `data` field's JSON schema, already rendered to a [`Value`].
    pub schema: Value,
}

impl CheckSchema {
    /// Derive a [`CheckSchema`] from a check's data type via `schemars`.
    pub fn for_type<T: JsonSchema>(name: impl Into<String>) -> Self {
        let root = SchemaGenerator::default().into_root_schema_for::<T>();
        let schema = serde_json::to_value(&root).expect("schemars RootSchema always serializes to JSON");
        Self {
            name: name.into(),
            schema,
        }
    }

    /// The `/v1/metrics/{name}` OpenAPI path item for this check, as a
    /// `(path, path-item)` pair ready to merge into the paths map of an
    /// OpenAPI document.
    pub fn openapi_path(&self) -> (String, Value) {
        let path = format!("/v1/metrics/{}", self.name);
        let item = serde_json::json!({
            "get": {
                "summary": format!("Latest {} result", self.name),
                "responses": {
                    "200": {
                        "description": "latest result",
                        "content": {
                            "application/json": { "schema": self.schema }
                        }
                    }
                }
            }
        });
        (path, item)
    }
}
