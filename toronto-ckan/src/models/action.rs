use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The envelope every CKAN action wraps its payload in.
///
/// ```json
/// { "help": "...", "success": true, "result": { ... } }
/// { "help": "...", "success": false, "error": { "__type": "Not Found Error", "message": "Not found" } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

/// Error object returned by CKAN when `success` is false.
///
/// Validation errors carry per-parameter messages next to `__type`
/// (e.g. `"filters": ["field \"status\" not in ..."]`), so any extra keys
/// are kept in `details`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionError {
    #[serde(rename = "__type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ActionError {
    pub fn is_not_found(&self) -> bool {
        self.error_type.as_deref() == Some("Not Found Error")
    }

    /// Flattens the error into a single human-readable line.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        for (key, value) in &self.details {
            let rendered = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            parts.push(format!("{key}: {rendered}"));
        }

        let body = parts.join(", ");
        match (&self.error_type, body.is_empty()) {
            (Some(kind), true) => kind.clone(),
            (Some(kind), false) => format!("{kind}: {body}"),
            (None, true) => "CKAN API reported failure".to_string(),
            (None, false) => body,
        }
    }
}
