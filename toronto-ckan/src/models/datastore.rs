use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result payload of `datastore_search`.
///
/// With `limit=0` the portal returns only `fields` and `total`, which is the
/// cheapest way to read a table schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatastoreSearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub fields: Vec<DatastoreField>,
    #[serde(default)]
    pub records: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// Column descriptor of a datastore table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatastoreField {
    pub id: String,
    /// Postgres-flavoured type tag: `text`, `int4`, `numeric`, `timestamp`, ...
    #[serde(rename = "type")]
    pub field_type: String,
}
