//! Request-scoped views of catalog responses.
//!
//! CKAN payloads are deserialized into [`toronto_ckan::models`] at the HTTP
//! boundary and converted here into the handful of fields the tools use.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use toronto_ckan::models::{DatastoreField, Package, Resource};

/// Snapshot of one dataset's metadata.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetRecord {
    /// CKAN `name`, the identifier the tools accept
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub organization: Option<String>,
    pub resources: Vec<ResourceDescriptor>,
}

impl From<Package> for DatasetRecord {
    fn from(package: Package) -> Self {
        let title = package
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| package.name.clone());

        Self {
            id: package.name,
            title,
            description: package.notes.filter(|n| !n.trim().is_empty()),
            tags: package
                .tags
                .unwrap_or_default()
                .into_iter()
                .map(|tag| tag.name)
                .collect(),
            organization: package.organization.and_then(|org| org.title.or(org.name)),
            resources: package
                .resources
                .unwrap_or_default()
                .into_iter()
                .map(ResourceDescriptor::from)
                .collect(),
        }
    }
}

/// How a resource can be consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Loaded into the datastore; supports filters, sort and field selection
    Datastore,
    Csv,
    /// XLS/XLSX; download only
    Spreadsheet,
    Other,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Datastore => "Active Datastore (queryable via API)",
            ResourceKind::Csv => "CSV download",
            ResourceKind::Spreadsheet => "Spreadsheet download",
            ResourceKind::Other => "Other file",
        };
        f.write_str(label)
    }
}

/// One resource attached to a dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceDescriptor {
    pub id: String,
    pub name: Option<String>,
    /// Upper-cased format tag, e.g. `CSV`, `XLSX`, `SHP`
    pub format: Option<String>,
    pub mimetype: Option<String>,
    /// Download locator
    pub url: Option<String>,
    pub queryable: bool,
}

impl From<Resource> for ResourceDescriptor {
    fn from(resource: Resource) -> Self {
        Self {
            id: resource.id,
            name: resource.name.filter(|n| !n.trim().is_empty()),
            format: resource
                .format
                .map(|f| f.trim().to_uppercase())
                .filter(|f| !f.is_empty()),
            mimetype: resource
                .mimetype
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty()),
            url: resource.url.filter(|u| !u.trim().is_empty()),
            queryable: resource.datastore_active.unwrap_or(false),
        }
    }
}

impl ResourceDescriptor {
    pub fn kind(&self) -> ResourceKind {
        if self.queryable {
            ResourceKind::Datastore
        } else if self.is_csv() {
            ResourceKind::Csv
        } else if self.is_spreadsheet() {
            ResourceKind::Spreadsheet
        } else {
            ResourceKind::Other
        }
    }

    pub fn is_csv(&self) -> bool {
        self.format.as_deref() == Some("CSV")
            || self
                .mimetype
                .as_deref()
                .is_some_and(|m| m.contains("text/csv"))
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self.format.as_deref(), Some("XLS") | Some("XLSX"))
            || self
                .mimetype
                .as_deref()
                .is_some_and(|m| m.contains("excel") || m.contains("spreadsheet"))
    }

    /// CSV or spreadsheet file, regardless of datastore status.
    pub fn is_downloadable(&self) -> bool {
        self.is_csv() || self.is_spreadsheet()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn format_label(&self) -> &str {
        match self.format.as_deref() {
            Some(format) => format,
            None if self.is_csv() => "CSV",
            None => "N/A",
        }
    }
}

/// Best-effort column type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    Numeric,
    Boolean,
    Date,
    Time,
    Timestamp,
    Json,
    /// Unrecognised datastore tag, kept verbatim
    Other(String),
}

impl FieldType {
    /// Map a datastore (Postgres) type tag onto a [`FieldType`].
    pub fn from_datastore(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "text" | "varchar" | "char" | "bpchar" | "name" | "citext" => FieldType::Text,
            "int" | "int2" | "int4" | "int8" | "integer" | "smallint" | "bigint" => {
                FieldType::Integer
            }
            "numeric" | "float" | "float4" | "float8" | "double precision" | "real" | "money" => {
                FieldType::Numeric
            }
            "bool" | "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "time" | "timetz" => FieldType::Time,
            "timestamp" | "timestamptz" => FieldType::Timestamp,
            "json" | "jsonb" => FieldType::Json,
            other => FieldType::Other(other.to_string()),
        }
    }

    /// Guess a column type from sample cell values; blanks are ignored.
    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let values: Vec<&str> = values
            .into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect();

        if values.is_empty() {
            return FieldType::Text;
        }

        let all = |check: fn(&str) -> bool| values.iter().all(|v| check(v));

        if all(|v| v.parse::<i64>().is_ok()) {
            FieldType::Integer
        } else if all(|v| v.parse::<f64>().is_ok_and(f64::is_finite)) {
            FieldType::Numeric
        } else if all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
            FieldType::Boolean
        } else if all(looks_like_date) {
            FieldType::Date
        } else if all(looks_like_timestamp) {
            FieldType::Timestamp
        } else {
            FieldType::Text
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => f.write_str("text"),
            FieldType::Integer => f.write_str("integer"),
            FieldType::Numeric => f.write_str("numeric"),
            FieldType::Boolean => f.write_str("boolean"),
            FieldType::Date => f.write_str("date"),
            FieldType::Time => f.write_str("time"),
            FieldType::Timestamp => f.write_str("timestamp"),
            FieldType::Json => f.write_str("json"),
            FieldType::Other(tag) => f.write_str(tag),
        }
    }
}

// YYYY-MM-DD
fn looks_like_date(value: &str) -> bool {
    is_date_bytes(value.as_bytes())
}

fn is_date_bytes(bytes: &[u8]) -> bool {
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

// YYYY-MM-DD[T ]HH:MM[...]
fn looks_like_timestamp(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 16
        && is_date_bytes(&bytes[..10])
        && (bytes[10] == b'T' || bytes[10] == b' ')
        && bytes[11].is_ascii_digit()
        && bytes[12].is_ascii_digit()
        && bytes[13] == b':'
        && bytes[14].is_ascii_digit()
        && bytes[15].is_ascii_digit()
}

/// A datastore column and its inferred type.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
}

impl From<DatastoreField> for SchemaField {
    fn from(field: DatastoreField) -> Self {
        Self {
            field_type: FieldType::from_datastore(&field.field_type),
            name: field.id,
        }
    }
}

/// CKAN's internal row id column, hidden from callers.
pub const INTERNAL_ID_FIELD: &str = "_id";

/// Schema of a dataset's datastore table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetSchema {
    pub dataset: DatasetRecord,
    pub resource_id: String,
    pub fields: Vec<SchemaField>,
    pub total: Option<u64>,
}

/// Rows returned by a datastore query.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column order as reported by the datastore, `_id` excluded
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    /// Total number of matching rows, when the portal reports it
    pub total: Option<u64>,
    /// More rows match than were returned
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(value: serde_json::Value) -> ResourceDescriptor {
        ResourceDescriptor::from(serde_json::from_value::<Resource>(value).unwrap())
    }

    #[test]
    fn package_conversion_falls_back_to_name_for_title() {
        let package: Package = serde_json::from_value(json!({
            "name": "dinesafe",
            "title": "  ",
            "notes": "",
            "organization": {"name": "tph"}
        }))
        .unwrap();

        let record = DatasetRecord::from(package);
        assert_eq!(record.title, "dinesafe");
        assert_eq!(record.description, None);
        assert_eq!(record.organization.as_deref(), Some("tph"));
        assert!(record.resources.is_empty());
    }

    #[test]
    fn resource_kinds() {
        assert_eq!(
            resource(json!({"id": "a", "format": "csv", "datastore_active": true})).kind(),
            ResourceKind::Datastore
        );
        assert_eq!(
            resource(json!({"id": "b", "format": " csv "})).kind(),
            ResourceKind::Csv
        );
        assert_eq!(
            resource(json!({"id": "c", "mimetype": "text/csv"})).kind(),
            ResourceKind::Csv
        );
        assert_eq!(
            resource(json!({"id": "d", "format": "XLSX"})).kind(),
            ResourceKind::Spreadsheet
        );
        assert_eq!(
            resource(json!({"id": "e", "mimetype": "application/vnd.ms-excel"})).kind(),
            ResourceKind::Spreadsheet
        );
        assert_eq!(
            resource(json!({"id": "f", "format": "SHP"})).kind(),
            ResourceKind::Other
        );
    }

    #[test]
    fn datastore_type_tags() {
        assert_eq!(FieldType::from_datastore("int4"), FieldType::Integer);
        assert_eq!(FieldType::from_datastore("TIMESTAMP"), FieldType::Timestamp);
        assert_eq!(FieldType::from_datastore("float8"), FieldType::Numeric);
        assert_eq!(
            FieldType::from_datastore("geometry"),
            FieldType::Other("geometry".into())
        );
        assert_eq!(FieldType::Other("geometry".into()).to_string(), "geometry");
    }

    #[test]
    fn infers_types_from_samples() {
        assert_eq!(FieldType::infer(["1", "", "42"]), FieldType::Integer);
        assert_eq!(FieldType::infer(["1.5", "2"]), FieldType::Numeric);
        assert_eq!(FieldType::infer(["TRUE", "false"]), FieldType::Boolean);
        assert_eq!(FieldType::infer(["2024-01-01", "1999-12-31"]), FieldType::Date);
        assert_eq!(
            FieldType::infer(["2024-01-01T10:00:00", "2024-01-02 11:30"]),
            FieldType::Timestamp
        );
        assert_eq!(FieldType::infer(["Pass", "1"]), FieldType::Text);
        assert_eq!(FieldType::infer(["", " "]), FieldType::Text);
        assert_eq!(FieldType::infer(["NaN"]), FieldType::Text);
    }
}
