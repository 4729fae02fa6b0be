//! Translation of structured query requests into `datastore_search`
//! parameters.

use crate::error::{Result, TorontoError};
use crate::model::{INTERNAL_ID_FIELD, SchemaField};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Rows returned when the caller does not ask for a limit.
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest page a single query may request.
pub const MAX_LIMIT: u32 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// A single-column sort, rendered as `<field> <asc|desc>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc<S: Into<String>>(field: S) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc<S: Into<String>>(field: S) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl FromStr for SortSpec {
    type Err = TorontoError;

    /// Accepts `field`, `field asc` or `field desc` (direction is case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            [field] => Ok(SortSpec::asc(*field)),
            [field, direction] => match direction.to_ascii_lowercase().as_str() {
                "asc" => Ok(SortSpec::asc(*field)),
                "desc" => Ok(SortSpec::desc(*field)),
                other => Err(TorontoError::invalid_argument(format!(
                    "sort direction must be 'asc' or 'desc', got '{other}'"
                ))),
            },
            [] => Err(TorontoError::invalid_argument("sort expression is empty")),
            _ => Err(TorontoError::invalid_argument(format!(
                "sort must look like \"field_name asc\" or \"field_name desc\", got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// A filtered, sorted, projected read of one dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySpec {
    pub dataset_id: String,
    /// Field → value equality filters; an array value matches any of its items
    pub filters: BTreeMap<String, Value>,
    /// Columns to return; `None` returns every column
    pub fields: Option<Vec<String>>,
    pub sort: Option<SortSpec>,
    pub limit: u32,
}

impl QuerySpec {
    pub fn new<S: Into<String>>(dataset_id: S) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            filters: BTreeMap::new(),
            fields: None,
            sort: None,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_filter<K: Into<String>, V: Into<Value>>(mut self, field: K, value: V) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_filters(mut self, filters: BTreeMap<String, Value>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Resolved `datastore_search` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatastoreQuery {
    pub resource_id: String,
    /// JSON object string, e.g. `{"establishment_status":"Pass"}`
    pub filters: Option<String>,
    /// Comma-separated column list
    pub fields: Option<String>,
    pub sort: Option<String>,
    pub limit: u32,
}

impl DatastoreQuery {
    /// Parameters for [`toronto_ckan::CkanClient::datastore_search`], `id` excluded.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(filters) = &self.filters {
            params.push(("filters", filters.clone()));
        }
        if let Some(fields) = &self.fields {
            params.push(("fields", fields.clone()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        params
    }
}

/// Build the datastore request for `spec` against `resource_id`.
///
/// When `schema` is known every filter field must appear in it. Pass `None`
/// when the schema lookup failed; the filters then go out unvalidated and
/// the portal gets the final word.
pub fn build(
    spec: &QuerySpec,
    resource_id: &str,
    schema: Option<&[SchemaField]>,
) -> Result<DatastoreQuery> {
    if spec.limit == 0 {
        return Err(TorontoError::invalid_argument(
            "limit must be a positive integer",
        ));
    }

    for (field, value) in &spec.filters {
        if !is_filter_value(value) {
            return Err(TorontoError::invalid_argument(format!(
                "filter '{field}' must be a string, number, boolean or a list of those"
            )));
        }
    }

    if let Some(schema) = schema {
        let known = |name: &str| name == INTERNAL_ID_FIELD || schema.iter().any(|f| f.name == name);
        if let Some(field) = spec.filters.keys().find(|field| !known(field.as_str())) {
            return Err(TorontoError::InvalidFilter {
                field: field.clone(),
                available: schema.iter().map(|f| f.name.clone()).collect(),
            });
        }
    }

    let filters = if spec.filters.is_empty() {
        None
    } else {
        Some(
            serde_json::to_string(&spec.filters)
                .map_err(|e| TorontoError::invalid_argument(e.to_string()))?,
        )
    };

    let fields = spec
        .fields
        .as_ref()
        .map(|fields| {
            fields
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|fields| !fields.is_empty())
        .map(|fields| fields.join(","));

    Ok(DatastoreQuery {
        resource_id: resource_id.to_string(),
        filters,
        fields,
        sort: spec.sort.as_ref().map(SortSpec::to_string),
        limit: spec.limit.min(MAX_LIMIT),
    })
}

fn is_filter_value(value: &Value) -> bool {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => true,
        Value::Array(items) => items
            .iter()
            .all(|v| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_))),
        Value::Null | Value::Object(_) => false,
    }
}
