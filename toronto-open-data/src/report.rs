use crate::csv_preview::CsvPreview;
use crate::model::{DatasetRecord, QueryResult, ResourceDescriptor, SchemaField};
use crate::query::DatastoreQuery;
use serde::Serialize;

/// Outcome of a filtered datastore query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub dataset: DatasetRecord,
    pub resource_id: String,
    #[serde(skip)]
    pub query: DatastoreQuery,
    pub result: QueryResult,
    /// No filter went out unchecked: they were validated against the table
    /// schema, or there were none
    pub validated: bool,
}

/// What the smart helper found for a dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SmartReport {
    pub dataset: DatasetRecord,
    pub question: String,
    pub body: SmartBody,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SmartBody {
    /// Queryable table: schema plus a first page of rows
    Datastore {
        resource: ResourceDescriptor,
        fields: Vec<SchemaField>,
        /// Fields whose names overlap the question
        relevant_fields: Vec<String>,
        sample: QueryResult,
    },
    /// File downloads only
    Files {
        downloadable: Vec<ResourceDescriptor>,
        /// Automatic preview, attempted when there is exactly one CSV file
        preview: Option<PreviewAttempt>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreviewAttempt {
    Fetched { preview: CsvPreview },
    Failed { url: String, error: String },
}

/// Size and shape of a dataset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetStats {
    pub dataset: DatasetRecord,
    pub datastore: DatastoreStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatastoreStatus {
    /// No resource is loaded in the datastore
    Missing,
    Available {
        resource_id: String,
        total: Option<u64>,
        fields: Vec<SchemaField>,
    },
    /// The datastore resource exists but could not be read
    Unavailable { resource_id: String, error: String },
}
