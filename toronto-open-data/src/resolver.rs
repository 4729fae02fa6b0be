//! Picks the resource a tool should read a dataset through.

use crate::error::{Result, TorontoError};
use crate::model::{DatasetRecord, ResourceDescriptor};

/// The route to a dataset's data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AccessPath<'a> {
    /// Structured queries through `datastore_search`
    Datastore(&'a ResourceDescriptor),
    /// Bounded preview of a CSV download
    CsvDownload {
        resource: &'a ResourceDescriptor,
        url: &'a str,
    },
}

impl<'a> AccessPath<'a> {
    pub fn resource(&self) -> &'a ResourceDescriptor {
        match self {
            AccessPath::Datastore(resource) => resource,
            AccessPath::CsvDownload { resource, .. } => resource,
        }
    }
}

/// Choose the primary resource of `dataset`.
///
/// The first datastore-active resource wins; otherwise the first CSV
/// resource that has a download URL. Resource order is the catalog's, so the
/// choice is stable for a given snapshot.
pub fn resolve(dataset: &DatasetRecord) -> Result<AccessPath<'_>> {
    if let Some(resource) = first_datastore(dataset) {
        return Ok(AccessPath::Datastore(resource));
    }

    dataset
        .resources
        .iter()
        .filter(|r| r.is_csv())
        .find_map(|resource| {
            resource
                .url
                .as_deref()
                .map(|url| AccessPath::CsvDownload { resource, url })
        })
        .ok_or_else(|| TorontoError::NoUsableResource {
            dataset_id: dataset.id.clone(),
            formats: dataset
                .resources
                .iter()
                .map(|r| r.format_label().to_string())
                .collect(),
        })
}

pub fn first_datastore(dataset: &DatasetRecord) -> Option<&ResourceDescriptor> {
    dataset.resources.iter().find(|r| r.queryable)
}

/// CSV and spreadsheet resources with a download URL, in catalog order.
pub fn downloadable_resources(dataset: &DatasetRecord) -> Vec<&ResourceDescriptor> {
    dataset
        .resources
        .iter()
        .filter(|r| r.is_downloadable() && r.url.is_some())
        .collect()
}

/// `NotQueryable` for a dataset without a datastore resource.
pub fn not_queryable(dataset: &DatasetRecord) -> TorontoError {
    TorontoError::NotQueryable {
        dataset_id: dataset.id.clone(),
        title: dataset.title.clone(),
        downloadable: downloadable_resources(dataset)
            .into_iter()
            .cloned()
            .collect(),
    }
}
