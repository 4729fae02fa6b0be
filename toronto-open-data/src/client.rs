use futures::StreamExt;
use tracing::{debug, warn};
use url::Url;

use crate::catalog;
use crate::config::TorontoConfig;
use crate::csv_preview::{CsvPreview, LineBuffer, decode_line};
use crate::error::{Result, TorontoError};
use crate::model::{DatasetRecord, DatasetSchema, INTERNAL_ID_FIELD, QueryResult, ResourceDescriptor, SchemaField};
use crate::query::{self, MAX_LIMIT, QuerySpec};
use crate::report::{DatasetStats, DatastoreStatus, PreviewAttempt, QueryOutcome, SmartBody, SmartReport};
use crate::resolver::{self, AccessPath};
use toronto_ckan::{CkanClient, Configuration as CkanConfiguration, models::DatastoreSearchResult};

/// `package_search` rows fetched per requested result, leaving room for the
/// local relevance filter to discard weak candidates.
const SEARCH_CANDIDATE_FACTOR: u32 = 3;

/// Lines the smart helper reads when it previews a lone CSV file.
pub const SMART_PREVIEW_LINES: usize = 10;

/// High-level client for the Toronto Open Data portal
///
/// Wraps the CKAN client with dataset resolution, query building and CSV
/// previews. Every method is request-scoped: nothing is cached between calls.
#[derive(Debug)]
pub struct TorontoClient {
    ckan: CkanClient,
    config: TorontoConfig,
    http_client: reqwest::Client,
}

impl TorontoClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(TorontoConfig::new())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: TorontoConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TorontoError::invalid_argument(format!("HTTP client setup failed: {e}")))?;

        // Share one connection pool between catalog calls and CSV downloads
        let ckan_config = CkanConfiguration {
            client: http_client.clone(),
            timeout: config.timeout(),
            ..(*config.ckan_config).clone()
        };
        let ckan = CkanClient::new(std::sync::Arc::new(ckan_config));

        Ok(Self {
            ckan,
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &TorontoConfig {
        &self.config
    }

    // === Search and Discovery ===

    /// Search datasets by keyword.
    ///
    /// Candidates come from `package_search`; only those whose title or
    /// description contains the query (or one of its words) are kept, full
    /// phrase matches first. An empty query returns no datasets.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<DatasetRecord>> {
        let limit = positive_limit(limit)?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let rows = limit.saturating_mul(SEARCH_CANDIDATE_FACTOR).min(MAX_LIMIT);
        debug!(query, rows, "package_search");
        let result = self.ckan.package_search(Some(query), Some(rows), None).await?;

        let candidates: Vec<DatasetRecord> = result
            .results
            .unwrap_or_default()
            .into_iter()
            .map(DatasetRecord::from)
            .collect();

        Ok(catalog::rank_datasets(candidates, query, limit as usize))
    }

    /// Get detailed information about a dataset
    pub async fn get_dataset(&self, dataset_id: &str) -> Result<DatasetRecord> {
        let dataset_id = dataset_id.trim();
        if dataset_id.is_empty() {
            return Err(TorontoError::invalid_argument("dataset_id must not be empty"));
        }

        debug!(dataset_id, "package_show");
        match self.ckan.package_show(dataset_id).await {
            Ok(package) => Ok(DatasetRecord::from(package)),
            Err(err) if err.is_not_found() => Err(TorontoError::NotFound {
                dataset_id: dataset_id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Names of every dataset in the catalog, optionally capped.
    pub async fn list_datasets(&self, limit: Option<u32>) -> Result<Vec<String>> {
        let limit = limit.map(positive_limit).transpose()?;
        Ok(self.ckan.package_list(limit, None).await?)
    }

    /// Column names and types of the dataset's datastore table.
    pub async fn get_schema(&self, dataset_id: &str) -> Result<DatasetSchema> {
        let dataset = self.get_dataset(dataset_id).await?;
        let resource_id = match resolver::first_datastore(&dataset) {
            Some(resource) => resource.id.clone(),
            None => return Err(resolver::not_queryable(&dataset)),
        };

        let result = self.datastore_page(&resource_id, 0).await?;
        let (fields, sample) = split_result(result, 0);

        Ok(DatasetSchema {
            dataset,
            resource_id,
            fields,
            total: sample.total,
        })
    }

    /// Primary resource of a dataset; see [`resolver::resolve`].
    pub async fn resolve(&self, dataset_id: &str) -> Result<ResourceDescriptor> {
        let dataset = self.get_dataset(dataset_id).await?;
        resolver::resolve(&dataset).map(|path| path.resource().clone())
    }

    // === Querying ===

    /// Run a filtered, sorted, projected datastore query.
    ///
    /// Datasets without a datastore table are [`TorontoError::NotQueryable`],
    /// the same answer [`TorontoClient::get_schema`] gives. Filters are
    /// validated against the table schema when it can be read; if the schema
    /// lookup fails they are sent as-is and any portal error is returned
    /// unchanged. Without filters the schema is not fetched.
    pub async fn query(&self, spec: &QuerySpec) -> Result<QueryOutcome> {
        let dataset = self.get_dataset(&spec.dataset_id).await?;
        let resource_id = match resolver::first_datastore(&dataset) {
            Some(resource) => resource.id.clone(),
            None => return Err(resolver::not_queryable(&dataset)),
        };

        let schema = if spec.filters.is_empty() {
            None
        } else {
            match self.datastore_page(&resource_id, 0).await {
                Ok(result) => Some(split_result(result, 0).0),
                Err(err) => {
                    warn!(dataset_id = %spec.dataset_id, error = %err, "schema lookup failed, sending filters unvalidated");
                    None
                }
            }
        };
        let validated = spec.filters.is_empty() || schema.is_some();

        let query = query::build(spec, &resource_id, schema.as_deref())?;
        debug!(resource_id = %resource_id, params = ?query.params(), "datastore_search");
        let result = self
            .ckan
            .datastore_search(&resource_id, &query.params())
            .await?;
        let (_, result) = split_result(result, query.limit);

        Ok(QueryOutcome {
            dataset,
            resource_id,
            query,
            result,
            validated,
        })
    }

    /// Inspect a dataset and return whatever is most useful for `question`:
    /// schema and sample rows for datastore tables, or the file list (with a
    /// preview when there is a single CSV) for download-only datasets.
    pub async fn smart_lookup(&self, dataset_id: &str, question: &str, limit: u32) -> Result<SmartReport> {
        let limit = positive_limit(limit)?.min(MAX_LIMIT);
        let dataset = self.get_dataset(dataset_id).await?;

        let body = match resolver::resolve(&dataset) {
            Ok(AccessPath::Datastore(resource)) => {
                let resource = resource.clone();
                let result = self.datastore_page(&resource.id, limit).await?;
                let (fields, sample) = split_result(result, limit);
                let relevant_fields = catalog::relevant_fields(&fields, question)
                    .into_iter()
                    .map(|f| f.name.clone())
                    .collect();

                SmartBody::Datastore {
                    resource,
                    fields,
                    relevant_fields,
                    sample,
                }
            }
            Ok(AccessPath::CsvDownload { .. }) => self.files_body(&dataset).await,
            // Spreadsheets alone are not previewable but are still worth listing
            Err(TorontoError::NoUsableResource { .. })
                if !resolver::downloadable_resources(&dataset).is_empty() =>
            {
                self.files_body(&dataset).await
            }
            Err(err) => return Err(err),
        };

        Ok(SmartReport {
            dataset,
            question: question.to_string(),
            body,
        })
    }

    /// Resource count plus datastore record count and fields when present.
    pub async fn dataset_stats(&self, dataset_id: &str) -> Result<DatasetStats> {
        let dataset = self.get_dataset(dataset_id).await?;

        let datastore = match resolver::first_datastore(&dataset) {
            None => DatastoreStatus::Missing,
            Some(resource) => match self.datastore_page(&resource.id, 0).await {
                Ok(result) => {
                    let (fields, sample) = split_result(result, 0);
                    DatastoreStatus::Available {
                        resource_id: resource.id.clone(),
                        total: sample.total,
                        fields,
                    }
                }
                Err(err) => DatastoreStatus::Unavailable {
                    resource_id: resource.id.clone(),
                    error: err.to_string(),
                },
            },
        };

        Ok(DatasetStats { dataset, datastore })
    }

    // === CSV ===

    /// Download the first `max_lines` lines of a CSV file.
    ///
    /// The body is streamed and dropped as soon as enough lines are read.
    /// At most `max_preview_bytes` are kept: when a file reaches that ceiling
    /// before `max_lines` complete lines, the last line is cut at the ceiling
    /// and the preview is marked `truncated`. `max_lines` is capped at the
    /// configured preview ceiling; zero is an [`TorontoError::EmptyResource`]
    /// without touching the network.
    pub async fn preview_csv(&self, csv_url: &str, max_lines: usize) -> Result<CsvPreview> {
        let url = Url::parse(csv_url.trim())
            .map_err(|e| TorontoError::invalid_argument(format!("invalid URL '{csv_url}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TorontoError::invalid_argument(
                "URL must start with http:// or https://",
            ));
        }
        if max_lines == 0 {
            return Err(TorontoError::EmptyResource {
                url: csv_url.to_string(),
            });
        }
        let max_lines = max_lines.min(self.config.max_preview_lines);

        debug!(url = %url, max_lines, "fetching CSV preview");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.fetch_error(csv_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TorontoError::fetch(
                csv_url,
                Some(status.as_u16()),
                format!("HTTP {status}"),
            ));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = LineBuffer::with_limit(self.config.max_preview_bytes);
        let mut lines = Vec::with_capacity(max_lines);
        let mut exhausted = false;

        while lines.len() < max_lines {
            if let Some(line) = buffer.next_line() {
                lines.push(decode_line(&line));
                continue;
            }
            if buffer.overflowed() {
                debug!(url = csv_url, bytes = self.config.max_preview_bytes, "CSV preview hit byte ceiling");
                if let Some(rest) = buffer.finish() {
                    lines.push(decode_line(&rest));
                }
                break;
            }
            match stream.next().await {
                Some(chunk) => buffer.push(&chunk.map_err(|e| self.fetch_error(csv_url, e))?),
                None => {
                    if let Some(rest) = buffer.finish() {
                        lines.push(decode_line(&rest));
                    }
                    exhausted = true;
                    break;
                }
            }
        }

        let truncated = !exhausted && {
            loop {
                if buffer.has_pending() || buffer.overflowed() {
                    break true;
                }
                match stream.next().await {
                    Some(Ok(chunk)) => buffer.push(&chunk),
                    Some(Err(_)) | None => break false,
                }
            }
        };

        CsvPreview::from_lines(csv_url, lines, truncated)
    }

    // === Helpers ===

    /// File listing for a dataset without a datastore table, previewing the
    /// file when it is the only download and a CSV.
    async fn files_body(&self, dataset: &DatasetRecord) -> SmartBody {
        let downloadable: Vec<ResourceDescriptor> = resolver::downloadable_resources(dataset)
            .into_iter()
            .cloned()
            .collect();

        let preview = match downloadable.as_slice() {
            [only] if only.is_csv() => match only.url.as_deref() {
                Some(url) => Some(match self.preview_csv(url, SMART_PREVIEW_LINES).await {
                    Ok(preview) => PreviewAttempt::Fetched { preview },
                    Err(err) => {
                        warn!(url, error = %err, "automatic CSV preview failed");
                        PreviewAttempt::Failed {
                            url: url.to_string(),
                            error: err.to_string(),
                        }
                    }
                }),
                None => None,
            },
            _ => None,
        };

        SmartBody::Files {
            downloadable,
            preview,
        }
    }

    async fn datastore_page(&self, resource_id: &str, limit: u32) -> Result<DatastoreSearchResult> {
        debug!(resource_id, limit, "datastore_search");
        Ok(self
            .ckan
            .datastore_search(resource_id, &[("limit", limit.to_string())])
            .await?)
    }

    fn fetch_error(&self, url: &str, err: reqwest::Error) -> TorontoError {
        let message = if err.is_timeout() {
            format!("timed out after {}s", self.config.timeout_secs)
        } else {
            err.to_string()
        };
        TorontoError::fetch(url, err.status().map(|s| s.as_u16()), message)
    }
}

fn positive_limit(limit: u32) -> Result<u32> {
    if limit == 0 {
        Err(TorontoError::invalid_argument("limit must be a positive integer"))
    } else {
        Ok(limit)
    }
}

/// Split a datastore page into its schema (without `_id`) and rows
/// (without `_id`, at most `limit` of them).
fn split_result(result: DatastoreSearchResult, limit: u32) -> (Vec<SchemaField>, QueryResult) {
    let fields: Vec<SchemaField> = result
        .fields
        .into_iter()
        .filter(|f| f.id != INTERNAL_ID_FIELD)
        .map(SchemaField::from)
        .collect();

    let rows: Vec<_> = result
        .records
        .into_iter()
        .take(limit as usize)
        .map(|mut row| {
            row.remove(INTERNAL_ID_FIELD);
            row
        })
        .collect();

    let returned = rows.len() as u64;
    let truncated = match result.total {
        Some(total) => total > returned,
        None => limit > 0 && returned >= u64::from(limit),
    };

    let result = QueryResult {
        columns: fields.iter().map(|f| f.name.clone()).collect(),
        rows,
        total: result.total,
        truncated,
    };

    (fields, result)
}
