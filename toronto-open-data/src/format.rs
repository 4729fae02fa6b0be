//! Plain-text rendering of tool results for LLM callers.
//!
//! Every function here is pure. Output is light Markdown: bold headings,
//! bullet lists and back-ticked identifiers the caller can paste into the
//! next tool call.

use crate::csv_preview::CsvPreview;
use crate::error::TorontoError;
use crate::model::{DatasetRecord, DatasetSchema, ResourceDescriptor, ResourceKind, SchemaField};
use crate::popular::{self, BUSINESS_LICENCES, POPULAR_DATASETS};
use crate::query::MAX_LIMIT;
use crate::report::{DatasetStats, DatastoreStatus, PreviewAttempt, QueryOutcome, SmartBody, SmartReport};
use serde_json::{Map, Value};

const DESCRIPTION_PREVIEW_CHARS: usize = 150;
const TAG_PREVIEW_COUNT: usize = 5;

/// Cut `text` to `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

/// Digits grouped by thousands, e.g. `12,345`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn push_record(lines: &mut Vec<String>, index: usize, columns: &[String], row: &Map<String, Value>) {
    lines.push(format!("**Record {index}:**"));
    if columns.is_empty() {
        for (key, value) in row {
            lines.push(format!("  - {key}: {}", display_value(value)));
        }
    } else {
        for column in columns {
            if let Some(value) = row.get(column) {
                lines.push(format!("  - {column}: {}", display_value(value)));
            }
        }
    }
}

fn push_resource_urls(lines: &mut Vec<String>, resources: &[ResourceDescriptor]) {
    for (i, resource) in resources.iter().enumerate() {
        lines.push(format!(
            "  {}. {} ({})",
            i + 1,
            resource.display_name(),
            resource.format_label()
        ));
        if let Some(url) = &resource.url {
            lines.push(format!("     URL: {url}"));
        }
    }
}

fn field_list(fields: &[SchemaField]) -> String {
    fields
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_search_results(query: &str, records: &[DatasetRecord]) -> String {
    if records.is_empty() {
        return format!(
            "No datasets found for '{query}'. Try broader terms like 'permits', 'inspections', \
             'parks', 'traffic' or 'budget' with `toronto_search_datasets`, or browse \
             `toronto_popular_datasets`."
        );
    }

    let mut lines = vec![format!(
        "**Found {} Toronto datasets for '{query}':**",
        records.len()
    )];
    for (i, record) in records.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("**{}. {}**", i + 1, record.title));
        lines.push(format!("   ID: `{}`", record.id));
        if let Some(curated) = popular::find(&record.id) {
            lines.push(format!("   Popular: {}", curated.summary));
        }
        if let Some(description) = &record.description {
            lines.push(format!(
                "   Description: {}",
                truncate(description, DESCRIPTION_PREVIEW_CHARS)
            ));
        }
        if !record.tags.is_empty() {
            let tags: Vec<&str> = record
                .tags
                .iter()
                .take(TAG_PREVIEW_COUNT)
                .map(String::as_str)
                .collect();
            lines.push(format!("   Tags: {}", tags.join(", ")));
        }
    }
    lines.push(String::new());
    lines.push(
        "**Next step:** call `toronto_smart_data_helper` with a dataset_id from above and your question."
            .to_string(),
    );
    lines.join("\n")
}

pub fn format_schema(schema: &DatasetSchema) -> String {
    let title = &schema.dataset.title;
    if schema.fields.is_empty() {
        return format!(
            "The datastore for '{title}' (resource `{}`) reports no fields.",
            schema.resource_id
        );
    }

    let mut lines = vec![format!(
        "**Schema for {title}** (datastore resource `{}`):",
        schema.resource_id
    )];
    if let Some(total) = schema.total {
        lines.push(format!("Records: {}", group_thousands(total)));
    }
    for field in &schema.fields {
        lines.push(format!("- **{}**: {}", field.name, field.field_type));
    }
    lines.push(String::new());
    lines.push(
        "**Usage:** copy exact field names into `toronto_query_dataset_data` filters, fields and sort."
            .to_string(),
    );
    lines.join("\n")
}

pub fn format_query_result(outcome: &QueryOutcome) -> String {
    let title = &outcome.dataset.title;
    let result = &outcome.result;
    if result.rows.is_empty() {
        return format!(
            "No rows in '{title}' matched the query. Check filter values with \
             `toronto_smart_data_helper` (dataset_id=\"{}\") to see sample records.",
            outcome.dataset.id
        );
    }

    let shown = result.rows.len() as u64;
    let header = match result.total {
        Some(total) => format!(
            "**Query results for {title}** (showing {shown} of {}):",
            group_thousands(total)
        ),
        None => format!("**Query results for {title}** (showing {shown}):"),
    };

    let mut lines = vec![header];
    for (i, row) in result.rows.iter().enumerate() {
        lines.push(String::new());
        push_record(&mut lines, i + 1, &result.columns, row);
    }
    if !outcome.validated && !outcome.query.filters.as_deref().unwrap_or("").is_empty() {
        lines.push(String::new());
        lines.push("Note: filters were sent without schema validation.".to_string());
    }
    if result.truncated {
        lines.push(String::new());
        lines.push(format!(
            "More rows match. Raise `limit` (up to {MAX_LIMIT}) or narrow the filters."
        ));
    }
    lines.join("\n")
}

pub fn format_csv_preview(preview: &CsvPreview) -> String {
    let mut lines = if preview.truncated {
        vec![format!(
            "**First {} lines of CSV data** from {}:",
            preview.line_count(),
            preview.url
        )]
    } else {
        vec![format!(
            "**CSV data (all {} lines)** from {}:",
            preview.line_count(),
            preview.url
        )]
    };

    lines.push("```csv".to_string());
    lines.extend(preview.lines.iter().cloned());
    lines.push("```".to_string());

    if !preview.header.is_empty() {
        let columns: Vec<String> = preview
            .header
            .iter()
            .zip(&preview.column_types)
            .map(|(name, ty)| format!("{name} ({ty})"))
            .collect();
        lines.push(format!("Columns: {}", columns.join(", ")));
    }

    if preview.truncated {
        lines.push(format!(
            "... (file truncated, more data exists; raise `max_lines` up to {} to read more)",
            crate::config::MAX_PREVIEW_LINES
        ));
    }
    lines.join("\n")
}

pub fn format_smart_report(report: &SmartReport) -> String {
    let mut lines = vec![format!("**{}** (`{}`)", report.dataset.title, report.dataset.id)];

    match &report.body {
        SmartBody::Datastore {
            resource,
            fields,
            relevant_fields,
            sample,
        } => {
            lines.push(format!(
                "**Type:** API data (queryable datastore resource `{}`)",
                resource.id
            ));
            lines.push(format!("**Available fields:** {}", field_list(fields)));
            if let Some(total) = sample.total {
                lines.push(format!("**Total records:** {}", group_thousands(total)));
            }
            if !relevant_fields.is_empty() {
                lines.push(format!(
                    "**Fields that look relevant to your question:** {}",
                    relevant_fields.join(", ")
                ));
            }

            if sample.rows.is_empty() {
                lines.push("No records found in this dataset.".to_string());
            } else {
                lines.push(format!(
                    "**Sample data** (showing {} records):",
                    sample.rows.len()
                ));
                for (i, row) in sample.rows.iter().enumerate() {
                    lines.push(String::new());
                    push_record(&mut lines, i + 1, &sample.columns, row);
                }
            }

            lines.push(String::new());
            lines.push("**Filtering and sorting:** call `toronto_query_dataset_data` with".to_string());
            lines.push("  - filters={\"field_name\": \"value\"}".to_string());
            lines.push("  - sort=\"field_name asc\" or \"field_name desc\"".to_string());
            lines.push("  - fields=[\"field_a\", \"field_b\"]".to_string());
        }
        SmartBody::Files {
            downloadable,
            preview,
        } => {
            lines.push("**Type:** downloadable files (no queryable API)".to_string());
            lines.push(format!(
                "**Found {} downloadable file(s):**",
                downloadable.len()
            ));
            push_resource_urls(&mut lines, downloadable);

            match preview {
                Some(PreviewAttempt::Fetched { preview }) => {
                    lines.push(String::new());
                    lines.push(format_csv_preview(preview));
                    lines.push(String::new());
                    lines.push(format!(
                        "**More data:** call `toronto_fetch_csv_data` with csv_url=\"{}\" and a larger max_lines.",
                        preview.url
                    ));
                }
                Some(PreviewAttempt::Failed { url, error }) => {
                    lines.push(String::new());
                    lines.push(format!("Could not preview {url}: {error}"));
                    lines.push(
                        "Retry with `toronto_fetch_csv_data` or download the file directly."
                            .to_string(),
                    );
                }
                None => {
                    lines.push(String::new());
                    lines.push("**How to access the data:**".to_string());
                    if downloadable.iter().any(ResourceDescriptor::is_csv) {
                        lines.push(
                            "  - CSV files: call `toronto_fetch_csv_data` with the file's URL".to_string(),
                        );
                    }
                    if downloadable.iter().any(|r| r.kind() == ResourceKind::Spreadsheet) {
                        lines.push("  - XLS/XLSX files: download manually from the URLs above".to_string());
                    }
                    lines.push(format!(
                        "  - Every resource: `toronto_get_dataset_details` (dataset_id=\"{}\")",
                        report.dataset.id
                    ));
                }
            }
        }
    }

    lines.push(String::new());
    lines.push(format!("**For your question:** \"{}\"", report.question));
    lines.join("\n")
}

pub fn format_dataset_details(record: &DatasetRecord) -> String {
    let mut lines = vec![
        format!("**Dataset:** {} (`{}`)", record.title, record.id),
        format!(
            "**Description:** {}",
            record.description.as_deref().unwrap_or("N/A")
        ),
        format!(
            "**Organization:** {}",
            record.organization.as_deref().unwrap_or("N/A")
        ),
        format!("**Total resources:** {}", record.resources.len()),
    ];
    if !record.tags.is_empty() {
        lines.push(format!("**Tags:** {}", record.tags.join(", ")));
    }

    lines.push(String::new());
    lines.push("**Resources:**".to_string());
    if record.resources.is_empty() {
        lines.push("- No resources found for this dataset.".to_string());
    }
    for (i, resource) in record.resources.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("**Resource {}:**", i + 1));
        lines.push(format!("  Name: {}", resource.display_name()));
        lines.push(format!("  ID: {}", resource.id));
        lines.push(format!("  Format: {}", resource.format_label()));
        lines.push(format!("  Type: {}", resource.kind()));
        if !resource.queryable {
            match &resource.url {
                Some(url) => lines.push(format!("  Download URL: {url}")),
                None => lines.push("  Download URL: not available".to_string()),
            }
        }
    }
    lines.join("\n")
}

pub fn format_dataset_stats(stats: &DatasetStats) -> String {
    let dataset = &stats.dataset;
    let mut lines = vec![
        format!("**Statistics for {}:**", dataset.title),
        format!("Total resources listed: {}", dataset.resources.len()),
    ];

    match &stats.datastore {
        DatastoreStatus::Available {
            resource_id,
            total,
            fields,
        } => {
            lines.push(format!("Datastore resource: `{resource_id}`"));
            lines.push(format!(
                "**Record count:** {}",
                total.map(group_thousands).unwrap_or_else(|| "N/A".to_string())
            ));
            lines.push(format!("**Field count:** {}", fields.len()));
            if !fields.is_empty() {
                lines.push(String::new());
                lines.push("**Fields:**".to_string());
                for field in fields {
                    lines.push(format!("- {}: {}", field.name, field.field_type));
                }
            }
        }
        DatastoreStatus::Unavailable { resource_id, error } => {
            lines.push(format!(
                "Could not read datastore resource `{resource_id}`: {error}"
            ));
        }
        DatastoreStatus::Missing => {
            lines.push("No active datastore; record count and field list are not available.".to_string());
            let downloadable: Vec<ResourceDescriptor> = dataset
                .resources
                .iter()
                .filter(|r| r.is_downloadable())
                .cloned()
                .collect();
            if downloadable.is_empty() {
                lines.push("No downloadable CSV/XLS/XLSX resources found.".to_string());
            } else {
                lines.push(String::new());
                lines.push("**Downloadable resources** (inspect manually for counts and schema):".to_string());
                push_resource_urls(&mut lines, &downloadable);
            }
        }
    }
    lines.join("\n")
}

pub fn format_dataset_list(names: &[String]) -> String {
    if names.is_empty() {
        return "The catalog returned no datasets.".to_string();
    }

    let mut lines = vec![format!("**{} Toronto Open Data datasets:**", names.len())];
    lines.extend(names.iter().map(|name| format!("- `{name}`")));
    lines.push(String::new());
    lines.push(
        "**Next step:** `toronto_get_dataset_details` or `toronto_smart_data_helper` with an id from above."
            .to_string(),
    );
    lines.join("\n")
}

pub fn format_popular_datasets() -> String {
    let mut lines = vec!["**Most popular Toronto Open Data datasets**".to_string()];
    for category in POPULAR_DATASETS {
        lines.push(String::new());
        lines.push(format!("**{}**", category.name));
        for dataset in category.datasets {
            lines.push(format!("- `{}`: {}", dataset.id, dataset.summary));
        }
    }
    lines.push(String::new());
    lines.push("**Next steps:**".to_string());
    lines.push(format!(
        "1. Business addresses: `toronto_smart_data_helper` (dataset_id=\"{BUSINESS_LICENCES}\", user_question=\"find [business name]\")"
    ));
    lines.push(
        "2. Other data: `toronto_smart_data_helper` (dataset_id=\"id_from_above\", user_question=\"what you want to know\")"
            .to_string(),
    );
    lines.push("3. Other topics: `toronto_search_datasets` (query=\"your keywords\")".to_string());
    lines.join("\n")
}

pub fn start_here_guide() -> String {
    format!(
        "**Toronto Open Data MCP server: start here**

This server reads the City of Toronto's official open data catalog.

**Workflow:**
1. Specific businesses or restaurants: `toronto_smart_data_helper` (dataset_id=\"{BUSINESS_LICENCES}\", user_question=\"find [business name]\")
2. Other topics: `toronto_search_datasets` (query=\"your topic\") to find dataset ids
3. Get data: `toronto_smart_data_helper` (dataset_id=\"found_id\", user_question=\"what you want to know\"); it handles API and CSV datasets
4. Precise filtering: `toronto_get_dataset_schema`, then `toronto_query_dataset_data` with exact field names

**Data types:**
- API data (datastore): inspections, permits, locations; supports filters, sort and field selection
- File downloads: historical and annual data; CSV files can be previewed with `toronto_fetch_csv_data`

**Tips:**
- Use terms that match government wording (e.g. 'licences', 'inspections', 'ward')
- Query limits are capped at {MAX_LIMIT} rows and CSV previews at {} lines

**Next step:** `toronto_search_datasets` or `toronto_popular_datasets`.",
        crate::config::MAX_PREVIEW_LINES
    )
}

/// The single follow-up tool call suggested for a failure.
pub fn suggestion(err: &TorontoError) -> String {
    match err {
        TorontoError::NotFound { .. } => {
            "Call `toronto_search_datasets` with a broader term to find the right dataset_id.".to_string()
        }
        TorontoError::NotQueryable {
            dataset_id,
            downloadable,
            ..
        } => {
            if let Some(url) = downloadable.iter().find(|r| r.is_csv()).and_then(|r| r.url.as_deref()) {
                format!("Call `toronto_fetch_csv_data` with csv_url=\"{url}\" to read the file instead.")
            } else {
                format!(
                    "Call `toronto_get_dataset_details` (dataset_id=\"{dataset_id}\") to see its downloadable files."
                )
            }
        }
        TorontoError::NoUsableResource { dataset_id, .. } => format!(
            "Call `toronto_get_dataset_details` (dataset_id=\"{dataset_id}\") to inspect the available resources."
        ),
        TorontoError::InvalidFilter { available, .. } => format!(
            "Call `toronto_get_dataset_schema` for exact field names. Available: {}",
            available.join(", ")
        ),
        TorontoError::Http(err) => {
            let message = err.to_string().to_lowercase();
            if message.contains("field") || message.contains("column") {
                "Call `toronto_get_dataset_schema` to get exact (case-sensitive) field names.".to_string()
            } else if err.is_not_found() {
                "Call `toronto_search_datasets` to find a valid dataset_id.".to_string()
            } else {
                "The portal may be unavailable; retry shortly or try `toronto_popular_datasets`.".to_string()
            }
        }
        TorontoError::Fetch { .. } => {
            "Check the download URL with `toronto_get_dataset_details`.".to_string()
        }
        TorontoError::EmptyResource { .. } => {
            "Call `toronto_fetch_csv_data` with max_lines of at least 1, or pick another file via `toronto_get_dataset_details`."
                .to_string()
        }
        TorontoError::InvalidArgument { .. } => {
            "Call `toronto_start_here` for argument examples.".to_string()
        }
        TorontoError::Decode { .. } => {
            "The portal returned an unexpected payload; try `toronto_get_dataset_details` to inspect the dataset."
                .to_string()
        }
    }
}

/// Failure kind, cause and one suggestion.
pub fn format_error(err: &TorontoError) -> String {
    let mut lines = vec![format!("**{}**: {err}", err.kind())];

    if let TorontoError::NotQueryable {
        title,
        downloadable,
        ..
    } = err
    {
        lines.push(format!(
            "'{title}' has no queryable API, so filters, field selection and sorting do not apply."
        ));
        if !downloadable.is_empty() {
            lines.push("Downloadable files:".to_string());
            push_resource_urls(&mut lines, downloadable);
        }
    }

    lines.push(format!("**Suggestion:** {}", suggestion(err)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldType, QueryResult};
    use crate::query::DatastoreQuery;
    use serde_json::json;
    use toronto_ckan::CkanError;

    fn record(id: &str, title: &str) -> DatasetRecord {
        DatasetRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            tags: vec![],
            organization: None,
            resources: vec![],
        }
    }

    fn csv_resource(id: &str, url: &str) -> ResourceDescriptor {
        ResourceDescriptor {
            id: id.to_string(),
            name: Some("Annual file".to_string()),
            format: Some("CSV".to_string()),
            mimetype: None,
            url: Some(url.to_string()),
            queryable: false,
        }
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("café au lait", 4), "café...");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn empty_search_suggests_broader_terms() {
        let text = format_search_results("zzz", &[]);
        assert!(text.contains("No datasets found for 'zzz'"));
        assert!(text.contains("toronto_search_datasets"));
    }

    #[test]
    fn search_results_list_ids() {
        let mut dinesafe = record("dinesafe", "DineSafe");
        dinesafe.description = Some("x".repeat(400));
        dinesafe.tags = (0..8).map(|i| format!("t{i}")).collect();

        let text = format_search_results("restaurant", &[dinesafe]);
        assert!(text.contains("**1. DineSafe**"));
        assert!(text.contains("ID: `dinesafe`"));
        assert!(text.contains("Tags: t0, t1, t2, t3, t4\n"));
        assert!(text.contains(&format!("{}...", "x".repeat(150))));
    }

    #[test]
    fn search_results_flag_curated_datasets() {
        let text = format_search_results(
            "restaurant",
            &[record("dinesafe", "DineSafe"), record("obscure-thing", "Obscure")],
        );
        let summary = popular::find("dinesafe").unwrap().summary;
        assert!(text.contains(&format!("ID: `dinesafe`\n   Popular: {summary}")));
        assert_eq!(text.matches("Popular:").count(), 1);
    }

    #[test]
    fn query_result_keeps_column_order_and_notes_truncation() {
        let row = json!({"zeta": 1, "alpha": "Pass"});
        let outcome = QueryOutcome {
            dataset: record("dinesafe", "DineSafe"),
            resource_id: "r".to_string(),
            query: DatastoreQuery {
                resource_id: "r".to_string(),
                filters: None,
                fields: None,
                sort: None,
                limit: 1,
            },
            result: QueryResult {
                columns: vec!["zeta".to_string(), "alpha".to_string()],
                rows: vec![row.as_object().cloned().unwrap()],
                total: Some(2500),
                truncated: true,
            },
            validated: true,
        };

        let text = format_query_result(&outcome);
        assert!(text.contains("(showing 1 of 2,500)"));
        let zeta = text.find("zeta: 1").unwrap();
        let alpha = text.find("alpha: Pass").unwrap();
        assert!(zeta < alpha);
        assert!(text.contains("More rows match"));
    }

    #[test]
    fn not_queryable_error_points_at_csv() {
        let err = TorontoError::NotQueryable {
            dataset_id: "ttc".to_string(),
            title: "TTC Ridership".to_string(),
            downloadable: vec![csv_resource("a", "https://x/a.csv")],
        };
        let text = format_error(&err);
        assert!(text.starts_with("**NotQueryableError**"));
        assert!(text.contains("https://x/a.csv"));
        assert!(text.contains("toronto_fetch_csv_data"));
    }

    #[test]
    fn field_errors_point_at_schema_tool() {
        let err = TorontoError::Http(CkanError::ApiError {
            status: 409,
            message: "Validation Error: filters: field \"status\" not in table".to_string(),
        });
        assert!(suggestion(&err).contains("toronto_get_dataset_schema"));

        let err = TorontoError::InvalidFilter {
            field: "status".to_string(),
            available: vec!["establishment_status".to_string()],
        };
        let text = format_error(&err);
        assert!(text.contains("InvalidFilterError"));
        assert!(text.contains("establishment_status"));
    }

    #[test]
    fn every_error_kind_has_a_tool_suggestion() {
        let errors = vec![
            TorontoError::NotFound { dataset_id: "x".into() },
            TorontoError::NoUsableResource { dataset_id: "x".into(), formats: vec![] },
            TorontoError::fetch("https://x", Some(500), "HTTP 500"),
            TorontoError::EmptyResource { url: "https://x".into() },
            TorontoError::invalid_argument("bad"),
            TorontoError::Decode { message: "bad".into() },
        ];
        for err in errors {
            assert!(suggestion(&err).contains("`toronto_"), "{err:?}");
        }
    }

    #[test]
    fn csv_preview_lists_column_types() {
        let preview = CsvPreview {
            url: "https://x/a.csv".to_string(),
            lines: vec!["name,score".to_string(), "A,1".to_string()],
            header: vec!["name".to_string(), "score".to_string()],
            rows: vec![vec!["A".to_string(), "1".to_string()]],
            column_types: vec![FieldType::Text, FieldType::Integer],
            truncated: true,
        };
        let text = format_csv_preview(&preview);
        assert!(text.contains("First 2 lines"));
        assert!(text.contains("Columns: name (text), score (integer)"));
        assert!(text.contains("file truncated"));
    }

    #[test]
    fn details_show_download_urls_for_files_only() {
        let mut dataset = record("ttc", "TTC Ridership");
        dataset.resources = vec![
            csv_resource("file", "https://x/a.csv"),
            ResourceDescriptor {
                id: "api".to_string(),
                name: None,
                format: Some("CSV".to_string()),
                mimetype: None,
                url: Some("https://x/api.csv".to_string()),
                queryable: true,
            },
        ];

        let text = format_dataset_details(&dataset);
        assert!(text.contains("**Total resources:** 2"));
        assert!(text.contains("Download URL: https://x/a.csv"));
        assert!(!text.contains("https://x/api.csv"));
        assert!(text.contains("Type: Active Datastore (queryable via API)"));
        assert!(text.contains("**Organization:** N/A"));
    }

    #[test]
    fn popular_and_guide_mention_tools() {
        assert!(format_popular_datasets().contains("`dinesafe`"));
        assert!(start_here_guide().contains("toronto_search_datasets"));
    }
}
