//! End-to-end tests for `TorontoClient` against a mocked CKAN portal.

use serde_json::{Value, json};
use toronto_open_data::{
    DatastoreStatus, PreviewAttempt, QuerySpec, SmartBody, SortSpec, TorontoClient, TorontoConfig,
    TorontoError,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_client(server: &MockServer) -> TorontoClient {
    let config = TorontoConfig::new()
        .with_base_url(format!("{}/api/3", server.uri()))
        .with_user_agent("toronto-open-data-test/1.0")
        .with_timeout(5);

    TorontoClient::with_config(config).expect("client should build")
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "help": "https://example.org/api/3/action/help_show",
        "success": true,
        "result": result,
    }))
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "help": "https://example.org/api/3/action/help_show",
        "success": false,
        "error": {"__type": "Not Found Error", "message": "Not found"}
    }))
}

fn dinesafe_package() -> Value {
    json!({
        "id": "b6b4f3fb",
        "name": "dinesafe",
        "title": "DineSafe",
        "notes": "Restaurant inspection results",
        "organization": {"name": "tph", "title": "Toronto Public Health"},
        "resources": [
            {
                "id": "dinesafe-datastore",
                "name": "Dinesafe",
                "format": "CSV",
                "url": "https://example.org/dinesafe.csv",
                "datastore_active": true
            }
        ]
    })
}

fn dinesafe_fields() -> Value {
    json!([
        {"id": "_id", "type": "int"},
        {"id": "establishment_name", "type": "text"},
        {"id": "establishment_status", "type": "text"},
        {"id": "inspection_date", "type": "date"}
    ])
}

fn csv_only_package(csv_url: &str) -> Value {
    json!({
        "name": "ttc-ridership",
        "title": "TTC Ridership",
        "resources": [
            {"id": "ridership-csv", "name": "Ridership 2023", "format": "CSV", "url": csv_url, "datastore_active": false}
        ]
    })
}

async fn mount_package(server: &MockServer, id: &str, package: Value) {
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_show"))
        .and(query_param("id", id))
        .respond_with(ok(package))
        .mount(server)
        .await;
}

async fn mount_schema(server: &MockServer, resource_id: &str, total: u64) {
    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("id", resource_id))
        .and(query_param("limit", "0"))
        .respond_with(ok(json!({
            "resource_id": resource_id,
            "fields": dinesafe_fields(),
            "records": [],
            "total": total
        })))
        .mount(server)
        .await;
}

fn csv_body(lines: usize) -> String {
    let mut body = String::from("id,name,opened\n");
    for i in 1..lines {
        body.push_str(&format!("{i},Place {i},2024-01-{:02}\n", (i % 28) + 1));
    }
    body
}

#[tokio::test]
async fn test_search_ranks_and_filters_candidates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .and(query_param("q", "parking lot"))
        .and(query_param("rows", "6"))
        .respond_with(ok(json!({
            "count": 3,
            "results": [
                {"name": "bike-parking", "title": "Bicycle Parking", "notes": "Racks for parking bicycles"},
                {"name": "tagged-only", "title": "Street Furniture", "tags": [{"name": "parking"}]},
                {"name": "green-p", "title": "Green P Parking", "notes": "Municipal parking lot locations"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let results = client.search("parking lot", 2).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["green-p", "bike-parking"]);
}

#[tokio::test]
async fn test_empty_search_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .respond_with(ok(json!({"count": 0, "results": []})))
        .expect(0)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    assert!(client.search("   ", 10).await.unwrap().is_empty());
    assert_eq!(
        client.search("parks", 0).await.unwrap_err().kind(),
        "InvalidArgumentError"
    );
}

#[tokio::test]
async fn test_unknown_dataset_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_show"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    match client.get_dataset("no-such-dataset").await.unwrap_err() {
        TorontoError::NotFound { dataset_id } => assert_eq!(dataset_id, "no-such-dataset"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_schema_hides_internal_id() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;
    mount_schema(&server, "dinesafe-datastore", 82_341).await;

    let client = create_test_client(&server);
    let schema = client.get_schema("dinesafe").await.unwrap();

    assert_eq!(schema.resource_id, "dinesafe-datastore");
    let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["establishment_name", "establishment_status", "inspection_date"]
    );
    assert_eq!(schema.total, Some(82_341));
}

#[tokio::test]
async fn test_resolve_prefers_datastore_then_csv() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;
    mount_package(&server, "ttc-ridership", csv_only_package("https://example.org/r.csv")).await;

    let client = create_test_client(&server);
    let resource = client.resolve("dinesafe").await.unwrap();
    assert_eq!(resource.id, "dinesafe-datastore");
    assert!(resource.queryable);

    let resource = client.resolve("ttc-ridership").await.unwrap();
    assert_eq!(resource.id, "ridership-csv");
    assert!(!resource.queryable);
}

#[tokio::test]
async fn test_schema_of_file_dataset_is_not_queryable() {
    let server = MockServer::start().await;
    mount_package(&server, "ttc-ridership", csv_only_package("https://example.org/r.csv")).await;

    let client = create_test_client(&server);
    match client.get_schema("ttc-ridership").await.unwrap_err() {
        TorontoError::NotQueryable {
            dataset_id,
            downloadable,
            ..
        } => {
            assert_eq!(dataset_id, "ttc-ridership");
            assert_eq!(downloadable.len(), 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_query_dinesafe_returns_matching_rows() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;
    mount_schema(&server, "dinesafe-datastore", 82_341).await;

    let records: Vec<Value> = (1..=5)
        .map(|i| {
            json!({
                "_id": i,
                "establishment_name": format!("Restaurant {i}"),
                "establishment_status": "Pass",
                "inspection_date": "2024-03-01"
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("id", "dinesafe-datastore"))
        .and(query_param("limit", "5"))
        .and(query_param("filters", r#"{"establishment_status":"Pass"}"#))
        .and(query_param("sort", "inspection_date desc"))
        .respond_with(ok(json!({
            "fields": dinesafe_fields(),
            "records": records,
            "total": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let spec = QuerySpec::new("dinesafe")
        .with_filter("establishment_status", "Pass")
        .with_sort(SortSpec::desc("inspection_date"))
        .with_limit(5);
    let outcome = client.query(&spec).await.unwrap();

    assert!(outcome.validated);
    assert_eq!(outcome.resource_id, "dinesafe-datastore");
    assert_eq!(outcome.result.rows.len(), 5);
    assert!(!outcome.result.truncated);
    assert_eq!(
        outcome.result.columns,
        vec!["establishment_name", "establishment_status", "inspection_date"]
    );
    for row in &outcome.result.rows {
        assert_eq!(row["establishment_status"], "Pass");
        assert!(!row.contains_key("_id"));
    }
}

#[tokio::test]
async fn test_query_never_exceeds_limit() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;

    // A misbehaving portal returning more rows than asked for
    let records: Vec<Value> = (1..=8).map(|i| json!({"_id": i, "establishment_name": "x"})).collect();
    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("limit", "3"))
        .respond_with(ok(json!({"fields": dinesafe_fields(), "records": records, "total": 100})))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let outcome = client
        .query(&QuerySpec::new("dinesafe").with_limit(3))
        .await
        .unwrap();

    assert_eq!(outcome.result.rows.len(), 3);
    assert!(outcome.result.truncated);
}

#[tokio::test]
async fn test_unknown_filter_field_is_rejected_before_querying() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;
    mount_schema(&server, "dinesafe-datastore", 10).await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("limit", "10"))
        .respond_with(ok(json!({"fields": [], "records": []})))
        .expect(0)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let spec = QuerySpec::new("dinesafe").with_filter("status", "Pass");
    match client.query(&spec).await.unwrap_err() {
        TorontoError::InvalidFilter { field, available } => {
            assert_eq!(field, "status");
            assert!(available.contains(&"establishment_status".to_string()));
            assert!(!available.contains(&"_id".to_string()));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_schema_failure_sends_filters_unvalidated() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("limit", "0"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "error": {
                "__type": "Validation Error",
                "filters": ["field \"status\" not in table"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let spec = QuerySpec::new("dinesafe").with_filter("status", "Pass");
    let err = client.query(&spec).await.unwrap_err();

    assert_eq!(err.kind(), "HttpError");
    assert_eq!(err.status(), Some(409));
    assert!(err.to_string().contains("not in table"));
}

#[tokio::test]
async fn test_query_on_file_dataset_lists_downloads() {
    let server = MockServer::start().await;
    mount_package(&server, "ttc-ridership", csv_only_package("https://example.org/r.csv")).await;

    let client = create_test_client(&server);
    let err = client
        .query(&QuerySpec::new("ttc-ridership"))
        .await
        .unwrap_err();

    match err {
        TorontoError::NotQueryable { downloadable, .. } => {
            assert_eq!(downloadable[0].url.as_deref(), Some("https://example.org/r.csv"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_query_without_filters_skips_schema_lookup() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("limit", "0"))
        .respond_with(ok(json!({"fields": dinesafe_fields(), "records": []})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("limit", "2"))
        .respond_with(ok(json!({
            "fields": dinesafe_fields(),
            "records": [
                {"_id": 1, "establishment_name": "A"},
                {"_id": 2, "establishment_name": "B"}
            ],
            "total": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let outcome = client
        .query(&QuerySpec::new("dinesafe").with_limit(2))
        .await
        .unwrap();

    assert!(outcome.validated);
    assert_eq!(outcome.result.rows.len(), 2);
    assert_eq!(outcome.result.columns.len(), 3);
}

#[tokio::test]
async fn test_query_on_spreadsheet_dataset_matches_schema_error() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "budget",
        json!({
            "name": "budget",
            "title": "Operating Budget",
            "resources": [
                {"id": "budget-xlsx", "name": "Budget 2024", "format": "XLSX", "url": "https://example.org/b.xlsx"}
            ]
        }),
    )
    .await;

    let client = create_test_client(&server);
    let query_err = client.query(&QuerySpec::new("budget")).await.unwrap_err();
    let schema_err = client.get_schema("budget").await.unwrap_err();

    assert_eq!(query_err.kind(), "NotQueryableError");
    assert_eq!(schema_err.kind(), "NotQueryableError");
    match query_err {
        TorontoError::NotQueryable { downloadable, .. } => {
            assert_eq!(downloadable.len(), 1);
            assert_eq!(downloadable[0].url.as_deref(), Some("https://example.org/b.xlsx"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_preview_bounds_bytes_when_file_has_no_newlines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/blob.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 8 * 1024 * 1024]))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let url = format!("{}/files/blob.csv", server.uri());
    let preview = client.preview_csv(&url, 1).await.unwrap();

    assert_eq!(preview.line_count(), 1);
    assert_eq!(preview.lines[0].len(), client.config().max_preview_bytes);
    assert!(preview.truncated);
}

#[tokio::test]
async fn test_preview_byte_ceiling_cuts_before_max_lines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/big.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(100)))
        .mount(&server)
        .await;

    let config = TorontoConfig::new()
        .with_base_url(format!("{}/api/3", server.uri()))
        .with_max_preview_bytes(40);
    let client = TorontoClient::with_config(config).unwrap();
    let url = format!("{}/files/big.csv", server.uri());
    let preview = client.preview_csv(&url, 50).await.unwrap();

    // 40 bytes: two whole lines and the start of the third
    assert_eq!(preview.lines, vec!["id,name,opened", "1,Place 1,2024-01-02", "2,Pl"]);
    assert!(preview.truncated);
}

#[tokio::test]
async fn test_preview_stops_at_max_lines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/big.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(100)))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let url = format!("{}/files/big.csv", server.uri());
    let preview = client.preview_csv(&url, 5).await.unwrap();

    assert_eq!(preview.line_count(), 5);
    assert_eq!(preview.header, vec!["id", "name", "opened"]);
    assert_eq!(preview.rows.len(), 4);
    assert!(preview.truncated);
}

#[tokio::test]
async fn test_preview_reads_small_file_whole() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/small.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a,b\r\n1,2\r\n3,4"))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let url = format!("{}/files/small.csv", server.uri());
    let preview = client.preview_csv(&url, 50).await.unwrap();

    assert_eq!(preview.lines, vec!["a,b", "1,2", "3,4"]);
    assert!(!preview.truncated);
}

#[tokio::test]
async fn test_preview_of_exactly_max_lines_is_not_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/five.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(5)))
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let url = format!("{}/files/five.csv", server.uri());
    let preview = client.preview_csv(&url, 5).await.unwrap();

    assert_eq!(preview.line_count(), 5);
    assert!(!preview.truncated);
}

#[tokio::test]
async fn test_zero_lines_is_empty_resource_without_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/big.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(10)))
        .expect(0)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let url = format!("{}/files/big.csv", server.uri());
    let err = client.preview_csv(&url, 0).await.unwrap_err();
    assert_eq!(err.kind(), "EmptyResourceError");
}

#[tokio::test]
async fn test_preview_rejects_bad_urls_and_reports_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/missing.csv"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/empty.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let client = create_test_client(&server);

    let err = client.preview_csv("ftp://example.org/a.csv", 5).await.unwrap_err();
    assert_eq!(err.kind(), "InvalidArgumentError");

    let err = client
        .preview_csv(&format!("{}/files/missing.csv", server.uri()), 5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "FetchError");
    assert_eq!(err.status(), Some(404));

    let err = client
        .preview_csv(&format!("{}/files/empty.csv", server.uri()), 5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "EmptyResourceError");
}

#[tokio::test]
async fn test_smart_lookup_on_datastore_dataset() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/datastore_search"))
        .and(query_param("limit", "2"))
        .respond_with(ok(json!({
            "fields": dinesafe_fields(),
            "records": [
                {"_id": 1, "establishment_name": "A", "establishment_status": "Pass", "inspection_date": "2024-01-01"},
                {"_id": 2, "establishment_name": "B", "establishment_status": "Conditional Pass", "inspection_date": "2024-01-02"}
            ],
            "total": 82_341
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let report = client
        .smart_lookup("dinesafe", "Which establishments had inspections?", 2)
        .await
        .unwrap();

    match report.body {
        SmartBody::Datastore {
            fields,
            relevant_fields,
            sample,
            ..
        } => {
            assert_eq!(fields.len(), 3);
            assert_eq!(
                relevant_fields,
                vec!["establishment_name", "establishment_status", "inspection_date"]
            );
            assert_eq!(sample.rows.len(), 2);
            assert_eq!(sample.total, Some(82_341));
        }
        other => panic!("unexpected body {other:?}"),
    }
}

#[tokio::test]
async fn test_smart_lookup_previews_single_csv() {
    let server = MockServer::start().await;
    let csv_url = format!("{}/files/ridership.csv", server.uri());
    mount_package(&server, "ttc-ridership", csv_only_package(&csv_url)).await;
    Mock::given(method("GET"))
        .and(path("/files/ridership.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv_body(40)))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_test_client(&server);
    let report = client
        .smart_lookup("ttc-ridership", "ridership by year", 10)
        .await
        .unwrap();

    match report.body {
        SmartBody::Files {
            downloadable,
            preview: Some(PreviewAttempt::Fetched { preview }),
        } => {
            assert_eq!(downloadable.len(), 1);
            assert_eq!(preview.line_count(), 10);
            assert!(preview.truncated);
        }
        other => panic!("unexpected body {other:?}"),
    }
}

#[tokio::test]
async fn test_smart_lookup_without_files_is_no_usable_resource() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "ward-boundaries",
        json!({
            "name": "ward-boundaries",
            "title": "Ward Boundaries",
            "resources": [{"id": "shp", "format": "SHP", "url": "https://example.org/w.zip"}]
        }),
    )
    .await;

    let client = create_test_client(&server);
    let err = client
        .smart_lookup("ward-boundaries", "where are wards", 10)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "NoUsableResourceError");
}

#[tokio::test]
async fn test_dataset_stats_and_listing() {
    let server = MockServer::start().await;
    mount_package(&server, "dinesafe", dinesafe_package()).await;
    mount_schema(&server, "dinesafe-datastore", 82_341).await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_list"))
        .and(query_param("limit", "2"))
        .respond_with(ok(json!(["dinesafe", "building-permits"])))
        .mount(&server)
        .await;

    let client = create_test_client(&server);

    let stats = client.dataset_stats("dinesafe").await.unwrap();
    match stats.datastore {
        DatastoreStatus::Available { total, fields, .. } => {
            assert_eq!(total, Some(82_341));
            assert_eq!(fields.len(), 3);
        }
        other => panic!("unexpected status {other:?}"),
    }

    let names = client.list_datasets(Some(2)).await.unwrap();
    assert_eq!(names, vec!["dinesafe", "building-permits"]);
}
