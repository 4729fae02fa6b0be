use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::env;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use toronto_open_data::{
    DEFAULT_LIMIT, DEFAULT_PREVIEW_LINES, QuerySpec, SortSpec, TorontoClient, TorontoConfig,
    TorontoError, format,
};

/// Newest protocol revision first; the first entry is offered when the
/// client asks for one we do not know.
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

const SERVER_NAME: &str = "toronto-mcp-server";

pub struct TorontoMcpServer {
    client: TorontoClient,
}

impl TorontoMcpServer {
    pub async fn bootstrap() -> Result<(), ServerError> {
        let server = Self::new()?;
        server.run().await
    }

    fn new() -> Result<Self, ServerError> {
        let base_url = env::var("TORONTO_CKAN_BASE_URL").ok();
        let user_agent = env::var("TORONTO_USER_AGENT").ok();
        let timeout = env::var("TORONTO_HTTP_TIMEOUT_SECS").ok();

        let mut config = TorontoConfig::new();
        if let Some(url) = base_url {
            config = config.with_base_url(url);
        }
        if let Some(ua) = user_agent {
            config = config.with_user_agent(ua);
        }
        if let Some(raw) = timeout {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config = config.with_timeout(secs),
                Err(err) => tracing::warn!("ignoring TORONTO_HTTP_TIMEOUT_SECS={raw:?}: {err}"),
            }
        }

        let client = TorontoClient::with_config(config)?;
        Ok(Self::with_client(client))
    }

    fn with_client(client: TorontoClient) -> Self {
        Self { client }
    }

    async fn run(self) -> Result<(), ServerError> {
        let stdin = io::stdin();
        let stdout = io::stdout();

        let reader = BufReader::new(stdin);
        let mut writer = BufWriter::new(stdout);

        tracing::info!(
            base_url = self.client.config().base_url(),
            "Toronto Open Data MCP server ready"
        );

        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if let Some(response) = self.handle_line(&line).await {
                self.write_response(&mut writer, &response).await?;
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    async fn write_response(
        &self,
        writer: &mut BufWriter<io::Stdout>,
        response: &Response,
    ) -> Result<(), ServerError> {
        let payload = serde_json::to_string(response).map_err(ServerError::Serialization)?;
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// One inbound frame to at most one outbound frame.
    async fn handle_line(&self, line: &str) -> Option<Response> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let value = match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("unparseable frame: {err}");
                return Some(Response::error(None, ServerError::Parse(err)));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => {
                tracing::warn!("invalid request: {err}");
                Some(Response::error(id, ServerError::InvalidRequest(err.to_string())))
            }
        }
    }

    /// Notifications (no `id`) are executed but never answered.
    async fn handle_request(&self, request: Request) -> Option<Response> {
        let result = self.dispatch(&request.method, request.params).await;

        let id = request.id?;
        Some(match result {
            Ok(result) => Response::success(Some(id), result),
            Err(err) => Response::error(Some(id), err),
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        if method == "tools/call" {
            let params: CallToolParams = parse_required_params(method, params)?;
            let spec = find_tool_spec(&params.name)
                .ok_or_else(|| ServerError::InvalidMethod(params.name.clone()))?;

            let response = self.invoke_tool(&spec, params.arguments).await?;
            return serde_json::to_value(response).map_err(ServerError::Serialization);
        }

        if let Some(spec) = find_tool_spec_by_method(method) {
            let response = self.invoke_tool(&spec, params).await?;
            return serde_json::to_value(response).map_err(ServerError::Serialization);
        }

        self.invoke_method(method, params).await
    }

    async fn invoke_method(&self, method: &str, params: Option<Value>) -> Result<Value, ServerError> {
        match method {
            "initialize" => {
                let params: InitializeParams = parse_optional_params(method, params)?;
                if let Some(info) = &params.client_info {
                    tracing::info!(
                        client = %info.name,
                        version = info.version.as_deref().unwrap_or("unknown"),
                        "client connected"
                    );
                }
                let result = InitializeResult::new(params.protocol_version.as_deref());
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            "initialized" | "notifications/initialized" => Ok(Value::Null),
            "ping" => Ok(json!({})),
            "shutdown" => Ok(Value::Null),
            "tools/list" => {
                let params: ListToolsParams = parse_optional_params(method, params)?;
                // Every tool fits on one page, so no cursor is ever handed out
                if let Some(cursor) = params.cursor {
                    return Err(ServerError::InvalidParams(format!(
                        "{method}: unknown cursor '{cursor}'"
                    )));
                }
                let result = ListToolsResult {
                    tools: tool_descriptors(),
                    next_cursor: None,
                };
                Ok(serde_json::to_value(result).map_err(ServerError::Serialization)?)
            }
            other => Err(ServerError::InvalidMethod(other.to_string())),
        }
    }

    /// Run a tool. Argument shape problems are protocol errors; everything
    /// the portal or the domain layer reports becomes an `isError` result.
    async fn invoke_tool(&self, spec: &ToolSpec, arguments: Option<Value>) -> Result<ToolResponse, ServerError> {
        let method = spec.method_name;
        tracing::debug!(tool = spec.tool_name, "tool call");

        let response = match method {
            "toronto.startHere" => ToolResponse::text(format::start_here_guide()),
            "toronto.popularDatasets" => ToolResponse::text(format::format_popular_datasets()),
            "toronto.searchDatasets" => {
                let params: SearchParams = parse_required_params(method, arguments)?;
                let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
                render(self.client.search(&params.query, limit).await, |records| {
                    format::format_search_results(&params.query, records)
                })
            }
            "toronto.listDatasets" => {
                let params: ListDatasetsParams = parse_optional_params(method, arguments)?;
                render(self.client.list_datasets(params.limit).await, |names| {
                    format::format_dataset_list(names)
                })
            }
            "toronto.getDatasetDetails" => {
                let params: DatasetParams = parse_required_params(method, arguments)?;
                render(
                    self.client.get_dataset(&params.dataset_id).await,
                    format::format_dataset_details,
                )
            }
            "toronto.getDatasetSchema" => {
                let params: DatasetParams = parse_required_params(method, arguments)?;
                render(
                    self.client.get_schema(&params.dataset_id).await,
                    format::format_schema,
                )
            }
            "toronto.getDatasetStats" => {
                let params: DatasetParams = parse_required_params(method, arguments)?;
                render(
                    self.client.dataset_stats(&params.dataset_id).await,
                    format::format_dataset_stats,
                )
            }
            "toronto.smartDataHelper" => {
                let params: SmartHelperParams = parse_required_params(method, arguments)?;
                let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
                render(
                    self.client
                        .smart_lookup(&params.dataset_id, &params.user_question, limit)
                        .await,
                    format::format_smart_report,
                )
            }
            "toronto.queryDatasetData" => {
                let params: QueryParams = parse_required_params(method, arguments)?;
                match params.into_spec() {
                    Ok(spec) => render(self.client.query(&spec).await, format::format_query_result),
                    Err(err) => ToolResponse::failure(&err),
                }
            }
            "toronto.fetchCsvData" => {
                let params: FetchCsvParams = parse_required_params(method, arguments)?;
                let max_lines = params.max_lines.unwrap_or(DEFAULT_PREVIEW_LINES);
                render(
                    self.client.preview_csv(&params.csv_url, max_lines).await,
                    format::format_csv_preview,
                )
            }
            other => return Err(ServerError::InvalidMethod(other.to_string())),
        };

        Ok(response)
    }
}

fn render<T>(result: toronto_open_data::Result<T>, format: impl FnOnce(&T) -> String) -> ToolResponse {
    match result {
        Ok(value) => ToolResponse::text(format(&value)),
        Err(err) => ToolResponse::failure(&err),
    }
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default, rename = "jsonrpc")]
    _jsonrpc: Option<String>,
    /// `None` only when the member is absent; `"id": null` is still a request
    #[serde(default, deserialize_with = "present_id")]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ResponseError>,
}

impl Response {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, error: ServerError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(ResponseError::from(error)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl From<ServerError> for ResponseError {
    fn from(err: ServerError) -> Self {
        let code = match &err {
            ServerError::Parse(_) => -32700,
            ServerError::InvalidRequest(_) => -32600,
            ServerError::InvalidMethod(_) => -32601,
            ServerError::InvalidParams(_) => -32602,
            ServerError::Serialization(_) => -32603,
            ServerError::Client(_) => -32010,
            ServerError::Io(_) => -32020,
        };
        let data = match &err {
            ServerError::Client(inner) => Some(json!({"kind": inner.kind()})),
            _ => None,
        };

        Self {
            code,
            message: err.to_string(),
            data,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("parse error: {0}")]
    Parse(serde_json::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unknown method: {0}")]
    InvalidMethod(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Client(#[from] TorontoError),
    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),
}

type ServerResult<T> = Result<T, ServerError>;

fn parse_required_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned,
{
    match params {
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
        None => Err(ServerError::InvalidParams(format!(
            "{method}: missing parameters"
        ))),
    }
}

fn parse_optional_params<T>(method: &str, params: Option<Value>) -> ServerResult<T>
where
    T: DeserializeOwned + Default,
{
    match params {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|err| ServerError::InvalidParams(format!("{method}: {err}"))),
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ListDatasetsParams {
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DatasetParams {
    dataset_id: String,
}

#[derive(Debug, Deserialize)]
struct SmartHelperParams {
    dataset_id: String,
    user_question: String,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct QueryParams {
    dataset_id: String,
    #[serde(default)]
    filters: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    fields: Option<Vec<String>>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    sort: Option<String>,
}

impl QueryParams {
    fn into_spec(self) -> toronto_open_data::Result<QuerySpec> {
        let mut spec = QuerySpec::new(self.dataset_id)
            .with_filters(self.filters.unwrap_or_default())
            .with_limit(self.limit.unwrap_or(DEFAULT_LIMIT));
        if let Some(fields) = self.fields {
            spec = spec.with_fields(fields);
        }
        if let Some(sort) = self.sort.filter(|s| !s.trim().is_empty()) {
            spec = spec.with_sort(sort.parse::<SortSpec>()?);
        }
        Ok(spec)
    }
}

#[derive(Debug, Deserialize)]
struct FetchCsvParams {
    csv_url: String,
    #[serde(default)]
    max_lines: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct InitializeParams {
    #[serde(default, rename = "protocolVersion")]
    protocol_version: Option<String>,
    #[serde(default, rename = "clientInfo")]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Deserialize)]
struct ClientInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
    capabilities: Value,
    instructions: &'static str,
}

impl InitializeResult {
    fn new(requested: Option<&str>) -> Self {
        let protocol_version = SUPPORTED_PROTOCOL_VERSIONS
            .iter()
            .copied()
            .find(|v| Some(*v) == requested)
            .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);

        Self {
            protocol_version,
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: env!("CARGO_PKG_VERSION"),
            },
            capabilities: json!({
                "tools": {
                    "listChanged": false
                }
            }),
            instructions: "Call toronto_start_here first for the recommended workflow.",
        }
    }
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct ListToolsParams {
    #[serde(default, rename = "cursor")]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug)]
struct ToolSpec {
    tool_name: &'static str,
    method_name: &'static str,
    description: &'static str,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ListToolsResult {
    tools: Vec<ToolDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolDescriptor {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ToolResponse {
    content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "isError")]
    is_error: Option<bool>,
}

impl ToolResponse {
    fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error: None,
        }
    }

    fn failure(err: &TorontoError) -> Self {
        tracing::warn!(kind = err.kind(), "tool failed: {err}");
        Self {
            content: vec![ToolContent::Text {
                text: format::format_error(err),
            }],
            is_error: Some(true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

fn tool_descriptors() -> Vec<ToolDescriptor> {
    tool_specs()
        .into_iter()
        .map(|spec| ToolDescriptor {
            name: spec.tool_name,
            description: spec.description,
            input_schema: spec.input_schema,
        })
        .collect()
}

fn find_tool_spec(name: &str) -> Option<ToolSpec> {
    tool_specs().into_iter().find(|spec| spec.tool_name == name)
}

fn find_tool_spec_by_method(method: &str) -> Option<ToolSpec> {
    tool_specs()
        .into_iter()
        .find(|spec| spec.method_name == method)
}

fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            tool_name: "toronto_start_here",
            method_name: "toronto.startHere",
            description: "Start here: explains the recommended workflow for finding and reading Toronto Open Data",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_popular_datasets",
            method_name: "toronto.popularDatasets",
            description: "List commonly used Toronto datasets with their ids, grouped by topic",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_search_datasets",
            method_name: "toronto.searchDatasets",
            description: "Search Toronto Open Data by keywords (e.g. 'traffic', 'parks', 'budget'); returns dataset ids and descriptions",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Keywords matched against dataset titles and descriptions"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 10, "description": "Maximum number of datasets"}
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_list_datasets",
            method_name: "toronto.listDatasets",
            description: "List the ids of every dataset in the catalog; prefer search or popular datasets for focused discovery",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": ["integer", "null"], "minimum": 1, "description": "Maximum number of ids"}
                },
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_get_dataset_details",
            method_name: "toronto.getDatasetDetails",
            description: "Dataset metadata with every resource, its type and its download URL",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "description": "Dataset id, e.g. dinesafe"}
                },
                "required": ["dataset_id"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_smart_data_helper",
            method_name: "toronto.smartDataHelper",
            description: "Easiest way to get data: inspects a dataset, then returns schema and sample rows for API data or file links and a CSV preview for downloads",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "description": "Dataset id from search results"},
                    "user_question": {"type": "string", "description": "What you want to know; used to highlight relevant fields"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 10, "description": "Sample rows to return"}
                },
                "required": ["dataset_id", "user_question"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_get_dataset_schema",
            method_name: "toronto.getDatasetSchema",
            description: "Column names and types of a dataset's queryable datastore table",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "description": "Dataset id"}
                },
                "required": ["dataset_id"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_query_dataset_data",
            method_name: "toronto.queryDatasetData",
            description: "Query a datastore table with exact-match filters, field selection and sorting; get field names from toronto_get_dataset_schema first",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "description": "Dataset id"},
                    "filters": {"type": ["object", "null"], "description": "Field to value equality filters, e.g. {\"establishment_status\": \"Pass\"}; a list matches any of its values"},
                    "fields": {"type": ["array", "null"], "items": {"type": "string"}, "description": "Columns to return; all when omitted"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 1000, "default": 10, "description": "Maximum rows"},
                    "sort": {"type": ["string", "null"], "description": "\"field_name asc\" or \"field_name desc\""}
                },
                "required": ["dataset_id"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_get_dataset_stats",
            method_name: "toronto.getDatasetStats",
            description: "Resource count plus datastore record and field counts, or the downloadable files when there is no datastore",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dataset_id": {"type": "string", "description": "Dataset id"}
                },
                "required": ["dataset_id"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            tool_name: "toronto_fetch_csv_data",
            method_name: "toronto.fetchCsvData",
            description: "Read the first lines of a CSV file URL and show its header, sample rows and column types",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "csv_url": {"type": "string", "description": "http(s) URL of a CSV resource"},
                    "max_lines": {"type": "integer", "minimum": 0, "maximum": 1000, "default": 50, "description": "Lines to read, header included"}
                },
                "required": ["csv_url"],
                "additionalProperties": false
            }),
        },
    ]
}
