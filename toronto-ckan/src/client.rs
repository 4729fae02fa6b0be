use crate::models;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Base URL of the City of Toronto CKAN action API.
pub const TORONTO_BASE_PATH: &str = "https://ckan0.cf.opendata.inter.prod-toronto.ca/api/3";

/// Timeout applied to every request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the CKAN client
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Base URL for the CKAN API (e.g., "https://ckan0.cf.opendata.inter.prod-toronto.ca/api/3")
    pub base_path: String,
    /// User agent string for HTTP requests
    pub user_agent: Option<String>,
    /// HTTP client instance
    pub client: reqwest::Client,
    /// Upper bound on a single request, connect through body
    pub timeout: Duration,
}

impl Configuration {
    /// Create a new configuration with default values
    pub fn new() -> Configuration {
        Configuration::default()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            base_path: TORONTO_BASE_PATH.to_owned(),
            user_agent: Some(concat!("toronto-open-data-rs/", env!("CARGO_PKG_VERSION")).to_owned()),
            client: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// # CKAN Client
///
/// A thin async client for the read-only parts of the CKAN action API that
/// the Toronto Open Data portal exposes: dataset search and lookup, and
/// datastore queries.
///
/// Every call is a single attempt. Failures are returned as [`CkanError`]
/// immediately; there is no retry or caching layer.
///
/// ## Usage
///
/// ```rust,no_run
/// use toronto_ckan::{CkanClient, Configuration};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = CkanClient::new(Arc::new(Configuration::default()));
///
///     let results = client.package_search(Some("restaurant"), Some(5), None).await?;
///     for package in results.results.unwrap_or_default() {
///         println!("{}: {}", package.name, package.title.unwrap_or_default());
///     }
///
///     Ok(())
/// }
/// ```
pub struct CkanClient {
    configuration: Arc<Configuration>,
}

impl std::fmt::Debug for CkanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CkanClient")
            .field("base_path", &self.configuration.base_path)
            .finish()
    }
}

/// Errors that can occur when interacting with the CKAN API
///
/// # Examples
///
/// ```rust
/// # use toronto_ckan::CkanError;
/// let err = CkanError::ApiError { status: 404, message: "Not Found Error: Not found".into() };
/// assert_eq!(err.status(), Some(404));
/// assert!(err.is_not_found());
/// ```
#[derive(Debug)]
pub enum CkanError {
    /// Network, TLS, DNS or other request-level failure with no HTTP status
    RequestError(Box<dyn std::error::Error + Send + Sync>),

    /// The request did not complete within the configured timeout
    Timeout {
        /// URL that timed out
        url: String,
        /// Timeout that was applied
        after: Duration,
    },

    /// JSON parsing or deserialization errors
    ///
    /// Occurs when the portal returns a payload that does not match the
    /// expected model.
    ParseError(serde_json::Error),

    /// Non-2xx status, or a 2xx envelope with `success: false`
    ApiError {
        /// HTTP status code from the CKAN API
        status: u16,
        /// Human-readable error message from CKAN
        message: String,
    },
}

impl CkanError {
    /// HTTP status associated with the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            CkanError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl std::fmt::Display for CkanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CkanError::RequestError(e) => write!(f, "Request error: {}", e),
            CkanError::Timeout { url, after } => {
                write!(f, "Request to {} timed out after {}s", url, after.as_secs())
            }
            CkanError::ParseError(e) => write!(f, "Parse error: {}", e),
            CkanError::ApiError { status, message } => {
                write!(f, "CKAN API error ({}): {}", status, message)
            }
        }
    }
}

impl std::error::Error for CkanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CkanError::RequestError(e) => Some(e.as_ref()),
            CkanError::ParseError(e) => Some(e),
            _ => None,
        }
    }
}

impl CkanClient {
    /// Create a new CKAN client instance
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use toronto_ckan::{CkanClient, Configuration};
    /// # use std::sync::Arc;
    /// let config = Arc::new(Configuration {
    ///     base_path: "http://localhost:5000/api/3".to_string(),
    ///     ..Configuration::default()
    /// });
    /// let client = CkanClient::new(config);
    /// ```
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Search for datasets (packages)
    ///
    /// # Arguments
    ///
    /// * `q` - Search query string (matched by Solr against title, notes, tags, ...)
    /// * `rows` - Maximum number of results to return
    /// * `start` - Starting offset for pagination (0-based)
    pub async fn package_search(
        &self,
        q: Option<&str>,
        rows: Option<u32>,
        start: Option<u32>,
    ) -> Result<models::PackageSearchResult, CkanError> {
        let mut params = Vec::new();
        if let Some(q) = q {
            params.push(("q", q.to_string()));
        }
        if let Some(rows) = rows {
            params.push(("rows", rows.to_string()));
        }
        if let Some(start) = start {
            params.push(("start", start.to_string()));
        }

        self.action("package_search", &params).await
    }

    /// Fetch full metadata, including resources, for one dataset.
    ///
    /// An unknown `id` surfaces as `ApiError { status: 404, .. }`.
    pub async fn package_show(&self, id: &str) -> Result<models::Package, CkanError> {
        self.action("package_show", &[("id", id.to_string())]).await
    }

    /// List the names of every public dataset.
    pub async fn package_list(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<String>, CkanError> {
        let mut params = Vec::new();
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = offset {
            params.push(("offset", offset.to_string()));
        }

        self.action("package_list", &params).await
    }

    /// Query a datastore table.
    ///
    /// `params` is passed through as-is after `id`; callers are expected to
    /// have encoded `filters` as a JSON object string already.
    pub async fn datastore_search(
        &self,
        resource_id: &str,
        params: &[(&str, String)],
    ) -> Result<models::DatastoreSearchResult, CkanError> {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(("id", resource_id.to_string()));
        all.extend(params.iter().cloned());

        self.action("datastore_search", &all).await
    }

    /// Call any action and deserialize its `result` into `T`.
    pub async fn action<T>(&self, action: &str, params: &[(&str, String)]) -> Result<T, CkanError>
    where
        T: DeserializeOwned,
    {
        let result = self.action_value(action, params).await?;
        serde_json::from_value(result).map_err(CkanError::ParseError)
    }

    /// Issue `GET {base_path}/action/{action}?params` and return the
    /// unwrapped `result` of the CKAN envelope.
    pub async fn action_value(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<Value, CkanError> {
        let url = self.action_url(action, params);

        let mut request = self
            .configuration
            .client
            .get(&url)
            .timeout(self.configuration.timeout);
        if let Some(ua) = &self.configuration.user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua);
        }

        let response = request.send().await.map_err(|e| self.request_error(&url, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(&url, e))?;

        // CKAN puts a structured error in the body for 4xx responses too, so
        // try the envelope first regardless of status.
        let envelope = serde_json::from_str::<models::ActionResponse>(&body);

        if !status.is_success() {
            let message = match envelope {
                Ok(models::ActionResponse {
                    error: Some(error), ..
                }) => error.describe(),
                _ if body.trim().is_empty() => status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
                _ => body,
            };
            return Err(CkanError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.map_err(CkanError::ParseError)?;
        if !envelope.success {
            let error = envelope.error.unwrap_or_default();
            let status = if error.is_not_found() { 404 } else { 400 };
            return Err(CkanError::ApiError {
                status,
                message: error.describe(),
            });
        }

        envelope.result.ok_or_else(|| CkanError::ApiError {
            status: 500,
            message: "No result data in API response".to_string(),
        })
    }

    fn action_url(&self, action: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}/action/{}",
            self.configuration.base_path.trim_end_matches('/'),
            action
        );

        if !params.is_empty() {
            url.push('?');
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.push_str(&query_string);
        }

        url
    }

    fn request_error(&self, url: &str, err: reqwest::Error) -> CkanError {
        if err.is_timeout() {
            CkanError::Timeout {
                url: url.to_string(),
                after: self.configuration.timeout,
            }
        } else {
            CkanError::RequestError(Box::new(err))
        }
    }
}
