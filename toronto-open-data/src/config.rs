use std::sync::Arc;
use std::time::Duration;
use toronto_ckan::Configuration as CkanConfiguration;

/// Hard ceiling on the number of lines a CSV preview may read.
pub const MAX_PREVIEW_LINES: usize = 1000;

/// Default cap on bytes a CSV preview keeps from the download.
pub const DEFAULT_PREVIEW_BYTES: usize = 1024 * 1024;

/// Configuration for the Toronto Open Data client
#[derive(Debug, Clone)]
pub struct TorontoConfig {
    /// CKAN client configuration
    pub ckan_config: Arc<CkanConfiguration>,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// Timeout applied to every outbound request, in seconds
    pub timeout_secs: u64,
    /// Upper bound on `max_lines` for CSV previews
    pub max_preview_lines: usize,
    /// Upper bound on bytes read for a CSV preview, whatever the line count
    pub max_preview_bytes: usize,
}

impl Default for TorontoConfig {
    fn default() -> Self {
        let ckan_config = CkanConfiguration::default();
        Self {
            user_agent: ckan_config
                .user_agent
                .clone()
                .unwrap_or_else(|| "toronto-open-data-rs".to_string()),
            timeout_secs: ckan_config.timeout.as_secs(),
            ckan_config: Arc::new(ckan_config),
            max_preview_lines: MAX_PREVIEW_LINES,
            max_preview_bytes: DEFAULT_PREVIEW_BYTES,
        }
    }
}

impl TorontoConfig {
    /// Create a new configuration for the Toronto portal
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the client at another CKAN action API, e.g. a staging portal or a mock server
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.base_path = base_url.into();
        self.ckan_config = Arc::new(ckan_config);
        self
    }

    /// Set custom user agent
    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.user_agent = Some(self.user_agent.clone());
        self.ckan_config = Arc::new(ckan_config);
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs.max(1);
        let mut ckan_config = (*self.ckan_config).clone();
        ckan_config.timeout = self.timeout();
        self.ckan_config = Arc::new(ckan_config);
        self
    }

    /// Set the CSV preview line ceiling
    pub fn with_max_preview_lines(mut self, max: usize) -> Self {
        self.max_preview_lines = max.clamp(1, MAX_PREVIEW_LINES);
        self
    }

    /// Set the CSV preview byte ceiling
    pub fn with_max_preview_bytes(mut self, max: usize) -> Self {
        self.max_preview_bytes = max.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.ckan_config.base_path
    }
}
