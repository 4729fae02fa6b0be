use crate::model::ResourceDescriptor;
use toronto_ckan::CkanError;
use thiserror::Error;

/// Errors that can occur when using the Toronto Open Data client
#[derive(Error, Debug)]
pub enum TorontoError {
    /// No dataset with this identifier exists in the catalog
    #[error("Dataset not found: {dataset_id}")]
    NotFound { dataset_id: String },

    /// The dataset exists but none of its resources is loaded in the datastore
    #[error("Dataset '{dataset_id}' has no active datastore resource")]
    NotQueryable {
        dataset_id: String,
        title: String,
        /// CSV/XLS/XLSX resources that can be downloaded instead
        downloadable: Vec<ResourceDescriptor>,
    },

    /// Neither a datastore resource nor a CSV download is available
    #[error("Dataset '{dataset_id}' has no datastore or CSV resource")]
    NoUsableResource {
        dataset_id: String,
        /// Formats of whatever resources the dataset does carry
        formats: Vec<String>,
    },

    /// A filter names a column the datastore table does not have
    #[error("Filter field '{field}' is not in the dataset schema")]
    InvalidFilter {
        field: String,
        available: Vec<String>,
    },

    /// Error from the underlying CKAN API
    #[error("CKAN API error: {0}")]
    Http(CkanError),

    /// Downloading a file resource failed
    #[error("Failed to fetch {url}: {message}")]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// A download produced no lines
    #[error("No content could be read from {url}")]
    EmptyResource { url: String },

    /// Caller-supplied argument is out of range or malformed
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The portal answered with a payload that does not match the expected shape
    #[error("Unexpected response shape: {message}")]
    Decode { message: String },
}

impl From<CkanError> for TorontoError {
    fn from(err: CkanError) -> Self {
        match err {
            CkanError::ParseError(e) => Self::Decode {
                message: e.to_string(),
            },
            other => Self::Http(other),
        }
    }
}

impl TorontoError {
    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new fetch error
    pub fn fetch<U: Into<String>, S: Into<String>>(url: U, status: Option<u16>, message: S) -> Self {
        Self::Fetch {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// Stable name of the failure kind, as shown to tool callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFoundError",
            Self::NotQueryable { .. } => "NotQueryableError",
            Self::NoUsableResource { .. } => "NoUsableResourceError",
            Self::InvalidFilter { .. } => "InvalidFilterError",
            Self::Http(_) => "HttpError",
            Self::Fetch { .. } => "FetchError",
            Self::EmptyResource { .. } => "EmptyResourceError",
            Self::InvalidArgument { .. } => "InvalidArgumentError",
            Self::Decode { .. } => "DecodeError",
        }
    }

    /// HTTP status associated with the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(err) => err.status(),
            Self::Fetch { status, .. } => *status,
            _ => None,
        }
    }
}

/// Type alias for Results using TorontoError
pub type Result<T> = std::result::Result<T, TorontoError>;
