//! # Toronto Open Data
//!
//! Dataset discovery and querying for the City of Toronto Open Data portal,
//! built on the low-level [`toronto_ckan`] client.
//!
//! ```rust,no_run
//! use toronto_open_data::{QuerySpec, TorontoClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TorontoClient::new()?;
//!
//!     for dataset in client.search("restaurant inspections", 5).await? {
//!         println!("{}: {}", dataset.id, dataset.title);
//!     }
//!
//!     let spec = QuerySpec::new("dinesafe")
//!         .with_filter("establishment_status", "Pass")
//!         .with_limit(5);
//!     let outcome = client.query(&spec).await?;
//!     println!("{} rows", outcome.result.rows.len());
//!
//!     Ok(())
//! }
//! ```

pub use toronto_ckan as ckan;

pub mod catalog;
pub mod client;
pub mod config;
pub mod csv_preview;
pub mod error;
pub mod format;
pub mod model;
pub mod popular;
pub mod query;
pub mod report;
pub mod resolver;

pub use client::TorontoClient;
pub use config::TorontoConfig;
pub use csv_preview::{CsvPreview, DEFAULT_PREVIEW_LINES};
pub use error::{Result, TorontoError};
pub use model::{DatasetRecord, DatasetSchema, FieldType, QueryResult, ResourceDescriptor, ResourceKind, SchemaField};
pub use query::{DEFAULT_LIMIT, MAX_LIMIT, QuerySpec, SortDirection, SortSpec};
pub use report::{DatasetStats, DatastoreStatus, PreviewAttempt, QueryOutcome, SmartBody, SmartReport};
pub use resolver::AccessPath;
