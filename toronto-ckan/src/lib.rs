//! Async client for the CKAN action API behind the City of Toronto Open Data
//! portal.
//!
//! Only read-only actions are wrapped: `package_search`, `package_show`,
//! `package_list` and `datastore_search`. Any other action can be reached
//! through [`CkanClient::action`].

pub mod client;
pub mod models;

// Re-export the ergonomic client and configuration for easy access
pub use client::{CkanClient, CkanError, Configuration, DEFAULT_TIMEOUT, TORONTO_BASE_PATH};
