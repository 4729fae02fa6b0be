mod action;
mod datastore;
mod package;

pub use action::{ActionError, ActionResponse};
pub use datastore::{DatastoreField, DatastoreSearchResult};
pub use package::{Organization, Package, PackageSearchResult, Resource, Tag};
