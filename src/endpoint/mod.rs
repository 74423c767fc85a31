//! Endpoint descriptors and the client-side endpoint list.
//!
//! Provides functionality for:
//! - Describing an endpoint (name, address, scheme, port)
//! - Parsing probe addresses into host and effective port
//! - Importing endpoints from spreadsheet/CSV files
//! - Persisting the operator's endpoint list locally

pub mod descriptor;
pub mod import;
pub mod storage;
pub mod target;

pub use descriptor::{
    DescriptorError, EndpointDescriptor, HTTP_DEFAULT_PORT, HTTPS_DEFAULT_PORT, SSH_DEFAULT_PORT,
    Scheme,
};
pub use import::{ImportError, ImportFormat, ImportedRow};
pub use storage::{EndpointList, EndpointStorage, StorageError};
pub use target::{ProbeTarget, TargetError};
