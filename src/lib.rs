//! Tine
//!
//! Reachability prober for network endpoints. Given an address such as
//! `https://example.com` or `ssh://10.0.0.5:2222`, tine makes one bounded
//! attempt to talk to it in that protocol and reports whether something
//! answered.
//!
//! # Architecture
//!
//! - **Probe Module**: HTTP and SSH probes, the normalized `Status`, and the
//!   dispatcher that routes an address to its probe
//! - **Endpoint Module**: endpoint descriptors, address parsing, CSV/XLSX
//!   import and the local endpoint list
//! - **REST Module**: axum server behind the web UI
//! - **Monitor Module**: periodic polling of the endpoint list
//!
//! # Usage
//!
//! ```no_run
//! use tine::probe::{Dispatcher, ProbeConfig};
//!
//! # async fn run() -> Result<(), tine::probe::ProbeError> {
//! let dispatcher = Dispatcher::from_config(&ProbeConfig::default())?;
//! let status = dispatcher.probe("https://example.com").await?;
//! println!("{}", status.kind().as_str());
//! # Ok(())
//! # }
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod config;
pub mod endpoint;
pub mod logging;
pub mod monitor;
pub mod probe;
pub mod rest;

pub use config::Config;
pub use endpoint::{EndpointDescriptor, EndpointList, EndpointStorage, ProbeTarget, Scheme};
pub use monitor::{Monitor, ProbeReport};
pub use probe::{Dispatcher, Probe, ProbeConfig, ProbeError, Status};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
