//! REST API for the web UI and remote `tine check`.
//!
//! ## Routes
//!
//! - `GET /status?queryUrl=<scheme://host[:port]>` probes one endpoint
//! - `POST /parse` imports an uploaded CSV or single-sheet `.xlsx` file
//! - `GET /health` liveness check
//!
//! Every route is also mounted under `/api`, which is where the packaged UI
//! sends its requests. Other paths are served from the asset directory when
//! one is configured.

pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod types;

pub use router::create_router;
pub use server::TineServer;
pub use state::ApiState;
pub use types::{ApiError, StatusQuery};
