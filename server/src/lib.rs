//! # freshcve
//!
//! HTTP server that keeps a merged snapshot of CVE records fetched from
//! several remote sources and serves it read-only.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ Remote sources  │────►│  Snapshot cache │────►│   HTTP clients  │
//! │  (JSON arrays)  │     │  (This crate)   │     │                 │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!                                 │ ▲
//!                                 ▼ │ save on exit / load on start
//!                            cache file
//! ```
//!
//! ## Endpoints
//!
//! - `GET <endpoint>` - Returns the visible snapshot (default `/api/v1/cves`)
//! - `GET /health` - Health check endpoint
//! - `GET /metrics` - Prometheus metrics endpoint

pub mod cli;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod server;
pub mod state;

pub use cli::Cli;
pub use error::ServerError;
pub use server::FreshcveServer;
pub use state::AppState;
