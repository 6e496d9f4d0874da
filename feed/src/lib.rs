//! # freshcve Feed
//!
//! Fetch, merge and publish pipeline for the freshcve service.
//!
//! - [`source`]: typed field mappings and source resolution from configuration
//! - [`query`]: query parameter templates rendered at fetch time
//! - [`fetcher`]: HTTP retrieval and record decoding
//! - [`cache`]: double-buffered snapshot cache with on-disk persistence
//! - [`scheduler`]: periodic refresh cycles over all sources

pub mod cache;
pub mod fetcher;
pub mod item;
pub mod query;
pub mod scheduler;
pub mod source;
pub mod telemetry;

pub use cache::{AppendOutcome, LoadOutcome, Snapshot, SnapshotCache};
pub use fetcher::{FetchOutcome, HttpFetcher, SourceClient, decode_records};
pub use item::Item;
pub use query::QueryTemplate;
pub use scheduler::{CycleReport, RefreshScheduler, SourceFailure};
pub use source::{Source, SourceType, join_url, resolve_source_types, resolve_sources};
pub use telemetry::Telemetry;
