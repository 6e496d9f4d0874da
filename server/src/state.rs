//! Application state for the freshcve server.

use config::Config;
use feed::{HttpFetcher, RefreshScheduler, SnapshotCache, SourceClient, resolve_sources};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::error::{Result, ServerError};

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Snapshot cache read by the API and refreshed by the scheduler.
    pub cache: Arc<SnapshotCache>,
    pub scheduler: Arc<RefreshScheduler>,
    /// Effective configuration after overrides.
    pub config: Arc<Config>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>
}

impl AppState {
    /// Resolves the configured sources and wires them to an HTTP fetcher.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.timers.request_timeout())
            .map_err(|e| ServerError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Self::with_client(config, Arc::new(fetcher))
    }

    /// Same as [`AppState::new`] with a caller-supplied source client.
    pub fn with_client(config: Config, client: Arc<dyn SourceClient>) -> Result<Self> {
        let sources = resolve_sources(&config.sources_types, &config.sources)?;
        let cache = Arc::new(SnapshotCache::new());
        let scheduler = Arc::new(RefreshScheduler::new(
            Arc::clone(&cache),
            sources,
            client,
            config.timers.cache_update_interval()
        ));

        Ok(Self {
            cache,
            scheduler,
            config: Arc::new(config),
            metrics: None
        })
    }

    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{SourceConfig, SourceTypeConfig};

    fn config_with_source(type_name: &str) -> Config {
        let mut config = Config::default();
        config.sources_types.insert(
            "circl".to_string(),
            SourceTypeConfig {
                id: "id".to_string(),
                published: "Published".to_string(),
                references: "references".to_string(),
                description: "summary".to_string()
            }
        );
        config.sources.push(SourceConfig {
            name: "circl".to_string(),
            url: "http://cve.circl.lu/api/last/2".to_string(),
            type_name: type_name.to_string(),
            query_param: None
        });
        config
    }

    #[test]
    fn test_state_resolves_sources() {
        let state = AppState::new(config_with_source("circl")).unwrap();
        assert_eq!(state.scheduler.sources().len(), 1);
        assert!(state.cache.current_snapshot().is_empty());
        assert!(state.metrics.is_none());
        assert_eq!(
            state.scheduler.interval(),
            state.config.timers.cache_update_interval()
        );
    }

    #[test]
    fn test_state_rejects_unknown_source_type() {
        let result = AppState::new(config_with_source("nvd"));
        assert!(matches!(result, Err(ServerError::Configuration(_))));
    }
}
