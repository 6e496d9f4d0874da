//! Server setup and lifecycle for freshcve.

use config::{
    Config, EnvOverrideWarning, collect_overrides_from_env, load_from_file, merge_overrides,
    validate
};
use errors::PersistenceError;
use feed::LoadOutcome;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;

use crate::cli::Cli;
use crate::error::{Result, ServerError};
use crate::logging::init_logging;
use crate::routes::create_router;
use crate::state::AppState;

const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// The freshcve server.
pub struct FreshcveServer {
    state: Arc<AppState>
}

impl FreshcveServer {
    /// Creates a new server instance with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_state(Arc::new(AppState::new(config)?)))
    }

    /// Creates a server instance from an existing `AppState`.
    pub fn with_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Restores the persisted snapshot, refreshing right away when there is
    /// nothing usable on disk.
    pub async fn warm_up(&self) {
        let path = &self.state.config.cache.path;
        let needs_refresh = match self.load_snapshot().await {
            Ok(LoadOutcome::Loaded(items)) => {
                tracing::info!(items, "Serving persisted snapshot until the next refresh");
                false
            }
            Ok(LoadOutcome::Cold) => {
                tracing::info!(path = %path.display(), "Cold start, refreshing now");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Unable to load persisted snapshot, refreshing now");
                true
            }
        };

        if needs_refresh {
            if let Err(e) = self.state.scheduler.run_cycle().await {
                tracing::error!(error = %e, "Initial refresh could not start");
            }
        }
    }

    /// Runs the HTTP server.
    ///
    /// This method blocks until the server is shut down (e.g., via Ctrl+C).
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.server.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind to {addr}: {e}")))?;

        self.run_until(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` completes, then stops the
    /// scheduler and saves the visible snapshot.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static
    {
        self.warm_up().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler_handle = Arc::clone(&self.state.scheduler).spawn(shutdown_rx.clone());
        let upkeep_handle = self
            .state
            .metrics
            .clone()
            .map(|handle| tokio::spawn(metrics_upkeep(handle, shutdown_rx)));

        let router = create_router(Arc::clone(&self.state));
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                %addr,
                endpoint = %self.state.config.server.endpoint,
                "freshcve server starting"
            );
        }

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                let _ = shutdown_tx.send(true);
            })
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {e}")));

        // The shutdown sender is gone by now, so both tasks exit promptly.
        if let Err(e) = scheduler_handle.await {
            tracing::error!(error = %e, "Refresh scheduler task failed");
        }
        if let Some(handle) = upkeep_handle {
            let _ = handle.await;
        }

        match self.save_snapshot().await {
            Ok(items) => tracing::info!(items, "Persisted snapshot on shutdown"),
            Err(e) => tracing::error!(error = %e, "Unable to persist snapshot on shutdown")
        }

        tracing::info!("freshcve server stopped");
        served
    }

    async fn load_snapshot(&self) -> Result<LoadOutcome> {
        let cache = Arc::clone(&self.state.cache);
        let path = self.state.config.cache.path.clone();
        blocking(move || cache.load_persisted(&path)).await
    }

    async fn save_snapshot(&self) -> Result<usize> {
        let cache = Arc::clone(&self.state.cache);
        let path = self.state.config.cache.path.clone();
        blocking(move || cache.save_persisted(&path)).await
    }
}

/// Runs snapshot file I/O on the blocking pool.
async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, PersistenceError> + Send + 'static,
    T: Send + 'static
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServerError::Internal(format!("Snapshot I/O task failed: {e}")))?
        .map_err(|e| ServerError::Internal(e.to_string()))
}

async fn metrics_upkeep(handle: PrometheusHandle, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => handle.run_upkeep(),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Signal handler for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}

/// Loads the configuration named on the command line and applies the
/// environment and command line overrides on top of it.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let (config, warnings) = load_config_with_warnings(cli)?;
    for warning in &warnings {
        warning.log();
    }
    Ok(config)
}

/// Same as [`load_config`], returning the environment override warnings
/// instead of logging them.
pub fn load_config_with_warnings(cli: &Cli) -> Result<(Config, Vec<EnvOverrideWarning>)> {
    let path = cli
        .config
        .as_deref()
        .ok_or_else(|| ServerError::Configuration("--config is required".to_string()))?;

    let from_file = load_from_file(path).map_err(|e| ServerError::Configuration(e.to_string()))?;
    let (env, warnings) = collect_overrides_from_env();
    let config = merge_overrides(from_file, env, cli.overrides());
    validate(&config).map_err(|e| ServerError::Configuration(e.to_string()))?;
    Ok((config, warnings))
}

/// Installs the global Prometheus recorder.
pub fn install_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install metrics recorder: {e}")))
}

/// Entry point for running the server from parsed command line arguments.
pub async fn run_from_cli(cli: Cli) -> Result<()> {
    if cli.print_config {
        print!("{}", config::DEFAULT_CONFIG);
        return Ok(());
    }

    // Nothing is subscribed yet, so override warnings wait for the logger.
    let (config, env_warnings) = load_config_with_warnings(&cli)?;

    if cli.check {
        for warning in &env_warnings {
            eprintln!("warning: {warning}");
        }
        let state = AppState::new(config)?;
        println!(
            "Configuration OK: {} source(s), endpoint {}",
            state.scheduler.sources().len(),
            state.config.server.endpoint
        );
        return Ok(());
    }

    init_logging(&config.log)?;
    for warning in &env_warnings {
        warning.log();
    }

    let mut state = AppState::new(config)?;
    match install_metrics() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "Metrics disabled")
    }

    FreshcveServer::with_state(Arc::new(state)).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_load_config_applies_cli_overrides() {
        let file = write_config(config::DEFAULT_CONFIG);
        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            port: Some(9999),
            ..Cli::default()
        };

        let config = load_config(&cli).unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_invalid_endpoint() {
        let file = write_config("[server]\nendpoint = \"/health\"\n");
        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Cli::default()
        };

        assert!(matches!(load_config(&cli), Err(ServerError::Configuration(_))));
    }

    #[test]
    #[serial]
    fn test_load_config_rejects_route_syntax_endpoint() {
        let file = write_config("[server]\nendpoint = \"/api/:cves\"\n");
        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Cli::default()
        };

        assert!(matches!(load_config(&cli), Err(ServerError::Configuration(_))));
    }

    #[test]
    #[serial]
    fn test_env_warnings_are_returned_with_config() {
        let file = write_config(config::DEFAULT_CONFIG);
        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Cli::default()
        };
        unsafe {
            std::env::set_var("FRESHCVE_REQUEST_TIMEOUT", "soon");
        }

        let result = load_config_with_warnings(&cli);
        unsafe {
            std::env::remove_var("FRESHCVE_REQUEST_TIMEOUT");
        }

        let (config, warnings) = result.unwrap();
        assert_eq!(config.timers.request_timeout, 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].variable, "FRESHCVE_REQUEST_TIMEOUT");
    }

    #[test]
    fn test_load_config_requires_path() {
        assert!(matches!(
            load_config(&Cli::default()),
            Err(ServerError::Configuration(_))
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        let cli = Cli {
            config: Some("/nonexistent/freshcve.toml".into()),
            ..Cli::default()
        };
        assert!(matches!(load_config(&cli), Err(ServerError::Configuration(_))));
    }
}
