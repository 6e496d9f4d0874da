//! Periodic refresh of the snapshot cache.
//!
//! A cycle fetches every source concurrently, appends each source's items to
//! the staging generation as soon as they arrive, and publishes once all
//! fetches have finished. A failing source only loses its own contribution.

use chrono::{DateTime, Utc};
use errors::CacheError;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::cache::SnapshotCache;
use crate::fetcher::SourceClient;
use crate::source::Source;
use crate::telemetry::Telemetry;

/// One source that contributed nothing to a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source_name: String,
    pub kind: String,
    pub message: String
}

/// Summary of one refresh cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub sources_succeeded: usize,
    pub sources_failed: usize,
    pub items_added: usize,
    pub duplicates: usize,
    pub records_rejected: usize,
    pub failures: Vec<SourceFailure>,
    /// False when the cycle was abandoned and the previous snapshot kept.
    pub published: bool,
    /// Generation visible after the cycle.
    pub generation: u64,
    /// Item count visible after the cycle.
    pub items_published: usize
}

#[derive(Debug, Default)]
struct SourceStats {
    added: usize,
    duplicates: usize,
    rejected: usize
}

pub struct RefreshScheduler {
    cache: Arc<SnapshotCache>,
    sources: Arc<[Source]>,
    client: Arc<dyn SourceClient>,
    interval: Duration,
    last_report: Arc<RwLock<Option<CycleReport>>>
}

impl RefreshScheduler {
    /// `interval` is clamped to at least one millisecond.
    pub fn new(
        cache: Arc<SnapshotCache>,
        sources: Vec<Source>,
        client: Arc<dyn SourceClient>,
        interval: Duration
    ) -> Self {
        Self {
            cache,
            sources: sources.into(),
            client,
            interval: interval.max(Duration::from_millis(1)),
            last_report: Arc::new(RwLock::new(None))
        }
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().await.clone()
    }

    /// Runs one complete refresh cycle.
    ///
    /// When sources were attempted and every one of them failed, the cycle
    /// is abandoned and the previous snapshot stays visible.
    pub async fn run_cycle(&self) -> Result<CycleReport, CacheError> {
        let started_at = Utc::now();
        let timer = Instant::now();
        self.cache.begin_cycle()?;
        info!(sources = self.sources.len(), "Starting refresh cycle");

        let mut tasks = JoinSet::new();
        for source in self.sources.iter().cloned() {
            let client = Arc::clone(&self.client);
            let cache = Arc::clone(&self.cache);
            tasks.spawn(async move {
                let result = fetch_into(client.as_ref(), &cache, &source).await;
                (source.name, result)
            });
        }

        let mut report = CycleReport {
            started_at,
            completed_at: started_at,
            sources_succeeded: 0,
            sources_failed: 0,
            items_added: 0,
            duplicates: 0,
            records_rejected: 0,
            failures: Vec::new(),
            published: false,
            generation: 0,
            items_published: 0
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(stats))) => {
                    report.sources_succeeded += 1;
                    report.items_added += stats.added;
                    report.duplicates += stats.duplicates;
                    report.records_rejected += stats.rejected;
                }
                Ok((_, Err(failure))) => {
                    report.sources_failed += 1;
                    report.failures.push(failure);
                }
                Err(e) => {
                    error!(error = %e, "Source fetch task did not complete");
                    report.sources_failed += 1;
                    report.failures.push(SourceFailure {
                        source_name: "unknown".to_string(),
                        kind: "task".to_string(),
                        message: e.to_string()
                    });
                }
            }
        }

        let all_failed = !self.sources.is_empty() && report.sources_succeeded == 0;
        if all_failed {
            self.cache.abandon_cycle();
            let current = self.cache.current_snapshot();
            report.generation = current.generation();
            report.items_published = current.len();
            warn!(
                failed = report.sources_failed,
                generation = report.generation,
                "Every source failed, keeping the previous snapshot"
            );
        } else {
            let snapshot = self.cache.end_cycle()?;
            report.published = true;
            report.generation = snapshot.generation();
            report.items_published = snapshot.len();
        }
        report.completed_at = Utc::now();

        let elapsed = timer.elapsed();
        Telemetry::record_cycle(if report.published { "published" } else { "abandoned" }, elapsed);
        Telemetry::record_rejected_records(report.records_rejected);
        Telemetry::set_snapshot_items(report.items_published);

        info!(
            succeeded = report.sources_succeeded,
            failed = report.sources_failed,
            items = report.items_published,
            duplicates = report.duplicates,
            rejected = report.records_rejected,
            generation = report.generation,
            published = report.published,
            elapsed_ms = elapsed.as_millis() as u64,
            "Refresh cycle completed"
        );

        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    /// Runs a cycle every `interval` until `shutdown` turns `true` or its
    /// sender is dropped. The first cycle runs one interval from now.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "Refresh scheduler started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %e, "Refresh cycle could not start");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Refresh scheduler stopped");
    }

    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

async fn fetch_into(
    client: &dyn SourceClient,
    cache: &SnapshotCache,
    source: &Source
) -> Result<SourceStats, SourceFailure> {
    let outcome = match client.fetch(source).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(source = %source.name, kind = e.kind(), error = %e, "Source fetch failed");
            Telemetry::record_source_failure(e.source_name(), e.kind());
            return Err(SourceFailure {
                source_name: source.name.clone(),
                kind: e.kind().to_string(),
                message: e.to_string()
            });
        }
    };

    for rejected in &outcome.rejected {
        warn!(source = %source.name, error = %rejected, "Dropped record");
    }

    let rejected = outcome.rejected.len();
    let appended = cache.append(outcome.items).map_err(|e| {
        error!(source = %source.name, error = %e, "Could not stage items");
        SourceFailure {
            source_name: source.name.clone(),
            kind: "cache".to_string(),
            message: e.to_string()
        }
    })?;

    debug!(
        source = %source.name,
        added = appended.added,
        duplicates = appended.duplicates,
        rejected,
        "Staged source items"
    );
    Ok(SourceStats {
        added: appended.added,
        duplicates: appended.duplicates,
        rejected
    })
}
