use metrics::{counter, gauge, histogram};
use std::time::Duration;

pub struct Telemetry;

impl Telemetry {
    pub fn record_cycle(outcome: &'static str, duration: Duration) {
        counter!("freshcve_cycles_total", "outcome" => outcome).increment(1);
        histogram!("freshcve_cycle_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn record_source_failure(source: &str, kind: &'static str) {
        counter!(
            "freshcve_source_failures_total",
            "source" => source.to_string(),
            "kind" => kind
        )
        .increment(1);
    }

    pub fn record_rejected_records(count: usize) {
        if count > 0 {
            counter!("freshcve_records_rejected_total").increment(count as u64);
        }
    }

    pub fn set_snapshot_items(count: usize) {
        gauge!("freshcve_snapshot_items").set(count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::DebuggingRecorder;

    #[test]
    fn test_cycle_metrics_recorded() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            Telemetry::record_cycle("published", Duration::from_millis(120));
            Telemetry::record_source_failure("redhat", "timeout");
            Telemetry::record_rejected_records(3);
            Telemetry::set_snapshot_items(42);
        });

        let names: Vec<String> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();
        assert!(names.contains(&"freshcve_cycles_total".to_string()));
        assert!(names.contains(&"freshcve_cycle_duration_seconds".to_string()));
        assert!(names.contains(&"freshcve_source_failures_total".to_string()));
        assert!(names.contains(&"freshcve_records_rejected_total".to_string()));
        assert!(names.contains(&"freshcve_snapshot_items".to_string()));
    }

    #[test]
    fn test_zero_rejections_not_counted() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            Telemetry::record_rejected_records(0);
        });

        assert!(snapshotter.snapshot().into_vec().is_empty());
    }
}
