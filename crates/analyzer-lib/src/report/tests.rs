//! Tests for the reporting adapter and the CSV sink
//!
//! Gauges and tables are captured by in-memory sinks; file output is checked
//! against a temporary directory.

#[cfg(test)]
mod adapter_tests {
    use crate::anomaly::{AnomalyScorer, ScoredMatrix};
    use crate::error::{AnalyzerError, Result};
    use crate::features::{extract_features, TrendAugmenter};
    use crate::models::{OwnerReference, Record, Snapshot, Table};
    use crate::report::{
        CsvTableSink, Gauge, GaugeSink, ReportingAdapter, TableSink, OVERALL_LABEL,
    };
    use crate::snapshot::normalize_window;
    use std::collections::BTreeMap;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingGauges {
        values: Mutex<BTreeMap<(&'static str, Option<String>), f64>>,
    }

    impl RecordingGauges {
        fn get(&self, gauge: Gauge, label: Option<&str>) -> Option<f64> {
            self.values
                .lock()
                .unwrap()
                .get(&(gauge.name(), label.map(str::to_string)))
                .copied()
        }

        fn len(&self) -> usize {
            self.values.lock().unwrap().len()
        }
    }

    impl GaugeSink for RecordingGauges {
        fn set_gauge(&self, gauge: Gauge, label: Option<&str>, value: f64) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert((gauge.name(), label.map(str::to_string)), value);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTables {
        features: Mutex<Vec<(String, Table)>>,
        anomalies: Mutex<Vec<(String, Table)>>,
    }

    impl TableSink for RecordingTables {
        fn store_features(&self, cycle_id: &str, table: &Table) -> Result<()> {
            self.features
                .lock()
                .unwrap()
                .push((cycle_id.to_string(), table.clone()));
            Ok(())
        }

        fn store_anomalies(&self, cycle_id: &str, table: &Table) -> Result<()> {
            self.anomalies
                .lock()
                .unwrap()
                .push((cycle_id.to_string(), table.clone()));
            Ok(())
        }
    }

    struct FailingTables;

    impl TableSink for FailingTables {
        fn store_features(&self, _cycle_id: &str, _table: &Table) -> Result<()> {
            Err(AnalyzerError::Sink {
                table: "features",
                reason: "disk full".to_string(),
            })
        }

        fn store_anomalies(&self, _cycle_id: &str, _table: &Table) -> Result<()> {
            Ok(())
        }
    }

    fn pods(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| {
                Record::new("pods", Some("default"), format!("pod-{i}"), "1")
                    .with_owner(OwnerReference::new("ReplicaSet", "web", "u1"))
            })
            .collect()
    }

    fn window(counts: &[usize]) -> Vec<Snapshot> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &n)| Snapshot::new(format!("20240101_00{i:02}00"), pods(n)))
            .collect()
    }

    #[test]
    fn test_empty_matrix_writes_nothing() {
        let gauges = Arc::new(RecordingGauges::default());
        let tables = Arc::new(RecordingTables::default());
        let adapter = ReportingAdapter::new(gauges.clone(), tables.clone());

        let features = extract_features(&[]);
        let outcome = adapter
            .publish_cycle("c1", &features, &ScoredMatrix::empty())
            .unwrap();

        assert!(!outcome.features_stored);
        assert_eq!(gauges.len(), 0);
        assert!(tables.features.lock().unwrap().is_empty());
        assert!(tables.anomalies.lock().unwrap().is_empty());
    }

    #[test]
    fn test_publish_cycle_reports_and_stores() {
        let gauges = Arc::new(RecordingGauges::default());
        let tables = Arc::new(RecordingTables::default());
        let adapter = ReportingAdapter::new(gauges.clone(), tables.clone());

        let features = TrendAugmenter::default().augment(&extract_features(&window(&[5, 5, 50])));
        let scored = AnomalyScorer::default().score(&features).unwrap();
        let outcome = adapter.publish_cycle("c1", &features, &scored).unwrap();

        assert_eq!(
            gauges.get(Gauge::ProcessedFeaturesCount, None),
            Some(features.n_columns() as f64)
        );
        assert_eq!(
            gauges.get(Gauge::AnomalyScore, Some(OVERALL_LABEL)),
            scored.mean_score()
        );
        assert!(outcome.features_stored);
        assert_eq!(outcome.anomalies_stored, scored.n_flagged());

        let stored = tables.features.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1.rows.len(), 3);

        let anomalies = tables.anomalies.lock().unwrap();
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].1.rows.iter().all(|r| r.last().unwrap() == "true"));
    }

    #[test]
    fn test_unscored_window_stores_features_only() {
        let gauges = Arc::new(RecordingGauges::default());
        let tables = Arc::new(RecordingTables::default());
        let adapter = ReportingAdapter::new(gauges.clone(), tables.clone());

        let features = TrendAugmenter::default().augment(&extract_features(&window(&[5])));
        let scored = AnomalyScorer::default().score(&features).unwrap();
        let outcome = adapter.publish_cycle("c1", &features, &scored).unwrap();

        assert!(outcome.features_stored);
        assert_eq!(outcome.mean_score, None);
        assert_eq!(gauges.get(Gauge::AnomalyScore, Some(OVERALL_LABEL)), None);
        assert!(tables.anomalies.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sink_failure_propagates() {
        let adapter = ReportingAdapter::new(
            Arc::new(RecordingGauges::default()),
            Arc::new(FailingTables),
        );

        let features = extract_features(&window(&[1, 2]));
        let result = adapter.publish_cycle("c1", &features, &ScoredMatrix::empty());
        assert!(matches!(result, Err(AnalyzerError::Sink { .. })));
    }

    #[test]
    fn test_inventory_gauges_with_previous_tail() {
        let gauges = Arc::new(RecordingGauges::default());
        let adapter = ReportingAdapter::new(gauges.clone(), Arc::new(RecordingTables::default()));

        let mut snapshots = window(&[4, 7]);
        snapshots[0]
            .records
            .push(Record::new("services", Some("default"), "svc", "1"));
        let counters = normalize_window(&snapshots);

        adapter
            .publish_inventory(&counters[1], Some(&counters[0]))
            .unwrap();

        assert_eq!(gauges.get(Gauge::MetadataCount, Some("pods")), Some(7.0));
        assert_eq!(gauges.get(Gauge::OwnerReferenceCount, Some("pods")), Some(7.0));
        assert_eq!(gauges.get(Gauge::MetadataChangeRate, Some("pods")), Some(3.0));
        assert_eq!(gauges.get(Gauge::MetadataCount, Some("services")), Some(0.0));
        assert_eq!(gauges.get(Gauge::MetadataChangeRate, Some("services")), Some(1.0));
    }

    #[test]
    fn test_inventory_without_previous_has_no_change_rate() {
        let gauges = Arc::new(RecordingGauges::default());
        let adapter = ReportingAdapter::new(gauges.clone(), Arc::new(RecordingTables::default()));

        let counters = normalize_window(&window(&[3]));
        adapter.publish_inventory(&counters[0], None).unwrap();

        assert_eq!(gauges.get(Gauge::MetadataCount, Some("pods")), Some(3.0));
        assert_eq!(gauges.get(Gauge::MetadataChangeRate, Some("pods")), None);
    }

    #[test]
    fn test_publish_correlations() {
        let gauges = Arc::new(RecordingGauges::default());
        let adapter = ReportingAdapter::new(gauges.clone(), Arc::new(RecordingTables::default()));

        let correlations = BTreeMap::from([("a__b".to_string(), 0.5)]);
        adapter.publish_correlations(&correlations).unwrap();
        assert_eq!(gauges.get(Gauge::CorrelationScore, Some("a__b")), Some(0.5));
    }

    #[test]
    fn test_csv_sink_writes_tables() {
        let temp_dir = TempDir::new().unwrap();
        let sink = CsvTableSink::new(temp_dir.path().join("out"));

        let features = TrendAugmenter::default().augment(&extract_features(&window(&[2, 3])));
        sink.store_features("20240101_000000", &features.to_table())
            .unwrap();

        let content =
            fs::read_to_string(sink.file_path("features_", "20240101_000000")).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some(concat!(
                "timestamp,count_pods,owner_refs_pods,version_change_rate,",
                "count_pods_ewma,owner_refs_pods_ewma,version_change_rate_ewma"
            ))
        );
        assert_eq!(lines.next(), Some("20240101_000000,2,2,0,2,2,0"));
        assert_eq!(
            lines.next(),
            Some("20240101_000100,3,3,1,2.6666666666666665,2.6666666666666665,0.6666666666666666")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_csv_sink_retention() {
        let temp_dir = TempDir::new().unwrap();
        let sink = CsvTableSink::new(temp_dir.path()).with_retention(2);
        let table = Table {
            header: vec!["timestamp".to_string()],
            rows: vec![vec!["t0".to_string()]],
        };

        for cycle in ["20240101_000000", "20240101_003000", "20240101_010000"] {
            sink.store_features(cycle, &table).unwrap();
        }
        sink.store_anomalies("20240101_010000", &table).unwrap();

        let mut names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "anomalies_20240101_010000.csv",
                "features_20240101_003000.csv",
                "features_20240101_010000.csv",
            ]
        );
    }
}
