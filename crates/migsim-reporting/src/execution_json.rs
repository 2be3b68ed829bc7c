use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use migsim_core::{SimConfig, Tier};
use migsim_sim::{SchedulerOutcome, SimulationAggregates};

use crate::error::{Error, Result};

#[derive(Serialize)]
struct SimulationConfigJson {
    small_threads: u32,
    medium_threads: u32,
    large_threads: u32,
    small_max_workers: u32,
    medium_max_workers: u32,
    large_max_workers: u32,
    straggler_threshold_percent: f64,
    execution_mode: String,
    max_concurrent_workers: Option<u32>,
}

#[derive(Serialize)]
struct TierJson {
    total_workers: u64,
    straggler_workers: u64,
    workers_with_idle_threads: u64,
    workers_with_both_straggler_and_idle: u64,
}

#[derive(Serialize)]
struct ExecutionReport {
    total_execution_time: f64,
    total_migration_size_bytes: i64,
    total_migration_size_gb: f64,
    simulation_config: SimulationConfigJson,
    by_tier: BTreeMap<String, TierJson>,
}

/// Write `<base>_execution_report.json`, the schema the comparison loader depends on.
pub fn write_execution_json(
    path: &Path,
    outcome: &SchedulerOutcome,
    aggregates: &SimulationAggregates,
    config: &SimConfig,
) -> Result<()> {
    let mut by_tier = BTreeMap::new();
    for tier in Tier::scheduled_tiers() {
        let t = aggregates.tier(tier);
        by_tier.insert(
            tier.as_str().to_string(),
            TierJson {
                total_workers: t.total_workers,
                straggler_workers: t.straggler_workers,
                workers_with_idle_threads: t.workers_with_idle_threads,
                workers_with_both_straggler_and_idle: t.workers_with_both,
            },
        );
    }

    let report = ExecutionReport {
        total_execution_time: outcome.total_time,
        total_migration_size_bytes: aggregates.total_data_size_bytes,
        total_migration_size_gb: aggregates.total_data_size_bytes as f64 / 1024f64.powi(3),
        simulation_config: SimulationConfigJson {
            small_threads: config.worker_config.small.num_threads,
            medium_threads: config.worker_config.medium.num_threads,
            large_threads: config.worker_config.large.num_threads,
            small_max_workers: config.worker_config.small.max_workers,
            medium_max_workers: config.worker_config.medium.max_workers,
            large_max_workers: config.worker_config.large.max_workers,
            straggler_threshold_percent: config.straggler_threshold_pct,
            execution_mode: config.mode.as_str().to_string(),
            max_concurrent_workers: config.global_max_workers,
        },
        by_tier,
    };

    let file = std::fs::File::create(path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(file, &report).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use migsim_core::{ExecutionMode, TierConfig, WorkerConfig};
    use migsim_sim::scheduler::DroppedSubset;
    use tempfile::TempDir;

    #[test]
    fn round_trips_as_valid_json_with_expected_keys() {
        let config = SimConfig {
            worker_config: WorkerConfig {
                small: TierConfig::new(6, 4).unwrap(),
                medium: TierConfig::new(4, 6).unwrap(),
                large: TierConfig::new(1, 10).unwrap(),
            },
            straggler_threshold_pct: 20.0,
            mode: ExecutionMode::Concurrent,
            global_max_workers: None,
        };
        let outcome = SchedulerOutcome {
            completed_workers: vec![],
            dropped_subsets: Vec::<DroppedSubset>::new(),
            total_time: 42.0,
        };
        let aggregates = SimulationAggregates::default();

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out_execution_report.json");
        write_execution_json(&path, &outcome, &aggregates, &config).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_execution_time"], 42.0);
        assert!(value["by_tier"]["SMALL"].is_object());
        assert_eq!(value["simulation_config"]["execution_mode"], "concurrent");
    }
}
