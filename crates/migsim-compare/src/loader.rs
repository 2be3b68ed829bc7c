use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{CompareOutcome, ComparisonResult, MigrationMetrics};

const TIERS: [&str; 3] = ["SMALL", "MEDIUM", "LARGE"];

struct Artifacts {
    json_path: PathBuf,
    csv_path: Option<PathBuf>,
}

/// Scan a run directory for per-migration artifacts: each migration is a
/// subdirectory whose `migration_exec_results/` holds an execution-report
/// JSON and (ideally) a matching workers CSV, keyed by the migration-ID
/// directory name.
fn scan_run_dir(dir: &Path) -> Result<BTreeMap<String, Artifacts>> {
    let mut found = BTreeMap::new();
    let entries = std::fs::read_dir(dir).map_err(|source| Error::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| Error::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(migration_id) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let results_dir = path.join("migration_exec_results");
        if !results_dir.is_dir() {
            continue;
        }

        let mut json_path = None;
        let mut csv_path = None;
        for res_entry in std::fs::read_dir(&results_dir).map_err(|source| Error::Read {
            path: results_dir.clone(),
            source,
        })? {
            let res_entry = res_entry.map_err(|source| Error::Read {
                path: results_dir.clone(),
                source,
            })?;
            let p = res_entry.path();
            let Some(name) = p.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with("_execution_report.json") {
                json_path = Some(p);
            } else if name.ends_with("_workers.csv") {
                csv_path = Some(p);
            }
        }

        if let Some(json_path) = json_path {
            found.insert(migration_id.to_string(), Artifacts { json_path, csv_path });
        }
    }

    Ok(found)
}

fn tier_threads_from_config(sim_config: &serde_json::Value, tier: &str) -> u64 {
    let key = format!("{}_threads", tier.to_lowercase());
    sim_config.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
}

/// Recompute one migration's metrics, preferring the workers CSV; falling
/// back to the JSON's coarser `by_tier` totals when no CSV is present, or
/// when the CSV predates the efficiency columns (old schema).
fn load_metrics(artifacts: &Artifacts) -> Result<MigrationMetrics> {
    let json_text = std::fs::read_to_string(&artifacts.json_path).map_err(|source| Error::Read {
        path: artifacts.json_path.clone(),
        source,
    })?;
    let json: serde_json::Value = serde_json::from_str(&json_text).map_err(|source| Error::Json {
        path: artifacts.json_path.clone(),
        source,
    })?;

    let total_execution_time = json.get("total_execution_time").and_then(|v| v.as_f64()).unwrap_or(0.0);
    let total_migration_size_gb = json
        .get("total_migration_size_gb")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let sim_config = json.get("simulation_config").cloned().unwrap_or(serde_json::Value::Null);
    let by_tier = json.get("by_tier").cloned().unwrap_or(serde_json::Value::Null);

    let json_total_workers: u64 = TIERS
        .iter()
        .filter_map(|t| by_tier.get(t))
        .filter_map(|v| v.get("total_workers"))
        .filter_map(|v| v.as_u64())
        .sum();
    let json_total_cpus: u64 = TIERS
        .iter()
        .filter_map(|t| by_tier.get(*t).map(|v| (*t, v)))
        .filter_map(|(t, v)| {
            v.get("total_workers")
                .and_then(|w| w.as_u64())
                .map(|w| w * tier_threads_from_config(&sim_config, t))
        })
        .sum();

    let Some(csv_path) = &artifacts.csv_path else {
        tracing::debug!(
            json_path = %artifacts.json_path.display(),
            "no workers CSV found alongside execution report, falling back to JSON totals"
        );
        let total_cpus = json_total_cpus;
        return Ok(MigrationMetrics {
            total_workers: json_total_workers,
            total_cpus,
            cpu_time: total_execution_time * total_cpus as f64,
            total_data_size_gb: total_migration_size_gb,
            average_cpu_efficiency_percent: 0.0,
            total_execution_time,
            used_fallback: true,
        });
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_path)
        .map_err(|source| Error::Csv {
            path: csv_path.clone(),
            source,
        })?;
    let headers = reader
        .headers()
        .map_err(|source| Error::Csv {
            path: csv_path.clone(),
            source,
        })?
        .clone();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let tier_idx = col("Tier");
    let num_threads_idx = col("Num_Threads");
    let data_size_idx = col("Data_Size_GB");
    let used_cpu_idx = col("Total_Used_CPU_Time");
    let active_cpu_idx = col("Total_Active_CPU_Time");
    let has_efficiency_columns = used_cpu_idx.is_some() && active_cpu_idx.is_some();

    let mut total_workers = 0u64;
    let mut total_data_size_gb = 0.0f64;
    let mut total_used_cpu_time = 0.0f64;
    let mut total_active_cpu_time = 0.0f64;
    let mut total_cpus_from_rows = 0u64;
    let mut tier_worker_counts: BTreeMap<String, u64> = BTreeMap::new();

    for record in reader.records() {
        let record = record.map_err(|source| Error::Csv {
            path: csv_path.clone(),
            source,
        })?;
        total_workers += 1;

        if let Some(tier) = tier_idx.and_then(|i| record.get(i)) {
            *tier_worker_counts.entry(tier.to_string()).or_insert(0) += 1;
        }
        if let Some(size) = data_size_idx.and_then(|i| record.get(i)) {
            total_data_size_gb += size.parse::<f64>().unwrap_or(0.0);
        }
        if let Some(n) = num_threads_idx.and_then(|i| record.get(i)) {
            total_cpus_from_rows += n.parse::<u64>().unwrap_or(0);
        }
        if has_efficiency_columns {
            total_used_cpu_time += used_cpu_idx
                .and_then(|i| record.get(i))
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);
            total_active_cpu_time += active_cpu_idx
                .and_then(|i| record.get(i))
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(0.0);
        }
    }

    let total_cpus = if num_threads_idx.is_some() {
        total_cpus_from_rows
    } else {
        tier_worker_counts
            .iter()
            .map(|(tier, count)| count * tier_threads_from_config(&sim_config, tier))
            .sum()
    };

    if !has_efficiency_columns {
        tracing::debug!(
            csv_path = %csv_path.display(),
            "workers CSV predates the efficiency columns, falling back to a zeroed efficiency estimate"
        );
        total_used_cpu_time = total_execution_time * total_cpus as f64;
        total_active_cpu_time = 0.0;
    }

    let average_cpu_efficiency_percent = if total_used_cpu_time > 0.0 {
        total_active_cpu_time / total_used_cpu_time * 100.0
    } else {
        0.0
    };

    Ok(MigrationMetrics {
        total_workers,
        total_cpus,
        cpu_time: total_used_cpu_time,
        total_data_size_gb,
        average_cpu_efficiency_percent,
        total_execution_time,
        used_fallback: !has_efficiency_columns,
    })
}

/// Compare two run directories, pairing migrations by ID.
pub fn compare_runs(left_dir: &Path, right_dir: &Path) -> Result<CompareOutcome> {
    let left = scan_run_dir(left_dir)?;
    let right = scan_run_dir(right_dir)?;

    let mut paired = Vec::new();
    let mut left_only = Vec::new();
    for (migration_id, artifacts) in &left {
        match right.get(migration_id) {
            Some(right_artifacts) => {
                paired.push(ComparisonResult {
                    migration_id: migration_id.clone(),
                    left: load_metrics(artifacts)?,
                    right: load_metrics(right_artifacts)?,
                });
            }
            None => left_only.push(migration_id.clone()),
        }
    }
    let right_only: Vec<String> = right.keys().filter(|id| !left.contains_key(*id)).cloned().collect();

    Ok(CompareOutcome {
        paired,
        left_only,
        right_only,
    })
}
