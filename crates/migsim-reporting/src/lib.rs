//! CSV and JSON report emitters for a completed simulation run.
//!
//! File I/O happens only here and only at the end of a run, never
//! interleaved with the subset reader's reads.

mod error;
mod execution_json;
mod format;
mod summary_csv;
mod threads_csv;
mod workers_csv;

pub use error::{Error, Result};
pub use execution_json::write_execution_json;
pub use summary_csv::write_summary_csv;
pub use threads_csv::write_threads_csv;
pub use workers_csv::write_workers_csv;

use std::path::{Path, PathBuf};

use migsim_core::SimConfig;
use migsim_sim::{SchedulerOutcome, SimulationAggregates};

/// Paths of every file `emit_reports` wrote (or would have written before a
/// `--summary-only` suppression).
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub workers_csv: Option<PathBuf>,
    pub threads_csv: Option<PathBuf>,
    pub summary_csv: PathBuf,
    pub execution_json: PathBuf,
}

/// Emit all four report artifacts for a completed run under `output_dir`,
/// named `<output_name>_*`. When `summary_only` is set, the per-worker and
/// per-thread detail CSVs are skipped; the summary and JSON are always
/// written when a simulation reached completion.
///
/// A failure writing one file is reported (via `tracing::error!`) and does
/// not stop the remaining files from being attempted; the first error
/// encountered is still returned to the caller so it can set a nonzero exit
/// code, matching the emitter's fails-open report-write policy.
pub fn emit_reports(
    output_dir: &Path,
    output_name: &str,
    outcome: &SchedulerOutcome,
    aggregates: &SimulationAggregates,
    config: &SimConfig,
    dropped_count: usize,
    summary_only: bool,
) -> Result<ReportPaths> {
    std::fs::create_dir_all(output_dir).map_err(|source| Error::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let summary_path = output_dir.join(format!("{output_name}_summary.csv"));
    let json_path = output_dir.join(format!("{output_name}_execution_report.json"));
    let workers_path = output_dir.join(format!("{output_name}_workers.csv"));
    let threads_path = output_dir.join(format!("{output_name}_threads.csv"));

    let mut first_error: Option<Error> = None;
    macro_rules! record {
        ($result:expr, $path:expr) => {
            match $result {
                Ok(ok) => Some(ok),
                Err(e) => {
                    tracing::error!(path = %$path.display(), error = %e, "failed to write report file");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    None
                }
            }
        };
    }

    record!(
        write_summary_csv(&summary_path, outcome, aggregates, config, dropped_count),
        summary_path
    );
    record!(
        write_execution_json(&json_path, outcome, aggregates, config),
        json_path
    );

    let mut workers_written = None;
    let mut threads_written = None;
    if !summary_only {
        workers_written = record!(write_workers_csv(&workers_path, &outcome.completed_workers), workers_path)
            .map(|_| workers_path.clone());
        threads_written = record!(write_threads_csv(&threads_path, &outcome.completed_workers), threads_path)
            .map(|_| threads_path.clone());
    }

    let paths = ReportPaths {
        workers_csv: workers_written,
        threads_csv: threads_written,
        summary_csv: summary_path,
        execution_json: json_path,
    };

    match first_error {
        Some(e) => Err(e),
        None => Ok(paths),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migsim_core::{ExecutionMode, TierConfig, WorkerConfig};
    use migsim_sim::scheduler::DroppedSubset;
    use tempfile::TempDir;

    fn config() -> SimConfig {
        SimConfig {
            worker_config: WorkerConfig {
                small: TierConfig::new(6, 4).unwrap(),
                medium: TierConfig::new(4, 6).unwrap(),
                large: TierConfig::new(1, 10).unwrap(),
            },
            straggler_threshold_pct: 20.0,
            mode: ExecutionMode::Concurrent,
            global_max_workers: None,
        }
    }

    #[test]
    fn summary_only_skips_detail_csvs() {
        let tmp = TempDir::new().unwrap();
        let outcome = SchedulerOutcome {
            completed_workers: vec![],
            dropped_subsets: Vec::<DroppedSubset>::new(),
            total_time: 0.0,
        };
        let aggregates = SimulationAggregates::default();
        let paths = emit_reports(tmp.path(), "run", &outcome, &aggregates, &config(), 0, true).unwrap();
        assert!(paths.workers_csv.is_none());
        assert!(paths.threads_csv.is_none());
        assert!(paths.summary_csv.exists());
        assert!(paths.execution_json.exists());
    }

    #[test]
    fn full_emit_writes_all_four_files() {
        let tmp = TempDir::new().unwrap();
        let outcome = SchedulerOutcome {
            completed_workers: vec![],
            dropped_subsets: Vec::<DroppedSubset>::new(),
            total_time: 0.0,
        };
        let aggregates = SimulationAggregates::default();
        let paths = emit_reports(tmp.path(), "run", &outcome, &aggregates, &config(), 0, false).unwrap();
        assert!(paths.workers_csv.unwrap().exists());
        assert!(paths.threads_csv.unwrap().exists());
    }
}
