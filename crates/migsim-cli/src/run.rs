use std::path::{Path, PathBuf};

use anyhow::{bail, Context};

use migsim_core::{SimConfig, TierConfig, WorkerConfig};
use migsim_reporting::ReportPaths;
use migsim_sim::SimulationAggregates;

use crate::cli::Cli;

/// Distinguishes the error taxonomy: an `Input`/`Config` failure exits
/// 1, a `Simulation` failure (the scheduler itself never got off the
/// ground) exits 2. Report-write failures are reported as `Input` here
/// since they are non-fatal-but-nonzero, matching the emitter's fails-open
/// report-write policy.
pub enum RunFailure {
    Input(anyhow::Error),
    Simulation(anyhow::Error),
}

impl RunFailure {
    pub fn into_error(self) -> anyhow::Error {
        match self {
            RunFailure::Input(e) | RunFailure::Simulation(e) => e,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RunFailure::Input(_) => 1,
            RunFailure::Simulation(_) => 2,
        }
    }
}

/// One migration's outcome, enough for the CLI's human-readable summary and
/// for deciding the process exit code.
pub struct MigrationRunResult {
    pub migration_id: String,
    pub total_time: f64,
    pub total_workers: u64,
    pub dropped_count: usize,
    pub weighted_efficiency_percent: f64,
    pub report_paths: ReportPaths,
}

/// Whether a directory looks like a single migration root (directly
/// contains `metadata/subsets/`).
fn is_migration_dir(dir: &Path) -> bool {
    dir.join("metadata").join("subsets").is_dir()
}

/// Resolve `input_dir` into one or more migration directories: itself, if it
/// is a single migration, or its immediate migration-shaped subdirectories
/// otherwise, when it is a root containing several migration directories.
pub fn discover_migration_dirs(input_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if is_migration_dir(input_dir) {
        return Ok(vec![input_dir.to_path_buf()]);
    }

    let mut found = Vec::new();
    let entries = std::fs::read_dir(input_dir)
        .with_context(|| format!("reading input directory {}", input_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() && is_migration_dir(&path) {
            found.push(path);
        }
    }
    found.sort();

    if found.is_empty() {
        bail!(
            "{} does not contain a 'metadata/subsets' tree, nor does any of its immediate subdirectories",
            input_dir.display()
        );
    }
    Ok(found)
}

pub fn build_sim_config(cli: &Cli) -> anyhow::Result<SimConfig> {
    let worker_config = WorkerConfig {
        small: TierConfig::new(cli.small_threads, cli.small_max_workers)
            .context("--small-threads/--small-max-workers")?,
        medium: TierConfig::new(cli.medium_threads, cli.medium_max_workers)
            .context("--medium-threads/--medium-max-workers")?,
        large: TierConfig::new(cli.large_threads, cli.large_max_workers)
            .context("--large-threads/--large-max-workers")?,
    };
    let config = SimConfig {
        worker_config,
        straggler_threshold_pct: cli.straggler_threshold,
        mode: cli.execution_mode.into(),
        global_max_workers: cli.max_concurrent_workers,
    };
    config.validate().context("invalid execution configuration")?;
    Ok(config)
}

/// Run the full read -> schedule -> analyze -> report pipeline for one
/// migration directory, writing output under `output_root` (directly, for a
/// single-migration run, or under `output_root/<migration_id>/migration_exec_results/`
/// for a multi-migration run, matching what the comparison loader expects).
pub fn run_one_migration(
    migration_dir: &Path,
    output_root: &Path,
    multi: bool,
    config: &SimConfig,
    cli: &Cli,
) -> Result<MigrationRunResult, RunFailure> {
    let migration_id = migration_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let (subsets, warnings) = migsim_core::read_subsets(migration_dir)
        .with_context(|| format!("reading subsets for migration {migration_id}"))
        .map_err(RunFailure::Input)?;
    for warning in &warnings {
        tracing::warn!(path = %warning.path.display(), error = %warning.error, "dropped unreadable subset file");
    }

    let mut outcome = migsim_sim::scheduler::run(config, subsets)
        .with_context(|| format!("simulating migration {migration_id}"))
        .map_err(RunFailure::Simulation)?;

    if cli.no_stragglers {
        for worker in &mut outcome.completed_workers {
            worker.straggler_thread_ids.clear();
            worker.is_straggler = false;
        }
    }

    let dropped_count = warnings.len() + outcome.dropped_subsets.len();
    let aggregates: SimulationAggregates = migsim_sim::aggregate(&outcome.completed_workers);

    let output_dir = if multi {
        output_root.join(&migration_id).join("migration_exec_results")
    } else {
        output_root.to_path_buf()
    };

    let report_paths = migsim_reporting::emit_reports(
        &output_dir,
        &cli.output_name,
        &outcome,
        &aggregates,
        config,
        dropped_count,
        cli.summary_only,
    )
    .with_context(|| format!("writing reports for migration {migration_id}"))
    .map_err(RunFailure::Input)?;

    Ok(MigrationRunResult {
        migration_id,
        total_time: outcome.total_time,
        total_workers: aggregates.total_workers,
        dropped_count,
        weighted_efficiency_percent: aggregates.weighted_efficiency_percent(),
        report_paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn single_migration_dir_is_detected_directly() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("metadata/subsets")).unwrap();
        let dirs = discover_migration_dirs(tmp.path()).unwrap();
        assert_eq!(dirs, vec![tmp.path().to_path_buf()]);
    }

    #[test]
    fn root_of_several_migrations_finds_each_one() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("mig_a/metadata/subsets")).unwrap();
        fs::create_dir_all(tmp.path().join("mig_b/metadata/subsets")).unwrap();
        fs::create_dir_all(tmp.path().join("not_a_migration")).unwrap();
        let dirs = discover_migration_dirs(tmp.path()).unwrap();
        assert_eq!(dirs.len(), 2);
    }

    #[test]
    fn neither_shape_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(discover_migration_dirs(tmp.path()).is_err());
    }
}
