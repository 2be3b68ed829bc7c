use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use migsim_core::ExecutionMode;

/// Default tier configuration, per Open Question 4 of the design notes:
/// `small=6/4, medium=4/6, large=1/10` (threads/max_workers).
pub const DEFAULT_SMALL_THREADS: u32 = 6;
pub const DEFAULT_MEDIUM_THREADS: u32 = 4;
pub const DEFAULT_LARGE_THREADS: u32 = 1;
pub const DEFAULT_SMALL_MAX_WORKERS: u32 = 4;
pub const DEFAULT_MEDIUM_MAX_WORKERS: u32 = 6;
pub const DEFAULT_LARGE_MAX_WORKERS: u32 = 10;
pub const DEFAULT_STRAGGLER_THRESHOLD: f64 = 20.0;
pub const DEFAULT_OUTPUT_NAME: &str = "simulation_results";
pub const DEFAULT_OUTPUT_DIR: &str = "output_files";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ExecutionModeArg {
    Concurrent,
    Sequential,
    RoundRobin,
}

impl From<ExecutionModeArg> for ExecutionMode {
    fn from(value: ExecutionModeArg) -> Self {
        match value {
            ExecutionModeArg::Concurrent => ExecutionMode::Concurrent,
            ExecutionModeArg::Sequential => ExecutionMode::Sequential,
            ExecutionModeArg::RoundRobin => ExecutionMode::RoundRobin,
        }
    }
}

/// Discrete-event simulator for bulk data-migration worker scheduling.
///
/// Run without a subcommand to simulate a single migration (or a root
/// directory of several); use `compare` to diff two prior runs.
#[derive(Debug, Parser)]
#[command(name = "migsim", version, about, long_about = None)]
pub struct Cli {
    /// Directory to simulate: either a single migration directory
    /// (containing `metadata/subsets/`) or a root containing several such
    /// directories. Omit only when using the `compare` subcommand.
    pub input_dir: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_SMALL_THREADS)]
    pub small_threads: u32,
    #[arg(long, default_value_t = DEFAULT_MEDIUM_THREADS)]
    pub medium_threads: u32,
    #[arg(long, default_value_t = DEFAULT_LARGE_THREADS)]
    pub large_threads: u32,
    #[arg(long, default_value_t = DEFAULT_SMALL_MAX_WORKERS)]
    pub small_max_workers: u32,
    #[arg(long, default_value_t = DEFAULT_MEDIUM_MAX_WORKERS)]
    pub medium_max_workers: u32,
    #[arg(long, default_value_t = DEFAULT_LARGE_MAX_WORKERS)]
    pub large_max_workers: u32,

    /// Percentage above the working-thread average a thread must exceed to
    /// be flagged a straggler.
    #[arg(long, default_value_t = DEFAULT_STRAGGLER_THRESHOLD)]
    pub straggler_threshold: f64,

    /// Skip straggler analysis entirely.
    #[arg(long)]
    pub no_stragglers: bool,

    /// Only emit the summary CSV and execution-report JSON; skip the
    /// per-worker and per-thread detail CSVs.
    #[arg(long)]
    pub summary_only: bool,

    #[arg(long, value_enum, default_value_t = ExecutionModeArg::Concurrent)]
    pub execution_mode: ExecutionModeArg,

    /// Required (and only meaningful) when `--execution-mode round-robin`.
    #[arg(long)]
    pub max_concurrent_workers: Option<u32>,

    #[arg(long, default_value = DEFAULT_OUTPUT_NAME)]
    pub output_name: String,
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Increase log verbosity; repeatable.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-warning output.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Re-read two prior runs' output directories and pair migrations by ID.
    Compare {
        left: PathBuf,
        right: PathBuf,
        /// Write the comparison JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}
