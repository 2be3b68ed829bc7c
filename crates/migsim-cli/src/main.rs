mod cli;
mod run;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use rayon::prelude::*;

use cli::{Cli, Command};
use run::RunFailure;

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("migsim={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Command::Compare { left, right, output }) => compare_command(left, right, output.as_deref()),
        None => run_command(&cli),
    };

    match result {
        Ok(code) => code,
        Err(failure) => {
            eprintln!("{} {}", "error:".red().bold(), failure.into_error());
            ExitCode::from(failure.exit_code())
        }
    }
}

fn run_command(cli: &Cli) -> Result<ExitCode, RunFailure> {
    let Some(input_dir) = &cli.input_dir else {
        return Err(RunFailure::Input(anyhow::anyhow!(
            "an input directory is required unless using the 'compare' subcommand"
        )));
    };

    let config = run::build_sim_config(cli).map_err(RunFailure::Input)?;
    let migration_dirs = run::discover_migration_dirs(input_dir).map_err(RunFailure::Input)?;
    let multi = migration_dirs.len() > 1;

    let results: Vec<_> = migration_dirs
        .par_iter()
        .map(|dir| run::run_one_migration(dir, &cli.output_dir, multi, &config, cli))
        .collect();

    let mut exit_code = 0u8;
    let mut any_succeeded = false;
    for outcome in results {
        match outcome {
            Ok(result) => {
                any_succeeded = true;
                print_summary(&result, cli.quiet);
            }
            Err(failure) => {
                eprintln!("{} {}", "error:".red().bold(), failure.into_error());
                exit_code = exit_code.max(failure.exit_code());
            }
        }
    }

    if !any_succeeded && exit_code == 0 {
        exit_code = 1;
    }
    Ok(ExitCode::from(exit_code))
}

fn print_summary(result: &run::MigrationRunResult, quiet: bool) {
    if quiet {
        return;
    }
    println!(
        "{} {} — {} workers, {:.1}s, {:.1}% CPU efficiency{}",
        "✓".green(),
        result.migration_id.bold(),
        result.total_workers,
        result.total_time,
        result.weighted_efficiency_percent,
        if result.dropped_count > 0 {
            format!(" ({} subset(s) dropped)", result.dropped_count).yellow().to_string()
        } else {
            String::new()
        }
    );
    println!("  summary: {}", result.report_paths.summary_csv.display());
    println!("  report:  {}", result.report_paths.execution_json.display());
}

fn compare_command(
    left: &std::path::Path,
    right: &std::path::Path,
    output: Option<&std::path::Path>,
) -> Result<ExitCode, RunFailure> {
    let outcome = migsim_compare::compare_runs(left, right)
        .map_err(|e| RunFailure::Input(anyhow::Error::new(e)))?;

    let json = serde_json::json!({
        "paired": outcome.paired.iter().map(|c| serde_json::json!({
            "migration_id": c.migration_id,
            "left": metrics_json(&c.left),
            "right": metrics_json(&c.right),
            "execution_time_ratio": c.execution_time().ratio(),
            "worker_count_ratio": c.worker_count().ratio(),
            "cpu_efficiency_delta": c.right.average_cpu_efficiency_percent - c.left.average_cpu_efficiency_percent,
        })).collect::<Vec<_>>(),
        "left_only": outcome.left_only,
        "right_only": outcome.right_only,
    });
    let text = serde_json::to_string_pretty(&json)
        .map_err(|e| RunFailure::Input(anyhow::Error::new(e)))?;

    match output {
        Some(path) => {
            std::fs::write(path, &text)
                .map_err(|e| RunFailure::Input(anyhow::Error::new(e).context(format!("writing {}", path.display()))))?;
        }
        None => println!("{text}"),
    }

    Ok(ExitCode::from(0))
}

fn metrics_json(m: &migsim_compare::MigrationMetrics) -> serde_json::Value {
    serde_json::json!({
        "total_workers": m.total_workers,
        "total_cpus": m.total_cpus,
        "cpu_time": m.cpu_time,
        "total_data_size_gb": m.total_data_size_gb,
        "average_cpu_efficiency_percent": m.average_cpu_efficiency_percent,
        "total_execution_time": m.total_execution_time,
        "used_fallback": m.used_fallback,
    })
}
