use std::fmt::Write as _;
use std::path::Path;

use migsim_core::{SimConfig, Tier};
use migsim_sim::{SchedulerOutcome, SimulationAggregates};

use crate::error::{Error, Result};
use crate::format::{fmt1, fmt2};

/// Write `<base>_summary.csv`: a `Metric,Value` key/value block, a blank
/// line, then a per-tier breakdown table. When `dropped_count > 0` the file
/// opens with a `#`-prefixed comment recording it.
pub fn write_summary_csv(
    path: &Path,
    outcome: &SchedulerOutcome,
    aggregates: &SimulationAggregates,
    config: &SimConfig,
    dropped_count: usize,
) -> Result<()> {
    let mut out = String::new();

    if dropped_count > 0 {
        let _ = writeln!(out, "# {dropped_count} subset(s) dropped during read or scheduling");
    }

    let total_cpus: u64 = Tier::scheduled_tiers()
        .into_iter()
        .map(|tier| {
            let cfg = config.worker_config.for_tier(tier);
            aggregates.tier(tier).total_workers * cfg.num_threads as u64
        })
        .sum();

    out.push_str("Metric,Value\n");
    let _ = writeln!(out, "Total_Simulation_Time,{}", fmt2(outcome.total_time));
    let _ = writeln!(out, "Total_Workers,{}", aggregates.total_workers);
    let _ = writeln!(
        out,
        "Straggler_Threshold_Percent,{}",
        fmt1(config.straggler_threshold_pct)
    );
    let _ = writeln!(out, "Total_CPUs,{total_cpus}");
    let _ = writeln!(out, "Total_CPU_Time,{}", fmt2(aggregates.total_used_cpu_time));

    out.push('\n');
    out.push_str("Tier,Total_Workers,Analyzable_Workers,Straggler_Workers,Straggler_Percent\n");
    for tier in Tier::scheduled_tiers() {
        let t = aggregates.tier(tier);
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            tier.as_str(),
            t.total_workers,
            t.analyzable_workers,
            t.straggler_workers,
            fmt1(t.straggler_percent())
        );
    }

    std::fs::write(path, out).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
