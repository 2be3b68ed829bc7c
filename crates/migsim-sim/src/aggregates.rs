use std::collections::BTreeMap;

use migsim_core::Tier;

use crate::worker::Worker;

/// Per-tier rollup of worker-level analyzer results. Keyed by `Tier::config_tier()`,
/// so a `Universal` ("simple") worker's numbers land in the `Small` bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TierAggregate {
    pub total_workers: u64,
    /// Workers with >= 2 threads, i.e. eligible for straggler analysis.
    pub analyzable_workers: u64,
    pub straggler_workers: u64,
    pub workers_with_idle_threads: u64,
    pub workers_with_both: u64,
}

impl TierAggregate {
    /// `straggler_workers / analyzable_workers * 100`, 0 when nothing was analyzable.
    pub fn straggler_percent(&self) -> f64 {
        if self.analyzable_workers > 0 {
            self.straggler_workers as f64 / self.analyzable_workers as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Rollup across an entire completed simulation: per-tier breakdowns plus
/// the totals (data size, CPU time) that drive the summary report's
/// weighted efficiency figure.
#[derive(Debug, Clone, Default)]
pub struct SimulationAggregates {
    pub by_tier: BTreeMap<Tier, TierAggregate>,
    pub total_workers: u64,
    pub total_data_size_bytes: i64,
    pub total_used_cpu_time: f64,
    pub total_active_cpu_time: f64,
}

impl SimulationAggregates {
    /// Weighted average efficiency: `Σactive_cpu / Σused_cpu * 100`, *not* the
    /// arithmetic mean of each worker's own percentage.
    pub fn weighted_efficiency_percent(&self) -> f64 {
        if self.total_used_cpu_time > 0.0 {
            self.total_active_cpu_time / self.total_used_cpu_time * 100.0
        } else {
            0.0
        }
    }

    pub fn tier(&self, tier: Tier) -> TierAggregate {
        self.by_tier.get(&tier.config_tier()).copied().unwrap_or_default()
    }
}

/// Compute the simulation-wide aggregates from a completed worker list.
/// Workers are expected to have already run through `Worker::identify_stragglers`.
pub fn aggregate(workers: &[Worker]) -> SimulationAggregates {
    let mut result = SimulationAggregates::default();
    for tier in Tier::scheduled_tiers() {
        result.by_tier.insert(tier, TierAggregate::default());
    }

    for worker in workers {
        let bucket = result.by_tier.entry(worker.tier.config_tier()).or_default();
        bucket.total_workers += 1;
        result.total_workers += 1;

        let analyzable = worker.threads.len() >= 2;
        if analyzable {
            bucket.analyzable_workers += 1;
        }
        let has_idle = worker.idle_thread_count() > 0;
        if has_idle {
            bucket.workers_with_idle_threads += 1;
        }
        if worker.is_straggler {
            bucket.straggler_workers += 1;
        }
        if worker.is_straggler && has_idle {
            bucket.workers_with_both += 1;
        }

        result.total_data_size_bytes += worker.total_sstable_size();
        let cpu = worker.cpu_efficiency();
        result.total_used_cpu_time += cpu.total_used_cpu_time;
        result.total_active_cpu_time += cpu.total_active_cpu_time;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use migsim_core::WorkItem;
    use std::path::PathBuf;

    fn subset(tier: Tier, subset_id: &str, items: Vec<WorkItem>) -> migsim_core::Subset {
        let data_size = items.iter().map(|i| i.size).sum();
        migsim_core::Subset {
            migration_id: "mig1".into(),
            label: "lbl".into(),
            subset_id: subset_id.into(),
            tier,
            num_sstables: items.len() as u64,
            data_size,
            path: PathBuf::new(),
            items,
        }
    }

    #[test]
    fn idle_thread_worker_counts_as_idle_not_straggler() {
        let s = subset(Tier::Small, "1", vec![WorkItem::new("a", 5), WorkItem::new("b", 5)]);
        let mut worker = Worker::new(s, Tier::Small, 4, 0.0).unwrap();
        worker.identify_stragglers(20.0);
        let agg = aggregate(&[worker]);
        let small = agg.tier(Tier::Small);
        assert_eq!(small.total_workers, 1);
        assert_eq!(small.workers_with_idle_threads, 1);
        assert_eq!(small.straggler_workers, 0);
    }

    #[test]
    fn universal_worker_aggregates_into_small_bucket() {
        let s = subset(Tier::Universal, "1", vec![WorkItem::new("a", 10)]);
        let worker = Worker::new(s, Tier::Universal, 1, 0.0).unwrap();
        let agg = aggregate(&[worker]);
        assert_eq!(agg.tier(Tier::Small).total_workers, 1);
        assert_eq!(agg.tier(Tier::Universal).total_workers, 1);
    }

    #[test]
    fn weighted_efficiency_matches_cpu_time_ratio() {
        let s1 = subset(Tier::Small, "1", vec![WorkItem::new("a", 10)]);
        let w1 = Worker::new(s1, Tier::Small, 2, 0.0).unwrap();
        let s2 = subset(Tier::Small, "2", vec![WorkItem::new("a", 5), WorkItem::new("b", 5)]);
        let w2 = Worker::new(s2, Tier::Small, 2, 0.0).unwrap();
        let agg = aggregate(&[w1, w2]);
        // w1: used=20, active=10; w2: used=10, active=10 -> total used=30, active=20
        assert_eq!(agg.total_used_cpu_time, 30.0);
        assert_eq!(agg.total_active_cpu_time, 20.0);
        assert!((agg.weighted_efficiency_percent() - (20.0 / 30.0 * 100.0)).abs() < 1e-9);
    }
}
