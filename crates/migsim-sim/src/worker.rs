use std::collections::BTreeSet;

use migsim_core::{Subset, Tier};

use crate::error::{Error, Result};
use crate::thread_sim::{self, ThreadTimeline};

/// CPU allocation metrics for a single completed worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuEfficiency {
    pub total_used_cpu_time: f64,
    pub total_active_cpu_time: f64,
    pub cpu_inefficiency: f64,
    pub cpu_efficiency_percent: f64,
}

/// A worker process simulated over its assigned subset. Created, driven
/// through `process()` once, then only read from.
#[derive(Debug, Clone)]
pub struct Worker {
    pub worker_id: u64,
    pub tier: Tier,
    pub num_threads: u32,
    pub start_time: f64,
    pub completion_time: f64,
    pub subset: Subset,
    pub threads: Vec<ThreadTimeline>,
    pub straggler_thread_ids: BTreeSet<usize>,
    pub is_straggler: bool,
}

impl Worker {
    /// Create a worker and immediately run its thread-level simulation.
    pub fn new(subset: Subset, tier: Tier, num_threads: u32, start_time: f64) -> Result<Self> {
        let worker_id = subset
            .numeric_subset_id()
            .ok_or_else(|| Error::InvalidWorkerId(subset.subset_id.clone()))?;

        let mut worker = Worker {
            worker_id,
            tier,
            num_threads,
            start_time,
            completion_time: start_time,
            subset,
            threads: Vec::new(),
            straggler_thread_ids: BTreeSet::new(),
            is_straggler: false,
        };
        worker.process()?;
        Ok(worker)
    }

    fn process(&mut self) -> Result<()> {
        if self.subset.num_sstables == 0 {
            self.completion_time = self.start_time;
            return Ok(());
        }

        let items = self.subset.effective_items();
        let threads = thread_sim::simulate(&items, self.num_threads as usize, 1.0);
        if threads.is_empty() {
            return Err(Error::Simulation(format!(
                "thread simulation returned no results for worker {}",
                self.worker_id
            )));
        }
        let max_available = threads.iter().map(|t| t.available_time).fold(0.0_f64, f64::max);
        self.completion_time = self.start_time + max_available;
        self.threads = threads;
        Ok(())
    }

    /// Populate `straggler_thread_ids` and `is_straggler`. Only applicable
    /// when the worker has at least two threads; single-thread and
    /// zero-thread workers can never have stragglers by definition.
    pub fn identify_stragglers(&mut self, straggler_threshold_percent: f64) {
        self.straggler_thread_ids.clear();
        self.is_straggler = false;

        if self.threads.len() <= 1 {
            return;
        }

        let working = working_threads(&self.threads);
        if working.len() < 2 {
            return;
        }

        let avg: f64 = working.iter().map(|t| t.available_time).sum::<f64>() / working.len() as f64;
        let threshold = avg * (1.0 + straggler_threshold_percent / 100.0);

        for thread in working {
            if thread.available_time > threshold {
                self.straggler_thread_ids.insert(thread.thread_id);
            }
        }
        self.is_straggler = !self.straggler_thread_ids.is_empty();
    }

    /// Idle threads: threads below the same meaningful-work threshold used
    /// by straggler detection. Only meaningful for multi-thread workers.
    pub fn idle_thread_count(&self) -> usize {
        if self.threads.len() <= 1 {
            return 0;
        }
        let threshold = meaningful_threshold(&self.threads);
        self.threads
            .iter()
            .filter(|t| t.available_time < threshold)
            .count()
    }

    pub fn cpu_efficiency(&self) -> CpuEfficiency {
        if self.threads.is_empty() {
            return CpuEfficiency {
                total_used_cpu_time: 0.0,
                total_active_cpu_time: 0.0,
                cpu_inefficiency: 0.0,
                cpu_efficiency_percent: 0.0,
            };
        }
        let worker_duration = self.completion_time - self.start_time;
        let total_used_cpu_time = worker_duration * self.num_threads as f64;
        let total_active_cpu_time: f64 = self.threads.iter().map(|t| t.total_processing_time).sum();
        let cpu_inefficiency = total_used_cpu_time - total_active_cpu_time;
        let cpu_efficiency_percent = if total_used_cpu_time > 0.0 {
            total_active_cpu_time / total_used_cpu_time * 100.0
        } else {
            0.0
        };
        CpuEfficiency {
            total_used_cpu_time,
            total_active_cpu_time,
            cpu_inefficiency,
            cpu_efficiency_percent,
        }
    }

    /// Sum of actual (not metadata) item sizes processed across all threads.
    pub fn total_sstable_size(&self) -> i64 {
        self.threads
            .iter()
            .flat_map(|t| t.processed_items.iter())
            .map(|item| item.size)
            .sum()
    }
}

/// Median-based "did meaningful work" threshold shared by straggler and
/// idle-thread detection: at least 10% of the median completion time, or
/// 1.0 time unit, whichever is larger.
fn meaningful_threshold(threads: &[ThreadTimeline]) -> f64 {
    let mut times: Vec<f64> = threads.iter().map(|t| t.available_time).collect();
    times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = times[times.len() / 2];
    (median * 0.1).max(1.0)
}

fn working_threads(threads: &[ThreadTimeline]) -> Vec<&ThreadTimeline> {
    let threshold = meaningful_threshold(threads);
    threads.iter().filter(|t| t.available_time >= threshold).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use migsim_core::WorkItem;
    use std::path::PathBuf;

    fn subset(subset_id: &str, num_sstables: u64, data_size: i64, items: Vec<WorkItem>) -> Subset {
        Subset {
            migration_id: "mig1".into(),
            label: "lbl".into(),
            subset_id: subset_id.into(),
            tier: Tier::Small,
            num_sstables,
            data_size,
            path: PathBuf::new(),
            items,
        }
    }

    #[test]
    fn zero_sstable_subset_completes_instantly_with_no_threads() {
        let s = subset("1", 0, 0, vec![]);
        let worker = Worker::new(s, Tier::Small, 3, 5.0).unwrap();
        assert_eq!(worker.completion_time, 5.0);
        assert!(worker.threads.is_empty());
    }

    #[test]
    fn empty_file_with_nonzero_metadata_falls_back_to_synthetic_item() {
        let s = subset("1", 1, 1000, vec![]);
        let worker = Worker::new(s, Tier::Small, 4, 0.0).unwrap();
        assert_eq!(worker.completion_time, 1000.0);
        assert_eq!(worker.idle_thread_count(), 3);
    }

    #[test]
    fn straggler_requires_at_least_two_threads() {
        let s = subset("1", 1, 100, vec![WorkItem::new("a", 100)]);
        let mut worker = Worker::new(s, Tier::Small, 1, 0.0).unwrap();
        worker.identify_stragglers(20.0);
        assert!(!worker.is_straggler);
    }

    #[test]
    fn straggler_detected_for_dominant_thread() {
        let mut items = vec![WorkItem::new("big", 100)];
        for i in 0..10 {
            items.push(WorkItem::new(&format!("s{i}"), 1));
        }
        let s = subset("1", items.len() as u64, 110, items);
        let mut worker = Worker::new(s, Tier::Large, 3, 0.0).unwrap();
        worker.identify_stragglers(20.0);
        assert!(worker.is_straggler);
    }

    #[test]
    fn worker_id_parsed_from_subset_id() {
        let s = subset("42", 1, 10, vec![WorkItem::new("a", 10)]);
        let worker = Worker::new(s, Tier::Small, 1, 0.0).unwrap();
        assert_eq!(worker.worker_id, 42);
    }

    #[test]
    fn invalid_subset_id_is_rejected() {
        let s = subset("not-a-number", 1, 10, vec![WorkItem::new("a", 10)]);
        assert!(Worker::new(s, Tier::Small, 1, 0.0).is_err());
    }
}
