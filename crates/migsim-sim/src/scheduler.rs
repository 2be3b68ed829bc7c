use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use migsim_core::{ExecutionMode, SimConfig, Subset, Tier};

use crate::error::{Error, Result};
use crate::worker::Worker;

/// A subset that could not be turned into a worker, kept for the caller to
/// report as a warning.
pub struct DroppedSubset {
    pub subset: Subset,
    pub reason: String,
}

/// The full outcome of a scheduled simulation run.
pub struct SchedulerOutcome {
    pub completed_workers: Vec<Worker>,
    pub dropped_subsets: Vec<DroppedSubset>,
    pub total_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EventKey(f64, u64);

impl Eq for EventKey {}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.1.cmp(&other.1))
    }
}

struct PendingEvent {
    key: EventKey,
    worker: Worker,
}

impl PartialEq for PendingEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for PendingEvent {}
impl PartialOrd for PendingEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PendingEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// Pending-subset queues, keyed by the tier whose `TierConfig` and
/// scheduling slot they use (`Universal` subsets live in the `small` queue).
#[derive(Default)]
struct TierQueues {
    large: VecDeque<Subset>,
    medium: VecDeque<Subset>,
    small: VecDeque<Subset>,
}

impl TierQueues {
    fn from_subsets(subsets: Vec<Subset>) -> Self {
        let mut queues = TierQueues::default();
        for subset in subsets {
            queues.queue_mut(subset.tier.config_tier()).push_back(subset);
        }
        queues
    }

    fn queue_mut(&mut self, tier: Tier) -> &mut VecDeque<Subset> {
        match tier {
            Tier::Large => &mut self.large,
            Tier::Medium => &mut self.medium,
            Tier::Small => &mut self.small,
            Tier::Universal => unreachable!("queues are keyed by config_tier, never Universal"),
        }
    }

    fn is_empty(&self) -> bool {
        self.large.is_empty() && self.medium.is_empty() && self.small.is_empty()
    }
}

#[derive(Default)]
struct ActiveCounts {
    large: u32,
    medium: u32,
    small: u32,
}

impl ActiveCounts {
    fn get(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Large => self.large,
            Tier::Medium => self.medium,
            Tier::Small => self.small,
            Tier::Universal => unreachable!(),
        }
    }

    fn incr(&mut self, tier: Tier) {
        match tier {
            Tier::Large => self.large += 1,
            Tier::Medium => self.medium += 1,
            Tier::Small => self.small += 1,
            Tier::Universal => unreachable!(),
        }
    }

    fn decr(&mut self, tier: Tier) {
        match tier {
            Tier::Large => self.large -= 1,
            Tier::Medium => self.medium -= 1,
            Tier::Small => self.small -= 1,
            Tier::Universal => unreachable!(),
        }
    }

    fn total(&self) -> u32 {
        self.large + self.medium + self.small
    }
}

struct Engine<'a> {
    config: &'a SimConfig,
    queues: TierQueues,
    active: ActiveCounts,
    heap: BinaryHeap<Reverse<PendingEvent>>,
    sequence: u64,
    current_time: f64,
    completed: Vec<Worker>,
    dropped: Vec<DroppedSubset>,
}

impl<'a> Engine<'a> {
    fn new(config: &'a SimConfig, subsets: Vec<Subset>) -> Self {
        Engine {
            config,
            queues: TierQueues::from_subsets(subsets),
            active: ActiveCounts::default(),
            heap: BinaryHeap::new(),
            sequence: 0,
            current_time: 0.0,
            completed: Vec::new(),
            dropped: Vec::new(),
        }
    }

    fn can_spawn(&self, queue_tier: Tier) -> bool {
        match self.config.mode {
            ExecutionMode::RoundRobin => {
                self.active.total() < self.config.global_max_workers.unwrap_or(0)
            }
            ExecutionMode::Concurrent | ExecutionMode::Sequential => {
                self.active.get(queue_tier) < self.config.worker_config.for_tier(queue_tier).max_workers
            }
        }
    }

    /// Spawn a worker for `subset` (whose queue slot is `queue_tier`),
    /// pushing its completion event. On failure the subset is recorded as
    /// dropped and nothing is scheduled.
    fn spawn(&mut self, queue_tier: Tier, subset: Subset) {
        let num_threads = self.config.worker_config.for_tier(queue_tier).num_threads;
        let actual_tier = subset.tier;
        let subset_for_error = subset.clone();
        match Worker::new(subset, actual_tier, num_threads, self.current_time) {
            Ok(worker) => {
                let key = EventKey(worker.completion_time, self.sequence);
                self.sequence += 1;
                self.active.incr(queue_tier);
                self.heap.push(Reverse(PendingEvent { key, worker }));
            }
            Err(e) => {
                tracing::warn!(subset_id = %subset_for_error.subset_id, error = %e, "failed to schedule subset");
                self.dropped.push(DroppedSubset {
                    subset: subset_for_error,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn retire_next(&mut self) -> Option<Worker> {
        let Reverse(event) = self.heap.pop()?;
        self.current_time = event.key.0;
        let mut worker = event.worker;
        self.active.decr(worker.tier.config_tier());
        worker.identify_stragglers(self.config.straggler_threshold_pct);
        Some(worker)
    }

    fn fill_tier(&mut self, tier: Tier) {
        while self.can_spawn(tier) {
            let Some(subset) = self.queues.queue_mut(tier).pop_front() else {
                break;
            };
            self.spawn(tier, subset);
        }
    }

    fn run_concurrent(mut self) -> Result<SchedulerOutcome> {
        for tier in Tier::scheduled_tiers() {
            self.fill_tier(tier);
        }
        if self.heap.is_empty() {
            return Err(starvation_error(&self.dropped));
        }
        while let Some(worker) = self.retire_next() {
            let tier = worker.tier.config_tier();
            self.completed.push(worker);
            self.fill_tier(tier);
        }
        Ok(self.finish())
    }

    fn run_sequential(mut self) -> Result<SchedulerOutcome> {
        for tier in Tier::scheduled_tiers() {
            if self.queues.queue_mut(tier).is_empty() {
                continue;
            }
            self.fill_tier(tier);
            loop {
                let has_pending = !self.queues.queue_mut(tier).is_empty();
                let has_active = self.active.get(tier) > 0;
                if !has_pending && !has_active {
                    break;
                }
                match self.retire_next() {
                    Some(worker) => {
                        self.completed.push(worker);
                        self.fill_tier(tier);
                    }
                    None => break,
                }
            }
        }
        if self.completed.is_empty() {
            return Err(starvation_error(&self.dropped));
        }
        Ok(self.finish())
    }

    fn round_robin_order() -> [Tier; 3] {
        [Tier::Large, Tier::Medium, Tier::Small]
    }

    fn run_round_robin(mut self) -> Result<SchedulerOutcome> {
        let order = Self::round_robin_order();
        let mut cursor = 0usize;

        let try_assign_one = |engine: &mut Self, cursor: &mut usize| -> bool {
            for _ in 0..order.len() {
                let tier = order[*cursor];
                *cursor = (*cursor + 1) % order.len();
                if engine.can_spawn(tier) {
                    if let Some(subset) = engine.queues.queue_mut(tier).pop_front() {
                        engine.spawn(tier, subset);
                        return true;
                    }
                }
            }
            false
        };

        while !self.queues.is_empty() && self.active.total() < self.config.global_max_workers.unwrap_or(0) {
            if !try_assign_one(&mut self, &mut cursor) {
                break;
            }
        }

        if self.heap.is_empty() {
            return Err(starvation_error(&self.dropped));
        }

        while let Some(worker) = self.retire_next() {
            self.completed.push(worker);
            if !self.queues.is_empty() {
                let mut attempts = 0;
                while attempts < order.len()
                    && self.active.total() < self.config.global_max_workers.unwrap_or(0)
                {
                    if try_assign_one(&mut self, &mut cursor) {
                        break;
                    }
                    attempts += 1;
                }
            }
        }

        Ok(self.finish())
    }

    fn finish(self) -> SchedulerOutcome {
        SchedulerOutcome {
            completed_workers: self.completed,
            dropped_subsets: self.dropped,
            total_time: self.current_time,
        }
    }
}

fn starvation_error(dropped: &[DroppedSubset]) -> Error {
    let details: Vec<String> = dropped
        .iter()
        .map(|d| format!("- {}: {}", d.subset.path.display(), d.reason))
        .collect();
    Error::Simulation(format!(
        "failed to start any workers; all initial subset assignments failed:\n{}",
        details.join("\n")
    ))
}

/// Run a full simulation over `subsets` per `config`'s execution mode.
pub fn run(config: &SimConfig, subsets: Vec<Subset>) -> Result<SchedulerOutcome> {
    config.validate()?;
    if subsets.is_empty() {
        return Err(Error::Simulation("no subsets provided for simulation".into()));
    }

    let engine = Engine::new(config, subsets);
    match config.mode {
        ExecutionMode::Concurrent => engine.run_concurrent(),
        ExecutionMode::Sequential => engine.run_sequential(),
        ExecutionMode::RoundRobin => engine.run_round_robin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migsim_core::{TierConfig, WorkItem, WorkerConfig};
    use std::path::PathBuf;

    fn worker_config() -> WorkerConfig {
        WorkerConfig {
            small: TierConfig::new(1, 4).unwrap(),
            medium: TierConfig::new(1, 6).unwrap(),
            large: TierConfig::new(1, 10).unwrap(),
        }
    }

    fn subset(tier: Tier, subset_id: &str, size: i64) -> Subset {
        Subset {
            migration_id: "mig1".into(),
            label: "lbl".into(),
            subset_id: subset_id.into(),
            tier,
            num_sstables: 1,
            data_size: size,
            path: PathBuf::from(format!("subset-{subset_id}")),
            items: vec![WorkItem::new("a", size)],
        }
    }

    #[test]
    fn sequential_mode_orders_tiers_large_medium_small() {
        let config = SimConfig {
            worker_config: worker_config(),
            straggler_threshold_pct: 20.0,
            mode: ExecutionMode::Sequential,
            global_max_workers: None,
        };
        let subsets = vec![
            subset(Tier::Large, "1", 10),
            subset(Tier::Medium, "1", 5),
            subset(Tier::Small, "1", 3),
        ];
        let outcome = run(&config, subsets).unwrap();
        assert_eq!(outcome.total_time, 18.0);
        let large = outcome.completed_workers.iter().find(|w| w.tier == Tier::Large).unwrap();
        let medium = outcome.completed_workers.iter().find(|w| w.tier == Tier::Medium).unwrap();
        let small = outcome.completed_workers.iter().find(|w| w.tier == Tier::Small).unwrap();
        assert!(large.completion_time <= medium.start_time);
        assert!(medium.completion_time <= small.start_time);
    }

    #[test]
    fn round_robin_respects_global_cap() {
        let config = SimConfig {
            worker_config: worker_config(),
            straggler_threshold_pct: 20.0,
            mode: ExecutionMode::RoundRobin,
            global_max_workers: Some(2),
        };
        let subsets = vec![
            subset(Tier::Large, "1", 4),
            subset(Tier::Large, "2", 4),
            subset(Tier::Medium, "1", 4),
            subset(Tier::Medium, "2", 4),
            subset(Tier::Small, "1", 4),
            subset(Tier::Small, "2", 4),
        ];
        let outcome = run(&config, subsets).unwrap();
        assert_eq!(outcome.total_time, 12.0);
        assert_eq!(outcome.completed_workers.len(), 6);
    }

    #[test]
    fn concurrent_mode_fills_all_tiers_up_front() {
        let config = SimConfig {
            worker_config: worker_config(),
            straggler_threshold_pct: 20.0,
            mode: ExecutionMode::Concurrent,
            global_max_workers: None,
        };
        let subsets = vec![subset(Tier::Large, "1", 10), subset(Tier::Small, "1", 3)];
        let outcome = run(&config, subsets).unwrap();
        assert_eq!(outcome.total_time, 10.0);
        assert_eq!(outcome.completed_workers.len(), 2);
    }

    #[test]
    fn empty_subset_list_is_rejected() {
        let config = SimConfig {
            worker_config: worker_config(),
            straggler_threshold_pct: 20.0,
            mode: ExecutionMode::Concurrent,
            global_max_workers: None,
        };
        assert!(run(&config, vec![]).is_err());
    }
}
