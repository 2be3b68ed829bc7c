use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use migsim_core::WorkItem;

/// One thread's timeline: the items it processed, in order, plus when each
/// one started. `available_time` is when the thread finishes its last item
/// (0.0 if it never received work).
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadTimeline {
    pub thread_id: usize,
    pub processed_items: Vec<WorkItem>,
    pub task_start_times: Vec<f64>,
    pub total_processing_time: f64,
    pub available_time: f64,
}

impl ThreadTimeline {
    fn new(thread_id: usize) -> Self {
        Self {
            thread_id,
            processed_items: Vec::new(),
            task_start_times: Vec::new(),
            total_processing_time: 0.0,
            available_time: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapKey {
    available_time: f64,
    thread_id: usize,
}

impl Eq for HeapKey {}

impl PartialOrd for HeapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.available_time
            .partial_cmp(&other.available_time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.thread_id.cmp(&other.thread_id))
    }
}

/// Longest-Processing-Time-first simulation of `num_threads` threads
/// executing `items`. Pure function: no I/O, never errors given
/// `num_threads >= 1` (the caller is responsible for rejecting zero).
pub fn simulate(items: &[WorkItem], num_threads: usize, processing_time_unit: f64) -> Vec<ThreadTimeline> {
    debug_assert!(num_threads > 0, "num_threads must be positive");

    let mut sorted_items: Vec<&WorkItem> = items.iter().collect();
    sorted_items.sort_by(|a, b| b.size.cmp(&a.size));

    let mut threads: Vec<ThreadTimeline> = (0..num_threads).map(ThreadTimeline::new).collect();
    let mut heap: BinaryHeap<Reverse<HeapKey>> = BinaryHeap::new();
    let current_time = 0.0_f64;

    let initial_count = sorted_items.len().min(num_threads);
    for (thread_id, item) in sorted_items.iter().enumerate().take(initial_count) {
        let processing_time = item.size as f64 * processing_time_unit;
        let completion_time = current_time + processing_time;
        let thread = &mut threads[thread_id];
        thread.task_start_times.push(current_time);
        thread.processed_items.push((*item).clone());
        thread.total_processing_time += processing_time;
        thread.available_time = completion_time;
        heap.push(Reverse(HeapKey {
            available_time: completion_time,
            thread_id,
        }));
    }

    for item in sorted_items.iter().skip(initial_count) {
        let Reverse(top) = heap.pop().expect("heap must not be empty while items remain");
        let processing_time = item.size as f64 * processing_time_unit;
        let start_time = top.available_time;
        let completion_time = start_time + processing_time;
        let thread = &mut threads[top.thread_id];
        thread.task_start_times.push(start_time);
        thread.processed_items.push((*item).clone());
        thread.total_processing_time += processing_time;
        thread.available_time = completion_time;
        heap.push(Reverse(HeapKey {
            available_time: completion_time,
            thread_id: top.thread_id,
        }));
    }

    threads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, size: i64) -> WorkItem {
        WorkItem::new(key, size)
    }

    #[test]
    fn lpt_sanity_three_threads() {
        let items = vec![
            item("a", 10),
            item("b", 8),
            item("c", 7),
            item("d", 6),
            item("e", 5),
            item("f", 4),
        ];
        let threads = simulate(&items, 3, 1.0);
        let makespan = threads.iter().map(|t| t.available_time).fold(0.0, f64::max);
        assert_eq!(makespan, 14.0);
    }

    #[test]
    fn idle_threads_when_fewer_items_than_threads() {
        let items = vec![item("a", 5), item("b", 5)];
        let threads = simulate(&items, 4, 1.0);
        let idle = threads.iter().filter(|t| t.processed_items.is_empty()).count();
        assert_eq!(idle, 2);
        let busy: Vec<f64> = threads
            .iter()
            .filter(|t| !t.processed_items.is_empty())
            .map(|t| t.available_time)
            .collect();
        assert_eq!(busy, vec![5.0, 5.0]);
    }

    #[test]
    fn empty_items_yields_all_idle_threads() {
        let threads = simulate(&[], 3, 1.0);
        assert_eq!(threads.len(), 3);
        assert!(threads.iter().all(|t| t.available_time == 0.0));
    }

    #[test]
    fn tie_break_prefers_smaller_thread_id() {
        // Two equal-size items, two threads: thread 0 should get the first item.
        let items = vec![item("a", 10), item("b", 10)];
        let threads = simulate(&items, 2, 1.0);
        assert_eq!(threads[0].processed_items[0].key, "a");
        assert_eq!(threads[1].processed_items[0].key, "b");
    }

    #[test]
    fn deterministic_across_repeated_runs() {
        let items = vec![item("a", 9), item("b", 3), item("c", 6), item("d", 1)];
        let first = simulate(&items, 2, 1.0);
        let second = simulate(&items, 2, 1.0);
        assert_eq!(first, second);
    }
}
