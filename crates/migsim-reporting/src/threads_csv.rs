use std::path::Path;

use migsim_sim::Worker;

use crate::error::{Error, Result};
use crate::format::fmt2;

const HEADERS: [&str; 8] = [
    "Worker_ID",
    "Tier",
    "Thread_ID",
    "Task_Name",
    "Start_Time",
    "End_Time",
    "Task_Size",
    "Is_Straggler_Thread",
];

/// Write `<base>_threads.csv`: one row per processed item, grouped by worker
/// (worker-ID order) then by thread, preserving each thread's task order.
pub fn write_threads_csv(path: &Path, workers: &[Worker]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let mut wtr = csv::Writer::from_writer(file);
    wtr.write_record(HEADERS).map_err(|source| Error::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    let mut ordered: Vec<&Worker> = workers.iter().collect();
    ordered.sort_by_key(|w| w.worker_id);

    for worker in ordered {
        for thread in &worker.threads {
            let is_straggler_thread = worker.straggler_thread_ids.contains(&thread.thread_id);
            for (item, start) in thread.processed_items.iter().zip(thread.task_start_times.iter()) {
                let abs_start = worker.start_time + start;
                let abs_end = abs_start + item.size as f64;
                wtr.write_record([
                    worker.worker_id.to_string(),
                    worker.tier.as_str().to_string(),
                    thread.thread_id.to_string(),
                    item.key.clone(),
                    fmt2(abs_start),
                    fmt2(abs_end),
                    fmt2(item.size as f64),
                    is_straggler_thread.to_string(),
                ])
                .map_err(|source| Error::Csv {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }
    }

    wtr.flush().map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use migsim_core::{Subset, Tier, WorkItem};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn one_row_per_processed_item() {
        let items = vec![WorkItem::new("a", 10), WorkItem::new("b", 5)];
        let subset = Subset {
            migration_id: "mig1".into(),
            label: "lbl".into(),
            subset_id: "1".into(),
            tier: Tier::Small,
            num_sstables: 2,
            data_size: 15,
            path: PathBuf::new(),
            items,
        };
        let worker = Worker::new(subset, Tier::Small, 1, 100.0).unwrap();

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out_threads.csv");
        write_threads_csv(&path, &[worker]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3); // header + 2 items
        assert!(content.contains("100.00,110.00")); // first item starts at worker start_time
    }
}
