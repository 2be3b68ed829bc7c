use std::path::Path;

use migsim_sim::Worker;

use crate::error::{Error, Result};
use crate::format::{fmt1, fmt2};

const HEADERS: [&str; 13] = [
    "Worker_ID",
    "Tier",
    "Start_Time",
    "End_Time",
    "Duration",
    "SSTable_Count",
    "Data_Size_GB",
    "Is_Straggler_Worker",
    "Num_Threads",
    "Total_Used_CPU_Time",
    "Total_Active_CPU_Time",
    "CPU_Inefficiency",
    "CPU_Efficiency_Percent",
];

/// Write `<base>_workers.csv`: one row per worker, in worker-ID order.
pub fn write_workers_csv(path: &Path, workers: &[Worker]) -> Result<()> {
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
        let cpu = worker.cpu_efficiency();
        let data_size_gb = worker.total_sstable_size() as f64 / 1024f64.powi(3);
        let sstable_count: usize = worker.threads.iter().map(|t| t.processed_items.len()).sum();
        wtr.write_record([
            worker.worker_id.to_string(),
            worker.tier.as_str().to_string(),
            fmt2(worker.start_time),
            fmt2(worker.completion_time),
            fmt2(worker.completion_time - worker.start_time),
            sstable_count.to_string(),
            fmt2(data_size_gb),
            worker.is_straggler.to_string(),
            worker.num_threads.to_string(),
            fmt2(cpu.total_used_cpu_time),
            fmt2(cpu.total_active_cpu_time),
            fmt2(cpu.cpu_inefficiency),
            fmt1(cpu.cpu_efficiency_percent),
        ])
        .map_err(|source| Error::Csv {
            path: path.to_path_buf(),
            source,
        })?;
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

    fn worker(subset_id: &str, items: Vec<WorkItem>, num_threads: u32) -> Worker {
        let data_size = items.iter().map(|i| i.size).sum();
        let subset = Subset {
            migration_id: "mig1".into(),
            label: "lbl".into(),
            subset_id: subset_id.into(),
            tier: Tier::Small,
            num_sstables: items.len() as u64,
            data_size,
            path: PathBuf::new(),
            items,
        };
        Worker::new(subset, Tier::Small, num_threads, 0.0).unwrap()
    }

    #[test]
    fn writes_header_and_rows_in_worker_id_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out_workers.csv");
        let w2 = worker("2", vec![WorkItem::new("a", 10)], 1);
        let w1 = worker("1", vec![WorkItem::new("a", 5)], 1);
        write_workers_csv(&path, &[w2, w1]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("Worker_ID,Tier"));
        assert!(lines.next().unwrap().starts_with("1,SMALL"));
        assert!(lines.next().unwrap().starts_with("2,SMALL"));
    }
}
