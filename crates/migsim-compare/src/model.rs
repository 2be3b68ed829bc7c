/// Per-migration metrics recomputed (when possible) from a run's emitted
/// artifacts. CSV is authoritative; the execution-report JSON is the
/// fallback when the CSV is missing or predates the efficiency columns.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MigrationMetrics {
    pub total_workers: u64,
    pub total_cpus: u64,
    pub cpu_time: f64,
    pub total_data_size_gb: f64,
    pub average_cpu_efficiency_percent: f64,
    pub total_execution_time: f64,
    /// Set when the workers CSV was absent or lacked efficiency columns and
    /// a conservative `execution_time * total_cpus` estimate was used instead.
    pub used_fallback: bool,
}

/// A ratio/difference pair for one metric across two runs, `left -> right`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    pub left: f64,
    pub right: f64,
}

impl Delta {
    pub fn ratio(&self) -> f64 {
        if self.left != 0.0 {
            self.right / self.left
        } else if self.right == 0.0 {
            1.0
        } else {
            f64::INFINITY
        }
    }

    pub fn inverse_ratio(&self) -> f64 {
        let r = self.ratio();
        if r == 0.0 {
            f64::INFINITY
        } else {
            1.0 / r
        }
    }

    pub fn difference(&self) -> f64 {
        self.right - self.left
    }
}

/// A migration present in both compared runs, paired by migration ID.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub migration_id: String,
    pub left: MigrationMetrics,
    pub right: MigrationMetrics,
}

impl ComparisonResult {
    pub fn execution_time(&self) -> Delta {
        Delta {
            left: self.left.total_execution_time,
            right: self.right.total_execution_time,
        }
    }

    pub fn worker_count(&self) -> Delta {
        Delta {
            left: self.left.total_workers as f64,
            right: self.right.total_workers as f64,
        }
    }

    pub fn cpu_count(&self) -> Delta {
        Delta {
            left: self.left.total_cpus as f64,
            right: self.right.total_cpus as f64,
        }
    }

    pub fn cpu_time(&self) -> Delta {
        Delta {
            left: self.left.cpu_time,
            right: self.right.cpu_time,
        }
    }
}

/// The outcome of comparing two run directories: paired migrations plus the
/// IDs that appeared in only one side.
#[derive(Debug, Clone, Default)]
pub struct CompareOutcome {
    pub paired: Vec<ComparisonResult>,
    pub left_only: Vec<String>,
    pub right_only: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_handles_zero_left() {
        let d = Delta { left: 0.0, right: 0.0 };
        assert_eq!(d.ratio(), 1.0);
        let d2 = Delta { left: 0.0, right: 5.0 };
        assert_eq!(d2.ratio(), f64::INFINITY);
    }

    #[test]
    fn difference_is_right_minus_left() {
        let d = Delta { left: 10.0, right: 7.0 };
        assert_eq!(d.difference(), -3.0);
    }
}
