use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-tier thread count and concurrency cap, validated eagerly on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub num_threads: u32,
    pub max_workers: u32,
}

impl TierConfig {
    pub fn new(num_threads: u32, max_workers: u32) -> Result<Self> {
        if num_threads == 0 {
            return Err(Error::Other(anyhow::anyhow!(
                "num_threads must be positive, got {num_threads}"
            )));
        }
        if max_workers == 0 {
            return Err(Error::Other(anyhow::anyhow!(
                "max_workers must be positive, got {max_workers}"
            )));
        }
        Ok(Self {
            num_threads,
            max_workers,
        })
    }
}

/// Tier configuration for all three scheduled tiers. `Universal` subsets
/// (the "simple" degenerate case) reuse `small`, per the design notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub small: TierConfig,
    pub medium: TierConfig,
    pub large: TierConfig,
}

impl WorkerConfig {
    pub fn for_tier(&self, tier: crate::model::Tier) -> TierConfig {
        use crate::model::Tier;
        match tier.config_tier() {
            Tier::Small => self.small,
            Tier::Medium => self.medium,
            Tier::Large => self.large,
            Tier::Universal => unreachable!("config_tier never returns Universal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Concurrent,
    Sequential,
    RoundRobin,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Concurrent => "concurrent",
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::RoundRobin => "round_robin",
        }
    }
}

/// Top-level simulation configuration. `global_max_workers` is required
/// (and only meaningful) when `mode == ExecutionMode::RoundRobin`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimConfig {
    pub worker_config: WorkerConfig,
    pub straggler_threshold_pct: f64,
    pub mode: ExecutionMode,
    pub global_max_workers: Option<u32>,
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mode == ExecutionMode::RoundRobin {
            match self.global_max_workers {
                Some(n) if n > 0 => {}
                Some(_) => {
                    return Err(Error::Other(anyhow::anyhow!(
                        "max_concurrent_workers must be positive for round_robin mode"
                    )))
                }
                None => {
                    return Err(Error::Other(anyhow::anyhow!(
                        "max_concurrent_workers is required for round_robin mode"
                    )))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_config_rejects_non_positive_fields() {
        assert!(TierConfig::new(0, 4).is_err());
        assert!(TierConfig::new(4, 0).is_err());
        assert!(TierConfig::new(4, 4).is_ok());
    }

    #[test]
    fn sim_config_requires_global_cap_for_round_robin() {
        let worker_config = WorkerConfig {
            small: TierConfig::new(6, 4).unwrap(),
            medium: TierConfig::new(4, 6).unwrap(),
            large: TierConfig::new(1, 10).unwrap(),
        };
        let cfg = SimConfig {
            worker_config,
            straggler_threshold_pct: 20.0,
            mode: ExecutionMode::RoundRobin,
            global_max_workers: None,
        };
        assert!(cfg.validate().is_err());

        let cfg_ok = SimConfig {
            global_max_workers: Some(4),
            ..cfg
        };
        assert!(cfg_ok.validate().is_ok());
    }
}
