pub mod config;
pub mod error;
pub mod model;
pub mod reader;

pub use config::{ExecutionMode, SimConfig, TierConfig, WorkerConfig};
pub use error::{Error, Result};
pub use model::{sort_subsets, Subset, Tier, WorkItem};
pub use reader::{read_subsets, SubsetWarning};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
