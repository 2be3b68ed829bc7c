//! Re-reads two simulation runs' emitted artifacts and pairs migrations by
//! ID. Tolerant of CSV schema evolution: unknown columns are ignored,
//! missing efficiency columns yield a zeroed, flagged fallback, never a crash.

mod error;
mod loader;
mod model;

pub use error::{Error, Result};
pub use loader::compare_runs;
pub use model::{CompareOutcome, ComparisonResult, Delta, MigrationMetrics};
