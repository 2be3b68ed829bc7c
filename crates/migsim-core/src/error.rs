use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating, validating, or parsing subset descriptors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("input directory does not exist: {0}")]
    NotFound(PathBuf),

    #[error("input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("permission denied accessing directory: {0}")]
    Permission(PathBuf),

    #[error(
        "invalid migration directory structure at {0}: missing 'metadata/subsets' subdirectory"
    )]
    Structure(PathBuf),

    #[error("invalid subset path {path}: {reason}")]
    PathFormat { path: PathBuf, reason: String },

    #[error("failed to read subset file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed line in subset file {path}: {line:?}")]
    LineParse { path: PathBuf, line: String },

    #[error("walkdir error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
