use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid worker ID format: {0:?}, expected a non-negative integer subset ID")]
    InvalidWorkerId(String),

    #[error("simulation error: {0}")]
    Simulation(String),

    #[error(transparent)]
    Core(#[from] migsim_core::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
