use thiserror::Error;

/// Reasons a monitoring cycle is aborted before touching the registry
#[derive(Error, Debug)]
pub enum CycleError {
    /// The chain reported no usable current era
    #[error("current era unavailable")]
    EraUnavailable,

    /// Active set or era could not be queried
    #[error("chain query failed: {0}")]
    ChainUnavailable(#[from] anyhow::Error),
}

pub type CycleResult<T> = std::result::Result<T, CycleError>;
