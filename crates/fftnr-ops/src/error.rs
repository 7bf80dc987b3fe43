//! Error types for denoising operations.

use thiserror::Error;

/// Error type for denoiser construction and execution.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Buffers or spectra have incompatible sizes.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Filter or feature combination not supported.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// FFT planning or execution failed.
    #[error("transform failed: {0}")]
    Transform(String),

    /// Worker thread could not be spawned.
    #[error("worker thread: {0}")]
    Thread(#[from] std::io::Error),

    /// A worker thread exited while jobs were still outstanding.
    #[error("worker thread {0} stopped unexpectedly")]
    WorkerLost(usize),

    /// Plane or region error.
    #[error(transparent)]
    Core(#[from] fftnr_core::Error),
}

impl OpsError {
    /// Shorthand for [`OpsError::InvalidParameter`].
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Result type for denoising operations.
pub type OpsResult<T> = Result<T, OpsError>;
