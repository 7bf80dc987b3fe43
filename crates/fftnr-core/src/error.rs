//! Error types for fftnr-core operations.
//!
//! Dimension and pixel buffer checks report through a single [`Error`]
//! enum. Out-of-bounds slicing is *not* reported here: a slice outside its
//! parent plane is a caller bug and panics (see [`crate::plane::BlockBuffer::slice`]).
//!
//! # Usage
//!
//! ```rust
//! use fftnr_core::{Error, Result};
//!
//! fn check_block(width: usize, height: usize) -> Result<()> {
//!     if width == 0 || height == 0 {
//!         return Err(Error::invalid_dimensions(width, height, "empty block"));
//!     }
//!     Ok(())
//! }
//! assert!(check_block(0, 8).is_err());
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building planes and pixel views.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid plane dimensions.
    ///
    /// Returned when width or height is zero, or dimensions would overflow
    /// the buffer size calculation.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Buffer holds fewer samples than its declared geometry needs.
    #[error("buffer too small: need {expected} samples, got {got}")]
    BufferTooSmall {
        /// Samples required
        expected: usize,
        /// Samples provided
        got: usize,
    },

    /// Stride is too small for the given width.
    #[error("stride {stride} is less than minimum {min_stride} for width {width}")]
    InvalidStride {
        /// Provided stride
        stride: usize,
        /// Minimum required stride
        min_stride: usize,
        /// Row width
        width: usize,
    },
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::BufferTooSmall`] error.
    #[inline]
    pub fn buffer_too_small(expected: usize, got: usize) -> Self {
        Self::BufferTooSmall { expected, got }
    }
}
