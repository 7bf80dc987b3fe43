//! # fftnr-core
//!
//! Core types for block-based frequency-domain noise reduction.
//!
//! - [`BlockBuffer`] - Padded `f32` plane with vector-aligned rows
//! - [`PlaneView`], [`PlaneViewMut`] - Borrowed windows into a plane
//! - [`Rect`] - Block and interior rectangles
//! - [`Error`] - Plane and pixel buffer errors
//!
//! ## Crate Structure
//!
//! ```text
//! fftnr-core (this crate)
//!    ^
//!    |
//!    +-- fftnr-math (kernels, SIMD dispatch)
//!    +-- fftnr-ops (transforms, filters, workers, denoiser)
//!    +-- fftnr-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod plane;
pub mod rect;

pub use error::*;
pub use plane::*;
pub use rect::*;

/// Prelude module for convenient imports.
///
/// ```
/// use fftnr_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::plane::{BlockBuffer, PlaneView, PlaneViewMut, VECTOR_LANES};
    pub use crate::rect::Rect;
}
