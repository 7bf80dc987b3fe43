//! 16-bit sample companding and the luma/chroma matrix.
//!
//! Samples are filtered in a square-root domain, where photon noise is
//! roughly uniform across brightness:
//!
//! ```text
//! unpack: p = sqrt(v)                      v in 0..=65535
//! pack:   v = min(round(max(p, 0)^2), 65535)
//! ```
//!
//! The luma/chroma matrix is BT.601 on companded values, with red and blue
//! scaled by white-balance corrections before the forward matrix and
//! unscaled after the inverse matrix.

/// RGB to Y/Cb/Cr (BT.601).
pub const RGB_TO_YUV: [[f32; 3]; 3] = [
    [0.299, 0.587, 0.114],
    [-0.168736, -0.331264, 0.5],
    [0.5, -0.418688, -0.081312],
];

/// Y/Cb/Cr to RGB (BT.601).
pub const YUV_TO_RGB: [[f32; 3]; 3] = [
    [1.0, 0.0, 1.402],
    [1.0, -0.344136, -0.714136],
    [1.0, 1.772, 0.0],
];

/// Immutable lookup tables for one denoising session.
pub struct ConversionContext {
    to_float: Vec<f32>,
}

impl ConversionContext {
    /// Builds the 65536-entry companding table.
    pub fn new() -> Self {
        let to_float = (0..=u16::MAX).map(|v| (v as f32).sqrt()).collect();
        Self { to_float }
    }

    /// Companded value of a 16-bit sample.
    #[inline]
    pub fn to_float(&self, v: u16) -> f32 {
        self.to_float[v as usize]
    }

    /// 16-bit sample for a companded value, rounded and saturated.
    #[inline]
    pub fn to_u16(&self, p: f32) -> u16 {
        let p = p.max(0.0);
        (p * p + 0.5).min(65535.0) as u16
    }

    /// Applies the white-balance corrections and the forward matrix.
    #[inline]
    pub fn rgb_to_yuv(&self, rgb: [f32; 3], red: f32, blue: f32) -> [f32; 3] {
        apply_matrix(&RGB_TO_YUV, [rgb[0] * red, rgb[1], rgb[2] * blue])
    }

    /// Applies the inverse matrix and removes the white-balance corrections.
    #[inline]
    pub fn yuv_to_rgb(&self, yuv: [f32; 3], red: f32, blue: f32) -> [f32; 3] {
        let [r, g, b] = apply_matrix(&YUV_TO_RGB, yuv);
        [r / red, g, b / blue]
    }
}

#[inline]
fn apply_matrix(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    m.map(|row| row[0] * v[0] + row[1] * v[1] + row[2] * v[2])
}

impl Default for ConversionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConversionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionContext")
            .field("entries", &self.to_float.len())
            .finish()
    }
}
