//! Borrowed interleaved 16-bit pixel buffers.

use fftnr_core::Error;

use crate::OpsResult;

/// A caller-owned interleaved `u16` image, denoised in place.
///
/// Sample `c` of pixel `(x, y)` lives at `y * row_stride + x * pixel_stride + c`.
/// Strides are in samples, not bytes.
///
/// # Example
///
/// ```rust
/// use fftnr_ops::InterleavedImage;
///
/// let mut pixels = vec![0u16; 64 * 48 * 3];
/// let image = InterleavedImage::new(&mut pixels, 64, 48, 3).unwrap();
/// assert_eq!(image.row_stride(), 192);
/// ```
#[derive(Debug)]
pub struct InterleavedImage<'a> {
    pixels: &'a mut [u16],
    width: usize,
    height: usize,
    channels: usize,
    pixel_stride: usize,
    row_stride: usize,
    filters: u32,
}

impl<'a> InterleavedImage<'a> {
    /// Wraps tightly packed pixels.
    pub fn new(pixels: &'a mut [u16], width: usize, height: usize, channels: usize) -> OpsResult<Self> {
        Self::with_strides(pixels, width, height, channels, channels, width * channels)
    }

    /// Wraps pixels with explicit strides.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero, a stride is too small, or the
    /// buffer is shorter than the geometry needs.
    pub fn with_strides(
        pixels: &'a mut [u16],
        width: usize,
        height: usize,
        channels: usize,
        pixel_stride: usize,
        row_stride: usize,
    ) -> OpsResult<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(Error::invalid_dimensions(width, height, format!("{channels} channels")).into());
        }
        if pixel_stride < channels {
            return Err(Error::InvalidStride {
                stride: pixel_stride,
                min_stride: channels,
                width,
            }
            .into());
        }
        let min_row = width * pixel_stride;
        if row_stride < min_row {
            return Err(Error::InvalidStride {
                stride: row_stride,
                min_stride: min_row,
                width,
            }
            .into());
        }
        let needed = (height - 1) * row_stride + (width - 1) * pixel_stride + channels;
        if pixels.len() < needed {
            return Err(Error::buffer_too_small(needed, pixels.len()).into());
        }

        Ok(Self {
            pixels,
            width,
            height,
            channels,
            pixel_stride,
            row_stride,
            filters: 0,
        })
    }

    /// Sets the color filter array pattern. Non-zero means undemosaiced data.
    pub fn with_filters(mut self, filters: u32) -> Self {
        self.filters = filters;
        self
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Samples per pixel that carry data.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples between consecutive pixels.
    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    /// Samples between consecutive rows.
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Color filter array pattern, zero for demosaiced data.
    pub fn filters(&self) -> u32 {
        self.filters
    }

    /// Raw samples.
    pub fn pixels(&self) -> &[u16] {
        &*self.pixels
    }

    /// Mutable raw samples.
    pub fn pixels_mut(&mut self) -> &mut [u16] {
        &mut *self.pixels
    }

    /// Samples of row `y`, at most `width * pixel_stride` long.
    ///
    /// The last row may stop right after its final pixel's channels.
    pub fn row(&self, y: usize) -> &[u16] {
        let start = y * self.row_stride;
        let end = (start + self.width * self.pixel_stride).min(self.pixels.len());
        &self.pixels[start..end]
    }

    /// Samples of pixel `(x, y)`, `channels` long.
    pub fn pixel(&self, x: usize, y: usize) -> &[u16] {
        let start = y * self.row_stride + x * self.pixel_stride;
        &self.pixels[start..start + self.channels]
    }

    /// Mutable samples of pixel `(x, y)`.
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [u16] {
        let start = y * self.row_stride + x * self.pixel_stride;
        &mut self.pixels[start..start + self.channels]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_checks() {
        let mut buf = vec![0u16; 10 * 4 * 4];
        assert!(InterleavedImage::new(&mut buf, 10, 4, 4).is_ok());
        assert!(InterleavedImage::new(&mut buf, 10, 5, 4).is_err());
        assert!(InterleavedImage::with_strides(&mut buf, 10, 4, 3, 2, 40).is_err());
        assert!(InterleavedImage::with_strides(&mut buf, 10, 4, 3, 4, 39).is_err());
        assert!(InterleavedImage::new(&mut buf, 0, 4, 3).is_err());
    }

    #[test]
    fn test_padded_rows() {
        // 3 pixels of stride 4 in rows of 16 samples; last row may be short
        let mut buf = vec![0u16; 16 + 12];
        let mut image = InterleavedImage::with_strides(&mut buf, 3, 2, 3, 4, 16).unwrap();
        image.pixel_mut(2, 1).copy_from_slice(&[1, 2, 3]);
        assert_eq!(image.pixel(2, 1), &[1, 2, 3]);
        assert_eq!(image.pixels()[16 + 8], 1);
        assert_eq!(image.row(1).len(), 12);
    }
}
