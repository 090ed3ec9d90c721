//! Raw 8-bit single channel bitmaps

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

/// Grayscale bitmap, one byte per pixel, row-major
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    data: Bytes,
}

impl Image {
    /// Row and column alignment produced by [`BitmapSource`] implementations
    pub const ALIGNMENT: u32 = 4;

    /// Wrap pixel data, checking that it holds exactly `width * height` bytes
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if width == 0 || height == 0 {
            return Err(Error::Validation(format!(
                "image dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::Validation(format!(
                "{}x{} image needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Pad a bitmap on the right and bottom so both dimensions are
    /// multiples of [`Image::ALIGNMENT`]. New pixels are set to `fill`.
    pub fn padded(width: u32, height: u32, data: &[u8], fill: u8) -> Result<Self> {
        let source = Self::new(width, height, Bytes::copy_from_slice(data))?;
        let padded_width = width.div_ceil(Self::ALIGNMENT) * Self::ALIGNMENT;
        let padded_height = height.div_ceil(Self::ALIGNMENT) * Self::ALIGNMENT;
        if padded_width == width && padded_height == height {
            return Ok(source);
        }

        let mut buf = BytesMut::with_capacity(padded_width as usize * padded_height as usize);
        for row in source.data.chunks(width as usize) {
            buf.extend_from_slice(row);
            buf.resize(buf.len() + (padded_width - width) as usize, fill);
        }
        buf.resize(padded_width as usize * padded_height as usize, fill);

        Self::new(padded_width, padded_height, buf.freeze())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Number of pixels (and bytes)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Decodes stored reference images into raw bitmaps.
///
/// Implementations return bitmaps padded to [`Image::ALIGNMENT`].
pub trait BitmapSource {
    fn load(&self, name: &str) -> Result<Image>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_image_new() {
        let image = Image::new(4, 2, vec![0u8; 8]).unwrap();
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 2);
        assert_eq!(image.len(), 8);
    }

    #[test]
    fn test_image_size_mismatch() {
        assert!(Image::new(4, 2, vec![0u8; 7]).is_err());
        assert!(Image::new(0, 2, Vec::<u8>::new()).is_err());
    }

    #[test]
    fn test_image_padded() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let image = Image::padded(3, 2, &data, 0xFF).unwrap();

        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 4);
        assert_eq!(image.pixel(0, 0), Some(1));
        assert_eq!(image.pixel(2, 1), Some(6));
        assert_eq!(image.pixel(3, 0), Some(0xFF));
        assert_eq!(image.pixel(0, 3), Some(0xFF));
        assert_eq!(image.pixel(4, 0), None);
    }

    #[test]
    fn test_image_already_aligned() {
        let image = Image::padded(4, 4, &[7u8; 16], 0).unwrap();
        assert_eq!(image.data().as_ref(), &[7u8; 16]);
    }
}
