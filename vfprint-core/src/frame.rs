//! Virtual device frame structure and header classification

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use vfprint_types::Image;

use crate::{
    codes::{DeviceErrorCode, RetryCode},
    constants::{sentinels, HEADER_SIZE, MAX_IMAGE_PIXELS},
    error::{Error, Result},
};

/// Frame exchanged between the simulated hardware and the driver
///
/// # Frame Structure
///
/// ```text
/// ┌─────────────┬─────────────┬──────────────────────────────┐
/// │      a      │      b      │   Payload (images only)      │
/// │   4 bytes   │   4 bytes   │   a * b bytes                │
/// │ (NE i32)    │  (NE i32)   │   8-bit grayscale, row-major │
/// └─────────────┴─────────────┴──────────────────────────────┘
/// ```
///
/// Both header integers use the platform's native byte order. A positive
/// pair is an image; a negative first integer selects a control frame.
///
/// # Examples
///
/// ```
/// use vfprint_core::{RetryCode, VirtualFrame};
///
/// let frame = VirtualFrame::Retry(RetryCode::TooShort);
/// assert_eq!(frame.header(), (-1, 1));
/// assert_eq!(frame.encode().len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualFrame {
    /// A captured bitmap
    Image(Image),

    /// Capture must be repeated
    Retry(RetryCode),

    /// Current operation failed
    Error(DeviceErrorCode),

    /// Enable or disable implicit finger reporting around images
    FingerAutomatic(bool),

    /// Finger placed (true) or lifted (false)
    FingerReport(bool),
}

impl VirtualFrame {
    /// The two header integers for this frame
    pub fn header(&self) -> (i32, i32) {
        match self {
            // Image dimensions are bounded by MAX_IMAGE_PIXELS on receipt;
            // locally built images saturate rather than wrap.
            Self::Image(image) => (
                i32::try_from(image.width()).unwrap_or(i32::MAX),
                i32::try_from(image.height()).unwrap_or(i32::MAX),
            ),
            Self::Retry(code) => (sentinels::RETRY, (*code).into()),
            Self::Error(code) => (sentinels::ERROR, (*code).into()),
            Self::FingerAutomatic(enabled) => (sentinels::FINGER_AUTOMATIC, i32::from(*enabled)),
            Self::FingerReport(present) => (sentinels::FINGER_REPORT, i32::from(*present)),
        }
    }

    /// Payload bytes following the header
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Image(image) => image.len(),
            _ => 0,
        }
    }

    /// Total encoded size
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload_len()
    }

    /// Append the encoded frame to `buf`
    pub fn encode_into(&self, buf: &mut BytesMut) {
        let (first, second) = self.header();
        buf.reserve(self.size());
        buf.put_i32_ne(first);
        buf.put_i32_ne(second);
        if let Self::Image(image) = self {
            buf.put_slice(image.data());
        }
    }

    /// Encode frame to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        self.encode_into(&mut buf);
        buf
    }
}

impl From<Image> for VirtualFrame {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}

impl fmt::Display for VirtualFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(image) => write!(f, "Image[{}x{}]", image.width(), image.height()),
            Self::Retry(code) => write!(f, "Retry[{}]", code),
            Self::Error(code) => write!(f, "Error[{}]", code),
            Self::FingerAutomatic(enabled) => write!(f, "FingerAutomatic[{}]", enabled),
            Self::FingerReport(present) => write!(f, "FingerReport[{}]", present),
        }
    }
}

/// A classified frame header, before any payload has been read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameHeader {
    Image { width: u32, height: u32 },
    Retry(RetryCode),
    Error(DeviceErrorCode),
    FingerAutomatic(bool),
    FingerReport(bool),
}

impl FrameHeader {
    /// Classify a header pair with the default image size limit
    pub fn classify(first: i32, second: i32) -> Result<Self> {
        Self::classify_with_limit(first, second, MAX_IMAGE_PIXELS)
    }

    /// Classify a header pair
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] when:
    /// - exactly one integer is positive, or either is zero for an image
    /// - the image would exceed `max_pixels`
    /// - the sentinel is unknown
    /// - a retry or error code is unknown
    /// - a toggle or report flag is not 0 or 1
    pub fn classify_with_limit(first: i32, second: i32, max_pixels: usize) -> Result<Self> {
        let malformed = || Error::Malformed { first, second };

        if first > 0 && second > 0 {
            let (width, height) = (first as u32, second as u32);
            let pixels = (width as usize)
                .checked_mul(height as usize)
                .ok_or_else(malformed)?;
            if pixels > max_pixels {
                return Err(malformed());
            }
            return Ok(Self::Image { width, height });
        }

        let flag = || match second {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(malformed()),
        };

        match first {
            sentinels::RETRY => RetryCode::try_from(second)
                .map(Self::Retry)
                .map_err(|_| malformed()),
            sentinels::ERROR => DeviceErrorCode::try_from(second)
                .map(Self::Error)
                .map_err(|_| malformed()),
            sentinels::FINGER_AUTOMATIC => flag().map(Self::FingerAutomatic),
            sentinels::FINGER_REPORT => flag().map(Self::FingerReport),
            _ => Err(malformed()),
        }
    }

    /// Payload bytes that must follow this header
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Image { width, height } => *width as usize * *height as usize,
            _ => 0,
        }
    }

    /// Build the frame once its payload has been received
    pub fn into_frame(self, payload: Bytes) -> Result<VirtualFrame> {
        Ok(match self {
            Self::Image { width, height } => {
                VirtualFrame::Image(Image::new(width, height, payload)?)
            }
            Self::Retry(code) => VirtualFrame::Retry(code),
            Self::Error(code) => VirtualFrame::Error(code),
            Self::FingerAutomatic(enabled) => VirtualFrame::FingerAutomatic(enabled),
            Self::FingerReport(present) => VirtualFrame::FingerReport(present),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_control_headers() {
        assert_eq!(
            FrameHeader::classify(-1, 1).unwrap(),
            FrameHeader::Retry(RetryCode::TooShort)
        );
        assert_eq!(
            FrameHeader::classify(-2, 0).unwrap(),
            FrameHeader::Error(DeviceErrorCode::General)
        );
        assert_eq!(
            FrameHeader::classify(-3, 0).unwrap(),
            FrameHeader::FingerAutomatic(false)
        );
        assert_eq!(
            FrameHeader::classify(-4, 1).unwrap(),
            FrameHeader::FingerReport(true)
        );
    }

    #[test]
    fn test_image_header() {
        let header = FrameHeader::classify(12, 8).unwrap();
        assert_eq!(header, FrameHeader::Image { width: 12, height: 8 });
        assert_eq!(header.payload_len(), 96);
    }

    #[test]
    fn test_malformed_headers() {
        let headers = [
            (5, -1),
            (0, 0),
            (0, 4),
            (4, 0),
            (-5, 0),
            (-1, 99),
            (-2, -1),
            (-3, 2),
            (-4, -1),
        ];
        for (first, second) in headers {
            assert!(
                matches!(
                    FrameHeader::classify(first, second),
                    Err(Error::Malformed { first: f, second: s }) if f == first && s == second
                ),
                "({}, {}) should be malformed",
                first,
                second
            );
        }
    }

    #[test]
    fn test_image_limit() {
        assert!(FrameHeader::classify_with_limit(10, 10, 100).is_ok());
        assert!(FrameHeader::classify_with_limit(10, 11, 100).is_err());
        assert!(FrameHeader::classify(i32::MAX, i32::MAX).is_err());
    }

    #[test]
    fn test_encode_layout() {
        let image = Image::new(2, 2, vec![1, 2, 3, 4]).unwrap();
        let encoded = VirtualFrame::Image(image).encode();

        let mut expected = Vec::new();
        expected.extend_from_slice(&2i32.to_ne_bytes());
        expected.extend_from_slice(&2i32.to_ne_bytes());
        expected.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(encoded.as_ref(), expected.as_slice());
    }

    #[test]
    fn test_encode_control() {
        let encoded = VirtualFrame::FingerReport(true).encode();
        assert_eq!(&encoded[..4], &(-4i32).to_ne_bytes());
        assert_eq!(&encoded[4..], &1i32.to_ne_bytes());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            VirtualFrame::Error(DeviceErrorCode::Busy).to_string(),
            "Error[ERROR_BUSY(4)]"
        );
    }

    proptest! {
        #[test]
        fn prop_mixed_sign_is_malformed(a in 1i32.., b in i32::MIN..0) {
            prop_assert!(FrameHeader::classify(a, b).is_err());
        }

        #[test]
        fn prop_unknown_sentinel_is_malformed(a in i32::MIN..-4, b in any::<i32>()) {
            prop_assert!(FrameHeader::classify(a, b).is_err());
        }

        #[test]
        fn prop_small_images_accepted(w in 1i32..=512, h in 1i32..=512) {
            let header = FrameHeader::classify(w, h).unwrap();
            prop_assert_eq!(header.payload_len(), (w * h) as usize);
        }
    }
}
