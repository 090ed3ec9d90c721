//! Tokio codec for virtual device frames
//!
//! `FrameCodec` reassembles frames from a byte stream. A frame is only
//! produced once its header and full payload are buffered.
//!
//! A malformed header is consumed before the error is returned, so the
//! next call starts at the following frame boundary. An image header over
//! the size limit still announces its payload, and those bytes are skipped
//! as they arrive. Callers that keep reading after an error (the driver
//! does) therefore see later frames intact.

use byteorder::{ByteOrder, NativeEndian};
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    constants::{HEADER_SIZE, MAX_IMAGE_PIXELS},
    error::{Error, Result},
    frame::{FrameHeader, VirtualFrame},
};

/// Codec for [`VirtualFrame`]s
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Images above this many pixels are rejected as malformed
    max_image_pixels: usize,

    /// Payload bytes of a rejected image still to be dropped
    discard: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_image_pixels(MAX_IMAGE_PIXELS)
    }

    /// Create a codec with a custom image size limit
    pub fn with_max_image_pixels(max_image_pixels: usize) -> Self {
        Self {
            max_image_pixels,
            discard: 0,
        }
    }

    pub fn max_image_pixels(&self) -> usize {
        self.max_image_pixels
    }

    /// Peek the header integers without consuming them
    fn peek_header(src: &BytesMut) -> (i32, i32) {
        (
            NativeEndian::read_i32(&src[0..4]),
            NativeEndian::read_i32(&src[4..HEADER_SIZE]),
        )
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = VirtualFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if self.discard > 0 {
            let n = self.discard.min(src.len());
            src.advance(n);
            self.discard -= n;
            if self.discard > 0 {
                return Ok(None);
            }
        }

        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let (first, second) = Self::peek_header(src);
        let header = match FrameHeader::classify_with_limit(first, second, self.max_image_pixels) {
            Ok(header) => header,
            Err(e) => {
                src.advance(HEADER_SIZE);
                if first > 0 && second > 0 {
                    self.discard = (first as usize).saturating_mul(second as usize);
                }
                return Err(e);
            }
        };

        let total = HEADER_SIZE + header.payload_len();
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(header.payload_len()).freeze();
        header.into_frame(payload).map(Some)
    }
}

impl Encoder<VirtualFrame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, frame: VirtualFrame, dst: &mut BytesMut) -> Result<()> {
        frame.encode_into(dst);
        Ok(())
    }
}
