//! Matching engine interface and the reference grid matcher
//!
//! The driver never inspects matching payloads; it hands captured bitmaps
//! to a [`MatchEngine`] and stores whatever payload comes back in the print.

use bytes::BytesMut;
use tracing::trace;
use vfprint_core::RetryCode;
use vfprint_types::{Image, MatchPayload};

/// Rejections from a [`MatchEngine`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// The bitmap is unusable; capture again
    #[error("Capture rejected: {0}")]
    Retry(RetryCode),

    /// Stored matching data is not understood
    #[error("Invalid matching data: {0}")]
    Invalid(String),

    #[error("Matching failed: {0}")]
    Failed(String),
}

/// Feature extraction and comparison
///
/// Thresholds for accepting or rejecting a match are entirely up to the
/// implementation.
#[cfg_attr(test, mockall::automock)]
pub trait MatchEngine: Send + Sync {
    /// Fold one more enrollment capture into `prior`, or start a new
    /// payload when `prior` is `None`
    fn enroll_accumulate(
        &self,
        prior: Option<MatchPayload>,
        image: &Image,
    ) -> Result<MatchPayload, MatchError>;

    /// Compare a capture against an enrolled payload
    fn verify(&self, payload: &MatchPayload, image: &Image) -> Result<bool, MatchError>;

    /// Index of the first payload matching the capture
    fn identify(
        &self,
        payloads: &[MatchPayload],
        image: &Image,
    ) -> Result<Option<usize>, MatchError>;
}

/// Reference matcher comparing coarse brightness grids
///
/// A bitmap is reduced to an 8x8 grid of cell means (its signature). An
/// enrolled payload is a sequence of distinct signatures; a capture
/// matches when its signature is close to any of them.
#[derive(Debug, Clone)]
pub struct GridMatcher {
    /// Largest mean absolute cell difference accepted as a match
    threshold: u32,

    /// Smallest spread of cell means accepted as a finger
    min_contrast: u8,
}

impl GridMatcher {
    pub const GRID: usize = 8;
    pub const SIGNATURE_LEN: usize = Self::GRID * Self::GRID;

    pub const DEFAULT_THRESHOLD: u32 = 12;
    pub const DEFAULT_MIN_CONTRAST: u8 = 16;

    pub fn new() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            min_contrast: Self::DEFAULT_MIN_CONTRAST,
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_contrast(mut self, min_contrast: u8) -> Self {
        self.min_contrast = min_contrast;
        self
    }

    /// Reduce a bitmap to its grid signature
    ///
    /// # Errors
    ///
    /// - [`RetryCode::TooShort`] if the bitmap is smaller than the grid
    /// - [`RetryCode::CenterFinger`] if the bitmap has no contrast
    pub fn signature(&self, image: &Image) -> Result<[u8; Self::SIGNATURE_LEN], MatchError> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if width < Self::GRID || height < Self::GRID {
            return Err(MatchError::Retry(RetryCode::TooShort));
        }

        let cell_w = width / Self::GRID;
        let cell_h = height / Self::GRID;
        let data = image.data();
        let mut signature = [0u8; Self::SIGNATURE_LEN];

        for (cell, slot) in signature.iter_mut().enumerate() {
            let (cx, cy) = (cell % Self::GRID, cell / Self::GRID);
            let mut sum = 0u64;
            for y in cy * cell_h..(cy + 1) * cell_h {
                let row = &data[y * width + cx * cell_w..y * width + (cx + 1) * cell_w];
                sum += row.iter().map(|&p| u64::from(p)).sum::<u64>();
            }
            *slot = (sum / (cell_w * cell_h) as u64) as u8;
        }

        let min = signature.iter().copied().min().unwrap_or(0);
        let max = signature.iter().copied().max().unwrap_or(0);
        if max - min < self.min_contrast {
            return Err(MatchError::Retry(RetryCode::CenterFinger));
        }

        Ok(signature)
    }

    /// Mean absolute difference between two signatures
    pub fn distance(a: &[u8], b: &[u8]) -> u32 {
        let total: u32 = a
            .iter()
            .zip(b)
            .map(|(&x, &y)| u32::from(x.abs_diff(y)))
            .sum();
        total / Self::SIGNATURE_LEN as u32
    }

    fn signatures(payload: &MatchPayload) -> Result<std::slice::ChunksExact<'_, u8>, MatchError> {
        if payload.is_empty() || payload.len() % Self::SIGNATURE_LEN != 0 {
            return Err(MatchError::Invalid(format!(
                "payload of {} bytes is not a whole number of signatures",
                payload.len()
            )));
        }
        Ok(payload.as_bytes().chunks_exact(Self::SIGNATURE_LEN))
    }

    fn matches(&self, payload: &MatchPayload, signature: &[u8]) -> Result<bool, MatchError> {
        let best = Self::signatures(payload)?
            .map(|stored| Self::distance(stored, signature))
            .min()
            .unwrap_or(u32::MAX);
        trace!("Best grid distance {} (threshold {})", best, self.threshold);
        Ok(best <= self.threshold)
    }
}

impl Default for GridMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchEngine for GridMatcher {
    fn enroll_accumulate(
        &self,
        prior: Option<MatchPayload>,
        image: &Image,
    ) -> Result<MatchPayload, MatchError> {
        let signature = self.signature(image)?;

        let mut buf = BytesMut::new();
        if let Some(prior) = prior {
            let duplicate = Self::signatures(&prior)?.any(|stored| stored == signature.as_slice());
            if duplicate {
                return Ok(prior);
            }
            buf.extend_from_slice(prior.as_bytes());
        }
        buf.extend_from_slice(&signature);

        Ok(MatchPayload::new(buf.freeze()))
    }

    fn verify(&self, payload: &MatchPayload, image: &Image) -> Result<bool, MatchError> {
        let signature = self.signature(image)?;
        self.matches(payload, &signature)
    }

    fn identify(
        &self,
        payloads: &[MatchPayload],
        image: &Image,
    ) -> Result<Option<usize>, MatchError> {
        let signature = self.signature(image)?;
        for (index, payload) in payloads.iter().enumerate() {
            if self.matches(payload, &signature)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}
