//! Decoded pictures and the ledger that accounts for their release.

use image::RgbImage;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct LedgerCounts {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Counts every picture handed out and every picture released.
///
/// Cloning shares the counters.
#[derive(Debug, Clone, Default)]
pub struct PictureLedger {
    counts: Arc<LedgerCounts>,
}

impl PictureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> u64 {
        self.counts.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.counts.released.load(Ordering::SeqCst)
    }

    /// Pictures currently alive.
    pub fn outstanding(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }

    fn acquire(&self) -> Lease {
        self.counts.acquired.fetch_add(1, Ordering::SeqCst);
        Lease {
            counts: self.counts.clone(),
        }
    }
}

/// Scoped claim on a picture's resources; released exactly once on drop.
struct Lease {
    counts: Arc<LedgerCounts>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.counts.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// A decoded picture in RGB8.
///
/// Pictures move between owners and are never cloned. Dropping one releases
/// it; `release` makes the hand-off explicit.
pub struct DecodedPicture {
    /// Presentation timestamp in track timescale ticks.
    pub pts: i64,
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
    _lease: Lease,
}

impl DecodedPicture {
    /// Wrap decoder output, registering it in `ledger`.
    pub fn new(ledger: &PictureLedger, pts: i64, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            pts,
            width,
            height,
            pixels,
            _lease: ledger.acquire(),
        }
    }

    /// Packed RGB8 pixel data, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Copy the pixels into an image buffer.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Release the picture's resources.
    pub fn release(self) {
        drop(self);
    }
}

impl fmt::Debug for DecodedPicture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedPicture")
            .field("pts", &self.pts)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
