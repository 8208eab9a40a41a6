use super::picture::{DecodedPicture, PictureLedger};
use crate::codec::CodecConfiguration;
use crate::demux::EncodedSample;
use crate::errors::ExtractorResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// A picture tagged with the adapter epoch it was emitted in.
pub(crate) struct StampedPicture {
    pub epoch: u64,
    pub picture: DecodedPicture,
}

/// Output side handed to an engine at configuration time.
///
/// Engines push pictures here whenever they become available, from inside
/// `decode` or `flush`.
#[derive(Clone)]
pub struct FrameSink {
    tx: UnboundedSender<StampedPicture>,
    epoch: Arc<AtomicU64>,
    ledger: PictureLedger,
}

impl FrameSink {
    pub(crate) fn new(
        tx: UnboundedSender<StampedPicture>,
        epoch: Arc<AtomicU64>,
        ledger: PictureLedger,
    ) -> Self {
        Self { tx, epoch, ledger }
    }

    /// Emit a decoded RGB8 picture with presentation timestamp `pts`.
    pub fn emit(&self, pts: i64, width: u32, height: u32, pixels: Vec<u8>) {
        let picture = DecodedPicture::new(&self.ledger, pts, width, height, pixels);
        let stamped = StampedPicture {
            epoch: self.epoch.load(Ordering::SeqCst),
            picture,
        };
        // A closed inbox drops the picture, which releases it.
        let _ = self.tx.send(stamped);
    }
}

/// The opaque decode service behind the adapter.
///
/// Samples arrive in decode order. Pictures leave through the `FrameSink`
/// in whatever order the engine produces them.
#[async_trait(?Send)]
pub trait DecodeEngine {
    fn name(&self) -> &str;

    /// Whether the engine can decode streams with this configuration.
    async fn is_config_supported(&self, config: &CodecConfiguration) -> bool;

    async fn configure(&mut self, config: &CodecConfiguration, sink: FrameSink)
        -> ExtractorResult<()>;

    async fn decode(&mut self, sample: &EncodedSample) -> ExtractorResult<()>;

    /// Emit every picture still held for samples already submitted.
    async fn flush(&mut self) -> ExtractorResult<()>;

    fn close(&mut self);
}
