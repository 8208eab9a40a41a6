use super::engine::{DecodeEngine, FrameSink, StampedPicture};
use super::picture::{DecodedPicture, PictureLedger};
use crate::codec::CodecConfiguration;
use crate::demux::EncodedSample;
use crate::errors::{ExtractorError, ExtractorResult};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdapterState {
    Unconfigured,
    Configured,
    Closed,
}

/// Owns the decode engine and the inbox its pictures land in.
pub struct DecoderAdapter {
    engine: Box<dyn DecodeEngine>,
    state: AdapterState,
    tx: UnboundedSender<StampedPicture>,
    inbox: UnboundedReceiver<StampedPicture>,
    epoch: Arc<AtomicU64>,
    ledger: PictureLedger,
    submitted: u64,
}

fn as_fault(err: ExtractorError) -> ExtractorError {
    match err {
        ExtractorError::DecoderFault(_) => err,
        other => ExtractorError::DecoderFault(other.to_string()),
    }
}

impl DecoderAdapter {
    pub fn new(engine: Box<dyn DecodeEngine>, ledger: PictureLedger) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        Self {
            engine,
            state: AdapterState::Unconfigured,
            tx,
            inbox,
            epoch: Arc::new(AtomicU64::new(0)),
            ledger,
            submitted: 0,
        }
    }

    pub fn ledger(&self) -> &PictureLedger {
        &self.ledger
    }

    pub fn is_configured(&self) -> bool {
        self.state == AdapterState::Configured
    }

    /// Samples submitted since configuration.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Check support and configure the engine.
    pub async fn configure(&mut self, config: &CodecConfiguration) -> ExtractorResult<()> {
        if self.state == AdapterState::Closed {
            return Err(ExtractorError::SessionEnded);
        }
        if !self.engine.is_config_supported(config).await {
            return Err(ExtractorError::UnsupportedCodecConfiguration(format!(
                "{} on {}",
                config.codec,
                self.engine.name()
            )));
        }
        let sink = FrameSink::new(self.tx.clone(), self.epoch.clone(), self.ledger.clone());
        self.engine
            .configure(config, sink)
            .await
            .map_err(as_fault)?;
        self.state = AdapterState::Configured;
        info!(
            "Decoder {} configured for {} ({}x{})",
            self.engine.name(),
            config.codec,
            config.coded_width,
            config.coded_height
        );
        Ok(())
    }

    /// Submit one sample in decode order.
    pub async fn submit(&mut self, sample: &EncodedSample) -> ExtractorResult<()> {
        match self.state {
            AdapterState::Unconfigured => return Err(ExtractorError::NotConfigured),
            AdapterState::Closed => return Err(ExtractorError::SessionEnded),
            AdapterState::Configured => {}
        }
        self.submitted += 1;
        self.engine.decode(sample).await.map_err(as_fault)
    }

    /// Wait until every submitted sample produced or skipped its picture.
    pub async fn flush(&mut self) -> ExtractorResult<()> {
        match self.state {
            AdapterState::Unconfigured => Err(ExtractorError::NotConfigured),
            AdapterState::Closed => Err(ExtractorError::SessionEnded),
            AdapterState::Configured => self.engine.flush().await.map_err(as_fault),
        }
    }

    /// Take every current-epoch picture from the inbox. Stale pictures are
    /// released on the spot.
    pub fn drain(&mut self) -> Vec<DecodedPicture> {
        let current = self.epoch.load(Ordering::SeqCst);
        let mut pictures = Vec::new();
        let mut stale = 0;
        while let Ok(stamped) = self.inbox.try_recv() {
            if stamped.epoch == current {
                pictures.push(stamped.picture);
            } else {
                stale += 1;
            }
        }
        if stale > 0 {
            debug!("dropped {} pictures from a superseded request", stale);
        }
        pictures
    }

    /// Drain the engine and drop everything it still had in flight.
    ///
    /// Pictures emitted before this returns belong to the previous epoch and
    /// never reach the caller.
    pub async fn discard_in_flight(&mut self) -> ExtractorResult<()> {
        if self.state != AdapterState::Configured {
            return Ok(());
        }
        let flushed = self.engine.flush().await.map_err(as_fault);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        drop(self.drain());
        flushed
    }

    /// Release the engine and every picture still queued. Idempotent.
    pub fn close(&mut self) {
        if self.state == AdapterState::Closed {
            return;
        }
        self.engine.close();
        self.state = AdapterState::Closed;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.inbox.close();
        let mut dropped = 0;
        while let Ok(stamped) = self.inbox.try_recv() {
            drop(stamped);
            dropped += 1;
        }
        if dropped > 0 {
            warn!("released {} undelivered pictures on close", dropped);
        }
        debug!("Decoder {} closed", self.engine.name());
    }
}

impl Drop for DecoderAdapter {
    fn drop(&mut self) {
        self.close();
    }
}
