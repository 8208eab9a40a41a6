//! The seek/buffer controller: sequential advance, random seek with
//! key-frame replay, and release of every picture on every path.

use super::buffer::PendingPictures;
use super::config::ExtractorConfig;
use super::index::SampleIndex;
use crate::decoder::{DecodeEngine, DecodedPicture, DecoderAdapter, PictureLedger};
use crate::demux::{DemuxEvent, SampleDemuxer, TrackInfo};
use crate::diagnostics::DiagnosticLog;
use crate::errors::{ExtractorError, ExtractorResult};
use crate::render::RenderSurface;
use crate::streams::ByteSource;
use log::{debug, warn};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorState {
    Uninitialized,
    Configuring,
    Ready,
    Advancing,
    Seeking,
    Closed,
    Failed,
}

/// What was handed to the render surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveredFrame {
    /// Presentation timestamp in track timescale ticks.
    pub pts: i64,
    /// Presentation timestamp in seconds.
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
}

/// Drives bytes through the demuxer and decoder and answers `next` and
/// `seek` requests with one picture each.
pub struct FrameExtractor {
    state: ExtractorState,
    config: ExtractorConfig,
    source: Box<dyn ByteSource>,
    surface: Box<dyn RenderSurface>,
    demuxer: SampleDemuxer,
    adapter: DecoderAdapter,
    track: Option<TrackInfo>,
    index: SampleIndex,
    pending: PendingPictures,
    /// Decode index of the next sample to submit.
    cursor: usize,
    /// Highest pts that left the buffer; `None` before the first delivery.
    watermark: Option<i64>,
    input_done: bool,
    /// Set while a request runs; still set on entry means the last one was
    /// cancelled mid-flight.
    in_flight: bool,
    /// Decoder and buffer no longer match `cursor` and must be rebuilt.
    needs_resync: bool,
    diagnostics: DiagnosticLog,
}

impl FrameExtractor {
    pub fn new(
        source: Box<dyn ByteSource>,
        engine: Box<dyn DecodeEngine>,
        surface: Box<dyn RenderSurface>,
        config: ExtractorConfig,
    ) -> ExtractorResult<Self> {
        config.validate()?;
        Ok(Self {
            state: ExtractorState::Uninitialized,
            pending: PendingPictures::new(config.max_pending_pictures),
            config,
            source,
            surface,
            demuxer: SampleDemuxer::new(),
            adapter: DecoderAdapter::new(engine, PictureLedger::new()),
            track: None,
            index: SampleIndex::new(),
            cursor: 0,
            watermark: None,
            input_done: false,
            in_flight: false,
            needs_resync: false,
            diagnostics: DiagnosticLog::new(),
        })
    }

    pub fn state(&self) -> ExtractorState {
        self.state
    }

    pub fn track(&self) -> Option<&TrackInfo> {
        self.track.as_ref()
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    pub fn ledger(&self) -> &PictureLedger {
        self.adapter.ledger()
    }

    pub fn index(&self) -> &SampleIndex {
        &self.index
    }

    /// Watermark in seconds.
    pub fn watermark(&self) -> Option<f64> {
        self.watermark.map(|w| self.to_secs(w))
    }

    pub fn pending_pictures(&self) -> usize {
        self.pending.len()
    }

    /// Track duration in seconds: the header value or the indexed end,
    /// whichever is larger.
    pub fn duration(&self) -> f64 {
        let header = self.track.as_ref().map_or(0.0, |t| t.duration_secs);
        header.max(self.to_secs(self.index.end_pts()))
    }

    /// Read until the movie header is parsed, then configure the decoder.
    pub async fn initialize(&mut self) -> ExtractorResult<TrackInfo> {
        match self.state {
            ExtractorState::Uninitialized => {}
            ExtractorState::Closed | ExtractorState::Failed => {
                return Err(ExtractorError::SessionEnded)
            }
            _ => {
                return self
                    .track
                    .clone()
                    .ok_or(ExtractorError::NotConfigured)
            }
        }
        self.state = ExtractorState::Configuring;
        let result = self.configure().await;
        match result {
            Ok(track) => {
                self.state = ExtractorState::Ready;
                Ok(track)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    async fn configure(&mut self) -> ExtractorResult<TrackInfo> {
        while self.track.is_none() {
            if self.input_done {
                return Err(ExtractorError::parse("input ended before the movie header"));
            }
            self.pull_chunk().await?;
        }
        let track = self.track.clone().ok_or(ExtractorError::NotConfigured)?;
        self.adapter.configure(&track.configuration).await?;
        self.diagnostics.push(format!(
            "Track {}: {} {}x{}, {:.3}s, timescale {}",
            track.descriptor.track_id,
            track.configuration.codec,
            track.configuration.coded_width,
            track.configuration.coded_height,
            track.duration_secs,
            track.timescale()
        ));
        Ok(track)
    }

    /// Deliver the next picture in presentation order.
    ///
    /// Returns `Ok(None)` when the stream is exhausted.
    pub async fn next(&mut self) -> ExtractorResult<Option<DeliveredFrame>> {
        self.begin(ExtractorState::Advancing).await?;
        let result = if self.needs_resync {
            let target = self.watermark.map_or(i64::MIN, |w| w + 1);
            self.seek_ticks(target).await
        } else {
            self.advance().await
        };
        self.finish(result)
    }

    /// Deliver the earliest picture presented at or after `target` seconds.
    ///
    /// Missing, negative, non-finite or past-the-end targets are ignored and
    /// return `Ok(None)` without touching any state.
    pub async fn seek(&mut self, target: Option<f64>) -> ExtractorResult<Option<DeliveredFrame>> {
        self.check_usable()?;
        let Some(target) = target else {
            return Ok(None);
        };
        if !target.is_finite() || target < 0.0 || !self.within_duration(target) {
            debug!("seek to {} ignored", target);
            return Ok(None);
        }
        let ticks = self.to_ticks(target);
        self.begin(ExtractorState::Seeking).await?;
        let started = Instant::now();
        let result = self.seek_ticks(ticks).await;
        if let Ok(Some(frame)) = &result {
            self.diagnostics.push(format!(
                "Seek to {:.3}s delivered {:.3}s in {} ms",
                target,
                frame.timestamp,
                started.elapsed().as_millis()
            ));
        }
        self.finish(result)
    }

    /// Seek to the `n`-th picture in presentation order.
    pub async fn seek_frame(&mut self, n: usize) -> ExtractorResult<Option<DeliveredFrame>> {
        self.check_usable()?;
        self.begin(ExtractorState::Seeking).await?;
        let result = self.seek_nth(n).await;
        self.finish(result)
    }

    /// Seek to the picture presented just before the watermark.
    pub async fn step_back(&mut self) -> ExtractorResult<Option<DeliveredFrame>> {
        self.check_usable()?;
        let Some(watermark) = self.watermark else {
            return Ok(None);
        };
        let Some(previous) = self
            .index
            .presentation_before(watermark)
            .and_then(|i| self.index.pts(i))
        else {
            return Ok(None);
        };
        self.begin(ExtractorState::Seeking).await?;
        let result = self.seek_ticks(previous).await;
        self.finish(result)
    }

    /// Read the rest of the input so the sample index is complete.
    ///
    /// Returns the number of indexed samples.
    pub async fn index_to_end(&mut self) -> ExtractorResult<usize> {
        self.check_usable()?;
        while !self.input_done {
            if let Err(e) = self.pull_chunk().await {
                self.fail(&e);
                return Err(e);
            }
        }
        Ok(self.index.len())
    }

    /// Release the decoder and every buffered picture. Idempotent.
    pub fn close(&mut self) {
        if self.state == ExtractorState::Closed {
            return;
        }
        let released = self.pending.release_all();
        self.adapter.close();
        debug!("closed, {} pending pictures released", released);
        self.state = ExtractorState::Closed;
        self.diagnostics.push("Extractor closed");
    }

    fn check_usable(&self) -> ExtractorResult<()> {
        match self.state {
            ExtractorState::Closed | ExtractorState::Failed => Err(ExtractorError::SessionEnded),
            ExtractorState::Uninitialized | ExtractorState::Configuring => {
                Err(ExtractorError::NotConfigured)
            }
            _ => Ok(()),
        }
    }

    async fn begin(&mut self, op: ExtractorState) -> ExtractorResult<()> {
        self.check_usable()?;
        if self.in_flight {
            warn!("previous request was cancelled mid-flight, resynchronising");
            self.pending.release_all();
            if let Err(e) = self.adapter.discard_in_flight().await {
                self.in_flight = false;
                self.fail(&e);
                return Err(e);
            }
            self.needs_resync = true;
        }
        self.in_flight = true;
        self.state = op;
        Ok(())
    }

    fn finish(
        &mut self,
        result: ExtractorResult<Option<DeliveredFrame>>,
    ) -> ExtractorResult<Option<DeliveredFrame>> {
        self.in_flight = false;
        match &result {
            Err(e) if e.is_fatal() => self.fail(e),
            _ => self.state = ExtractorState::Ready,
        }
        result
    }

    fn fail(&mut self, error: &ExtractorError) {
        self.diagnostics.error(error.to_string());
        self.pending.release_all();
        self.adapter.close();
        self.state = ExtractorState::Failed;
    }

    async fn advance(&mut self) -> ExtractorResult<Option<DeliveredFrame>> {
        loop {
            self.collect_decoded(self.watermark);
            if let Some(front) = self.pending.front_pts() {
                if self.is_settled(front) {
                    break;
                }
                if self.pending.is_full() {
                    debug!(
                        "pending buffer over capacity at {} pictures, {} not settled yet",
                        self.pending.len(),
                        front
                    );
                }
            }
            if self.cursor < self.index.len() {
                self.decode_ahead().await?;
            } else if !self.input_done {
                self.pull_chunk().await?;
            } else {
                break;
            }
        }

        match self.pending.pop_front() {
            Some(picture) => Ok(Some(self.deliver(picture))),
            None => Ok(None),
        }
    }

    async fn seek_nth(&mut self, n: usize) -> ExtractorResult<Option<DeliveredFrame>> {
        while !self.input_done && !self.nth_is_indexed(n) {
            self.pull_chunk().await?;
        }
        match self.index.nth_presentation(n).and_then(|i| self.index.pts(i)) {
            Some(pts) => self.seek_ticks(pts).await,
            None => Ok(None),
        }
    }

    /// The n-th presentation slot can no longer be taken by a later sample.
    fn nth_is_indexed(&self, n: usize) -> bool {
        self.index
            .nth_presentation(n)
            .and_then(|i| self.index.pts(i))
            .is_some_and(|pts| self.index.covers(pts))
    }

    async fn seek_ticks(&mut self, ticks: i64) -> ExtractorResult<Option<DeliveredFrame>> {
        if !self.needs_resync && self.watermark.map_or(true, |w| ticks > w) {
            self.collect_decoded(self.watermark);
            if let Some(pts) = self.pending.first_at_or_after(ticks) {
                if self.is_settled(pts) {
                    let skipped = self.pending.release_below(ticks);
                    debug!("seek served from buffer, {} pictures skipped", skipped);
                    if let Some(picture) = self.pending.pop_front() {
                        return Ok(Some(self.deliver(picture)));
                    }
                }
            }
        }

        self.replay_to(ticks).await
    }

    /// Decode from the key frame preceding the first sample at or after
    /// `ticks` and deliver that sample's picture.
    async fn replay_to(&mut self, ticks: i64) -> ExtractorResult<Option<DeliveredFrame>> {
        while !self.input_done
            && !self
                .index
                .first_at_or_after(ticks)
                .and_then(|i| self.index.pts(i))
                .is_some_and(|pts| self.index.covers(pts))
        {
            self.pull_chunk().await?;
        }

        let Some(target) = self.index.first_at_or_after(ticks) else {
            debug!("no sample at or after {}", ticks);
            return Ok(None);
        };
        let key = self.index.key_frame_for(target).ok_or_else(|| {
            ExtractorError::parse(format!("no key frame precedes sample {}", target))
        })?;

        self.pending.release_all();
        self.adapter.discard_in_flight().await?;
        // Stays set until the flush returns so a cancelled replay is redone.
        self.needs_resync = true;
        self.cursor = target + 1;
        for i in key..=target {
            if let Some(sample) = self.index.get(i) {
                self.adapter.submit(sample).await?;
            }
        }
        self.adapter.flush().await?;
        self.needs_resync = false;
        debug!("replayed samples {}..={} for target {}", key, target, ticks);

        self.collect_decoded(Some(ticks.saturating_sub(1)));
        match self.pending.pop_front() {
            Some(picture) => Ok(Some(self.deliver(picture))),
            None => {
                warn!("decoder produced no picture at or after {}", ticks);
                self.watermark = self.index.pts(target);
                Ok(None)
            }
        }
    }

    /// Submit the next batch of samples and flush.
    ///
    /// The batch shrinks to the room left in the pending buffer but always
    /// holds at least one sample, so an unsettled front can still be
    /// resolved once the buffer is full.
    async fn decode_ahead(&mut self) -> ExtractorResult<()> {
        let batch = self.config.decode_batch.min(self.pending.room()).max(1);
        let end = (self.cursor + batch).min(self.index.len());
        for i in self.cursor..end {
            if let Some(sample) = self.index.get(i) {
                self.adapter.submit(sample).await?;
            }
            self.cursor = i + 1;
        }
        self.adapter.flush().await
    }

    /// Move decoder output into the pending buffer, releasing anything at or
    /// below `floor`.
    fn collect_decoded(&mut self, floor: Option<i64>) {
        for picture in self.adapter.drain() {
            if floor.is_some_and(|f| picture.pts <= f) {
                picture.release();
            } else {
                self.pending.insert(picture);
            }
        }
    }

    /// True when no sample that is still to be decoded can present before
    /// `pts`.
    fn is_settled(&self, pts: i64) -> bool {
        if self
            .index
            .min_undecoded_pts(self.cursor, self.watermark)
            .is_some_and(|m| m < pts)
        {
            return false;
        }
        self.input_done || self.index.covers(pts)
    }

    fn deliver(&mut self, picture: DecodedPicture) -> DeliveredFrame {
        self.surface.deliver(&picture);
        let frame = DeliveredFrame {
            pts: picture.pts,
            timestamp: self.to_secs(picture.pts),
            width: picture.width,
            height: picture.height,
        };
        picture.release();
        self.watermark = Some(frame.pts);
        // Anything still buffered at or below the new watermark is stale.
        self.pending.release_below(frame.pts + 1);
        frame
    }

    async fn pull_chunk(&mut self) -> ExtractorResult<()> {
        let events = match self.source.next_chunk().await? {
            Some(chunk) => self.demuxer.feed(&chunk)?,
            None => {
                self.input_done = true;
                self.source.print_stats();
                self.demuxer.flush()?
            }
        };
        for event in events {
            match event {
                DemuxEvent::Ready(track) => {
                    if self.track.is_some() {
                        return Err(ExtractorError::parse("movie header reported twice"));
                    }
                    self.track = Some(track);
                }
                DemuxEvent::Samples(samples) => {
                    for sample in samples {
                        self.index.push(sample);
                    }
                }
            }
        }
        if self.input_done {
            self.diagnostics.push(format!(
                "Indexed {} samples, {} key frames",
                self.index.len(),
                self.index.key_frame_count()
            ));
        }
        Ok(())
    }

    fn timescale(&self) -> f64 {
        self.track
            .as_ref()
            .map_or(1.0, |t| t.timescale().max(1) as f64)
    }

    fn to_secs(&self, ticks: i64) -> f64 {
        ticks as f64 / self.timescale()
    }

    /// Smallest tick count at or after `secs`, tolerating float error.
    fn to_ticks(&self, secs: f64) -> i64 {
        (secs * self.timescale() - 1e-6).ceil() as i64
    }

    fn within_duration(&self, target: f64) -> bool {
        let header = self.track.as_ref().map_or(0.0, |t| t.duration_secs);
        if header <= 0.0 && !self.input_done {
            // Length unknown until the input ends; the index only covers what
            // has been read so far.
            return true;
        }
        target <= self.duration()
    }
}

impl Drop for FrameExtractor {
    fn drop(&mut self) {
        self.close();
    }
}
