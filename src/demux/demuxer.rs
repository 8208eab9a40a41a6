use super::types::{DemuxEvent, EncodedSample, TrackInfo};
use crate::codec::CodecConfigurator;
use crate::errors::{ExtractorError, ExtractorResult};
use crate::mp4::{BoxReader, Movie, SampleRecord, Track};
use log::{debug, info};
use std::collections::VecDeque;

/// Samples sharing a chunk (progressive) or fragment (fragmented).
struct SampleGroup {
    samples: Vec<SampleRecord>,
    min_offset: u64,
    end_offset: u64,
}

impl SampleGroup {
    fn new(samples: Vec<SampleRecord>) -> Self {
        let min_offset = samples.iter().map(|s| s.offset).min().unwrap_or(0);
        let end_offset = samples.iter().map(|s| s.end_offset()).max().unwrap_or(0);
        Self {
            samples,
            min_offset,
            end_offset,
        }
    }
}

/// Drives the box reader with incoming bytes and emits the selected video
/// track's samples in decode order.
pub struct SampleDemuxer {
    reader: BoxReader,
    track_id: Option<u32>,
    pending: VecDeque<SampleGroup>,
    emitted: usize,
}

impl Default for SampleDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleDemuxer {
    pub fn new() -> Self {
        Self {
            reader: BoxReader::new(),
            track_id: None,
            pending: VecDeque::new(),
            emitted: 0,
        }
    }

    /// Samples emitted so far.
    pub fn emitted_samples(&self) -> usize {
        self.emitted
    }

    /// Feed a chunk of bytes and collect whatever it makes available.
    pub fn feed(&mut self, chunk: &[u8]) -> ExtractorResult<Vec<DemuxEvent>> {
        self.reader.feed(chunk)?;
        self.collect_events()
    }

    /// End of input. Fails if the header never completed or sample data is
    /// missing.
    pub fn flush(&mut self) -> ExtractorResult<Vec<DemuxEvent>> {
        self.reader.flush()?;
        let events = self.collect_events()?;
        if !self.pending.is_empty() {
            let missing: usize = self.pending.iter().map(|g| g.samples.len()).sum();
            return Err(ExtractorError::parse(format!(
                "input ended with {} samples of track {} missing",
                missing,
                self.track_id.unwrap_or_default()
            )));
        }
        info!("Demuxed {} samples", self.emitted);
        Ok(events)
    }

    fn collect_events(&mut self) -> ExtractorResult<Vec<DemuxEvent>> {
        let mut events = Vec::new();

        if self.track_id.is_none() {
            let Some(movie) = self.reader.movie() else {
                return Ok(events);
            };
            let track = select_video_track(movie)?;
            let record = self.reader.decoder_configuration(track.descriptor.track_id);
            let configuration = CodecConfigurator::build(&track.descriptor, record)?;
            info!(
                "Selected track {} ({}, {}x{})",
                track.descriptor.track_id,
                configuration.codec,
                configuration.coded_width,
                configuration.coded_height
            );

            let duration_secs = header_duration_secs(movie, track);
            let info = TrackInfo {
                descriptor: track.descriptor.clone(),
                configuration,
                duration_secs,
                indexed_samples: track.samples.len(),
                fragmented: movie.is_fragmented(),
            };
            let groups = group_by_chunk(&track.samples);
            self.track_id = Some(track.descriptor.track_id);
            self.pending.extend(groups);
            events.push(DemuxEvent::Ready(info));
        }

        let Some(track_id) = self.track_id else {
            return Ok(events);
        };
        for fragment in self.reader.take_fragments() {
            let samples: Vec<SampleRecord> = fragment.samples_for(track_id).cloned().collect();
            if !samples.is_empty() {
                self.pending.push_back(SampleGroup::new(samples));
            }
        }

        let available = self.reader.end_offset();
        while let Some(group) = self.pending.front() {
            if group.end_offset > available {
                break;
            }
            let Some(group) = self.pending.pop_front() else {
                break;
            };
            let mut samples = Vec::with_capacity(group.samples.len());
            for record in &group.samples {
                let payload = self.reader.slice(record.offset, record.size).ok_or_else(|| {
                    ExtractorError::parse(format!(
                        "sample at offset {} is no longer buffered",
                        record.offset
                    ))
                })?;
                samples.push(EncodedSample {
                    decode_timestamp: record.dts,
                    presentation_timestamp: record.pts(),
                    duration: record.duration,
                    is_key_frame: record.is_sync,
                    payload,
                });
            }
            self.emitted += samples.len();
            events.push(DemuxEvent::Samples(samples));
        }

        let keep_from = self
            .pending
            .iter()
            .map(|g| g.min_offset)
            .min()
            .unwrap_or(u64::MAX);
        self.reader.discard_before(keep_from);

        Ok(events)
    }
}

fn select_video_track(movie: &Movie) -> ExtractorResult<&Track> {
    let video = movie.video_tracks();
    match video.len() {
        0 => Err(ExtractorError::NoVideoTrack),
        1 => Ok(video[0]),
        n => Err(ExtractorError::UnsupportedMultiTrack(n)),
    }
}

fn header_duration_secs(movie: &Movie, track: &Track) -> f64 {
    let descriptor = &track.descriptor;
    if descriptor.duration > 0 {
        return descriptor.duration_secs();
    }
    // Fragmented files usually leave mdhd empty and carry mehd instead.
    if let (Some(duration), Some(_)) = (movie.fragment_duration, movie.header.duration_secs()) {
        return duration as f64 / movie.header.timescale as f64;
    }
    movie.header.duration_secs().unwrap_or(0.0)
}

fn group_by_chunk(samples: &[SampleRecord]) -> Vec<SampleGroup> {
    let mut groups = Vec::new();
    let mut current: Vec<SampleRecord> = Vec::new();
    for sample in samples {
        if current.last().is_some_and(|last| last.group != sample.group) {
            groups.push(SampleGroup::new(std::mem::take(&mut current)));
        }
        current.push(sample.clone());
    }
    if !current.is_empty() {
        groups.push(SampleGroup::new(current));
    }
    debug!("{} sample groups indexed", groups.len());
    groups
}
