//! Incremental MP4 box reader.
//!
//! Bytes arrive as append-only chunks with arbitrary boundaries. Top-level
//! boxes are walked as soon as their headers are complete; `moov` and `moof`
//! are parsed once fully buffered while `mdat` payloads are skipped over and
//! stay addressable by absolute file offset until discarded.

use super::fragment::{parse_moof, Fragment};
use super::moov::{parse_moov, Movie};
use super::r#box::parse_box_header;
use super::stsd::decoder_configuration_record;
use super::trak::TrackDescriptor;
use crate::errors::{ExtractorError, ExtractorResult};
use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use std::collections::HashMap;

pub struct BoxReader {
    buffer: BytesMut,
    /// Absolute file offset of `buffer[0]`.
    origin: u64,
    /// Absolute offset of the next top-level box to examine.
    cursor: u64,
    movie: Option<Movie>,
    fragments: Vec<Fragment>,
    next_fragment_dts: HashMap<u32, i64>,
    /// Set once an mdat without a size field swallows the rest of the file.
    open_ended: bool,
    finished: bool,
}

impl Default for BoxReader {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxReader {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            origin: 0,
            cursor: 0,
            movie: None,
            fragments: Vec::new(),
            next_fragment_dts: HashMap::new(),
            open_ended: false,
            finished: false,
        }
    }

    /// Append a chunk and parse every top-level box it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> ExtractorResult<()> {
        if self.finished {
            return Err(ExtractorError::parse("data fed after end of input"));
        }
        self.buffer.extend_from_slice(chunk);
        self.parse_top_level()
    }

    /// Signal end of input.
    ///
    /// Fails when the movie header never completed or a structural box was
    /// cut short.
    pub fn flush(&mut self) -> ExtractorResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.parse_top_level()?;

        if !self.open_ended && self.cursor < self.end_offset() {
            let mut pos = self.relative(self.cursor);
            match parse_box_header(&self.buffer, &mut pos) {
                Some(header) if &header.name == b"mdat" => {
                    debug!("mdat truncated at end of input");
                }
                Some(header) => {
                    return Err(ExtractorError::parse(format!(
                        "{} box truncated at end of input",
                        header.name_str()
                    )));
                }
                None => warn!(
                    "{} trailing bytes after last box",
                    self.end_offset() - self.cursor
                ),
            }
        }

        if self.movie.is_none() {
            return Err(ExtractorError::parse(
                "moov box never completed before end of input",
            ));
        }
        Ok(())
    }

    /// True once the moov box has been parsed.
    pub fn is_ready(&self) -> bool {
        self.movie.is_some()
    }

    pub fn movie(&self) -> Option<&Movie> {
        self.movie.as_ref()
    }

    pub fn tracks(&self) -> Vec<&TrackDescriptor> {
        self.movie
            .as_ref()
            .map(|movie| movie.descriptors().collect())
            .unwrap_or_default()
    }

    /// Raw decoder configuration record of a track (avcC, hvcC ... payload)
    /// and the name of the box it was found in.
    pub fn decoder_configuration(&self, track_id: u32) -> Option<(&'static str, &[u8])> {
        let track = self.movie.as_ref()?.track(track_id)?;
        decoder_configuration_record(&track.descriptor.raw_configuration_bytes)
    }

    /// Fragments parsed since the last call.
    pub fn take_fragments(&mut self) -> Vec<Fragment> {
        std::mem::take(&mut self.fragments)
    }

    /// Absolute offset one past the last byte received.
    pub fn end_offset(&self) -> u64 {
        self.origin + self.buffer.len() as u64
    }

    /// Copy of `size` bytes at absolute `offset`, if they are buffered.
    pub fn slice(&self, offset: u64, size: u32) -> Option<Bytes> {
        if offset < self.origin || offset + size as u64 > self.end_offset() {
            return None;
        }
        let start = self.relative(offset);
        Some(Bytes::copy_from_slice(
            &self.buffer[start..start + size as usize],
        ))
    }

    /// Drop buffered bytes before `offset`. Bytes of unparsed boxes are kept.
    pub fn discard_before(&mut self, offset: u64) {
        let keep_from = offset.min(self.cursor).min(self.end_offset());
        if keep_from <= self.origin {
            return;
        }
        let _ = self.buffer.split_to(self.relative(keep_from));
        self.origin = keep_from;
    }

    fn relative(&self, offset: u64) -> usize {
        (offset - self.origin) as usize
    }

    fn parse_top_level(&mut self) -> ExtractorResult<()> {
        while !self.open_ended && self.cursor < self.end_offset() {
            let start = self.relative(self.cursor);
            let mut pos = start;
            let Some(header) = parse_box_header(&self.buffer, &mut pos) else {
                return Ok(());
            };

            let box_size = match header.size {
                Some(size) if size < header.header_size => {
                    return Err(ExtractorError::parse(format!(
                        "box {} at offset {} has invalid size {}",
                        header.name_str(),
                        self.cursor,
                        size
                    )));
                }
                Some(size) => size,
                None if &header.name == b"mdat" => {
                    debug!("mdat at {} extends to end of file", self.cursor);
                    self.open_ended = true;
                    return Ok(());
                }
                // Size zero on a structural box: it ends with the input.
                None if self.finished => self.end_offset() - self.cursor,
                None => return Ok(()),
            };

            match &header.name {
                b"moov" | b"moof" => {
                    if self.end_offset() < self.cursor + box_size {
                        return Ok(());
                    }
                    let payload_start = start + header.header_size as usize;
                    let payload_end = start + box_size as usize;
                    if &header.name == b"moov" {
                        self.on_moov(payload_start, payload_end)?;
                    } else {
                        self.on_moof(payload_start, payload_end)?;
                    }
                }
                _ => debug!(
                    "skipping {} box ({} bytes) at {}",
                    header.name_str(),
                    box_size,
                    self.cursor
                ),
            }
            self.cursor += box_size;
        }
        Ok(())
    }

    fn on_moov(&mut self, start: usize, end: usize) -> ExtractorResult<()> {
        if self.movie.is_some() {
            return Err(ExtractorError::parse("duplicate moov box"));
        }
        let movie = parse_moov(&self.buffer[start..end])?;
        debug!(
            "moov parsed: {} tracks, fragmented={}",
            movie.tracks.len(),
            movie.is_fragmented()
        );
        for track in &movie.tracks {
            let end_dts = track
                .samples
                .last()
                .map(|s| s.dts + s.duration as i64)
                .unwrap_or(0);
            self.next_fragment_dts
                .insert(track.descriptor.track_id, end_dts);
        }
        self.movie = Some(movie);
        Ok(())
    }

    fn on_moof(&mut self, start: usize, end: usize) -> ExtractorResult<()> {
        let Some(movie) = self.movie.as_ref() else {
            return Err(ExtractorError::parse("moof box before moov box"));
        };
        let next_dts = &self.next_fragment_dts;
        let fragment = parse_moof(
            &self.buffer[start..end],
            self.cursor,
            &movie.extends,
            &mut |track_id: u32| -> i64 { next_dts.get(&track_id).copied().unwrap_or(0) },
        )?;
        for run in &fragment.runs {
            if let Some(last) = run.samples.last() {
                self.next_fragment_dts
                    .insert(run.track_id, last.dts + last.duration as i64);
            }
        }
        debug!(
            "moof #{} parsed at {}: {} samples",
            fragment.sequence_number,
            self.cursor,
            fragment.runs.iter().map(|r| r.samples.len()).sum::<usize>()
        );
        self.fragments.push(fragment);
        Ok(())
    }
}
