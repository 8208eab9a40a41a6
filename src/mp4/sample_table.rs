use super::ctts::{expand_composition_offsets, parse_ctts};
use super::stco::parse_stco_or_co64;
use super::stsc::{parse_stsc, SampleToChunkEntry};
use super::stss::parse_stss;
use super::stsz::parse_stsz;
use super::stts::{expand_decode_times, parse_stts, timed_sample_count};
use crate::errors::{ExtractorError, ExtractorResult};

/// One sample as located by the container index, in decode order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// Absolute byte offset of the sample payload in the file.
    pub offset: u64,
    pub size: u32,
    /// Decode timestamp in track timescale ticks.
    pub dts: i64,
    /// Presentation timestamp minus decode timestamp.
    pub composition_offset: i32,
    pub duration: u32,
    pub is_sync: bool,
    /// Chunk number for progressive files, fragment sequence number otherwise.
    pub group: u32,
}

impl SampleRecord {
    pub fn pts(&self) -> i64 {
        self.dts + self.composition_offset as i64
    }

    pub fn end_offset(&self) -> u64 {
        self.offset + self.size as u64
    }
}

/// Upper bound on the samples of one track or one track run, about 38 hours
/// at 60 frames per second. Counts come straight from the file and are
/// checked against this before anything is allocated for them.
pub const MAX_TRACK_SAMPLES: u64 = 1 << 23;

/// Build the decode-order sample list of a progressive track from its stbl.
pub fn build_sample_table(stbl: &[u8]) -> ExtractorResult<Vec<SampleRecord>> {
    let stts = parse_stts(stbl)?;
    let timed = timed_sample_count(&stts);
    if timed > MAX_TRACK_SAMPLES {
        return Err(ExtractorError::parse(format!(
            "stts times {} samples, more than the {} supported per track",
            timed, MAX_TRACK_SAMPLES
        )));
    }
    let sizes = parse_stsz(stbl, timed as usize)?;
    let sample_count = sizes.len();
    let times = expand_decode_times(&stts, sample_count);
    let chunk_offsets = parse_stco_or_co64(stbl)?;
    let stsc = parse_stsc(stbl)?;
    let sync = parse_stss(stbl)?;

    let offsets = expand_composition_offsets(&parse_ctts(stbl)?, sample_count);
    let locations = locate_samples(&stsc, &chunk_offsets, &sizes[..sample_count])?;

    let mut samples = Vec::with_capacity(sample_count);
    let mut sync_iter = sync.as_ref().map(|s| s.iter().peekable());
    for (index, (offset, chunk)) in locations.into_iter().enumerate() {
        let number = index as u32 + 1;
        let is_sync = match sync_iter.as_mut() {
            None => true,
            Some(iter) => {
                while iter.next_if(|&&n| n < number).is_some() {}
                iter.next_if(|&&n| n == number).is_some()
            }
        };
        let (dts, duration) = times[index];
        samples.push(SampleRecord {
            offset,
            size: sizes[index],
            dts,
            composition_offset: offsets[index],
            duration,
            is_sync,
            group: chunk,
        });
    }

    Ok(samples)
}

/// Resolve each sample's absolute offset and chunk number from stsc and stco.
fn locate_samples(
    stsc: &[SampleToChunkEntry],
    chunk_offsets: &[u64],
    sizes: &[u32],
) -> ExtractorResult<Vec<(u64, u32)>> {
    let mut locations = Vec::with_capacity(sizes.len());
    let mut sample = 0usize;

    for (i, entry) in stsc.iter().enumerate() {
        let last_chunk = match stsc.get(i + 1) {
            Some(next) => next.first_chunk.saturating_sub(1),
            None => chunk_offsets.len() as u32,
        };
        for chunk in entry.first_chunk..=last_chunk {
            let Some(&chunk_offset) = chunk_offsets.get(chunk as usize - 1) else {
                return Err(ExtractorError::parse(format!(
                    "stsc references chunk {} but only {} chunks exist",
                    chunk,
                    chunk_offsets.len()
                )));
            };
            let mut offset = chunk_offset;
            for _ in 0..entry.samples_per_chunk {
                if sample == sizes.len() {
                    return Ok(locations);
                }
                locations.push((offset, chunk));
                offset += sizes[sample] as u64;
                sample += 1;
            }
        }
    }

    if sample < sizes.len() {
        return Err(ExtractorError::parse(format!(
            "chunk table covers {} of {} samples",
            sample,
            sizes.len()
        )));
    }
    Ok(locations)
}
