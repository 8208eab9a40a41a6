use super::r#box::require_box;
use crate::errors::{ExtractorError, ExtractorResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// Parse stts (decoding time to sample) box
pub fn parse_stts(stbl: &[u8]) -> ExtractorResult<Vec<SttsEntry>> {
    let stts = require_box(stbl, "stts", "stbl")?;

    if stts.len() < 8 {
        return Err(ExtractorError::parse(
            "stts box too small: expected at least 8 bytes",
        ));
    }

    let entry_count = u32::from_be_bytes([stts[4], stts[5], stts[6], stts[7]]);

    // Verify that the box has enough space for all entries
    let required_size = 8 + (entry_count as usize * 8);
    if required_size > stts.len() {
        return Err(ExtractorError::parse(format!(
            "stts box too small for {} entries: expected {} bytes, got {}",
            entry_count,
            required_size,
            stts.len()
        )));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);

    for i in 0..entry_count {
        let entry_pos = 8 + (i * 8) as usize;
        let sample_count = u32::from_be_bytes([
            stts[entry_pos],
            stts[entry_pos + 1],
            stts[entry_pos + 2],
            stts[entry_pos + 3],
        ]);
        let sample_delta = u32::from_be_bytes([
            stts[entry_pos + 4],
            stts[entry_pos + 5],
            stts[entry_pos + 6],
            stts[entry_pos + 7],
        ]);

        entries.push(SttsEntry {
            sample_count,
            sample_delta,
        });
    }

    Ok(entries)
}

/// Number of samples the stts entries give a decode time to.
pub fn timed_sample_count(entries: &[SttsEntry]) -> u64 {
    entries.iter().map(|e| e.sample_count as u64).sum()
}

/// Expand stts entries into per-sample (decode timestamp, duration) pairs
/// for the first `sample_count` samples.
pub fn expand_decode_times(entries: &[SttsEntry], sample_count: usize) -> Vec<(i64, u32)> {
    let mut times = Vec::with_capacity(sample_count);
    let mut time_offset = 0i64;

    for entry in entries {
        for _ in 0..entry.sample_count {
            if times.len() == sample_count {
                return times;
            }
            times.push((time_offset, entry.sample_delta));
            time_offset += entry.sample_delta as i64;
        }
    }

    times
}
