use super::r#box::find_box;
use crate::bits::reader::{read_i32, read_u32, read_version_and_flags};
use crate::errors::{ExtractorError, ExtractorResult};

/// ctts (composition time to sample) entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CttsEntry {
    pub sample_count: u32,
    /// Composition offset; signed in version 1 boxes.
    pub sample_offset: i32,
}

/// Parse the optional ctts box. Streams without reordering omit it.
pub fn parse_ctts(stbl: &[u8]) -> ExtractorResult<Vec<CttsEntry>> {
    let Some(ctts) = find_box(stbl, "ctts") else {
        return Ok(Vec::new());
    };
    let truncated = || ExtractorError::parse("ctts box truncated");

    let mut pos = 0;
    let (version, _) = read_version_and_flags(ctts, &mut pos).ok_or_else(truncated)?;
    let entry_count = read_u32(ctts, &mut pos).ok_or_else(truncated)?;
    if 8 + entry_count as usize * 8 > ctts.len() {
        return Err(ExtractorError::parse(format!(
            "ctts box too small for {} entries",
            entry_count
        )));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let sample_count = read_u32(ctts, &mut pos).ok_or_else(truncated)?;
        let sample_offset = if version == 0 {
            // Unsigned in version 0, but encoders routinely write negative
            // values here anyway, so reinterpret like version 1.
            read_u32(ctts, &mut pos).ok_or_else(truncated)? as i32
        } else {
            read_i32(ctts, &mut pos).ok_or_else(truncated)?
        };
        entries.push(CttsEntry {
            sample_count,
            sample_offset,
        });
    }

    Ok(entries)
}

/// Expand ctts entries into one composition offset per sample.
/// Samples beyond the table get offset 0.
pub fn expand_composition_offsets(entries: &[CttsEntry], sample_count: usize) -> Vec<i32> {
    let mut offsets = Vec::with_capacity(sample_count);
    for entry in entries {
        for _ in 0..entry.sample_count {
            if offsets.len() == sample_count {
                return offsets;
            }
            offsets.push(entry.sample_offset);
        }
    }
    offsets.resize(sample_count, 0);
    offsets
}
