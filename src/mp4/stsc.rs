use super::r#box::require_box;
use crate::errors::{ExtractorError, ExtractorResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleToChunkEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// Parse stsc (sample to chunk) box
pub fn parse_stsc(stbl: &[u8]) -> ExtractorResult<Vec<SampleToChunkEntry>> {
    let stsc = require_box(stbl, "stsc", "stbl")?;

    if stsc.len() < 8 {
        return Err(ExtractorError::parse(
            "stsc box too small: expected at least 8 bytes",
        ));
    }

    let entry_count = u32::from_be_bytes([stsc[4], stsc[5], stsc[6], stsc[7]]);

    // Verify that the box has enough space for all entries
    let required_size = 8 + (entry_count as usize * 12);
    if required_size > stsc.len() {
        return Err(ExtractorError::parse(format!(
            "stsc box too small for {} entries: expected {} bytes, got {}",
            entry_count,
            required_size,
            stsc.len()
        )));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);

    for i in 0..entry_count {
        let entry_pos = 8 + (i * 12) as usize;
        let field = |offset: usize| {
            u32::from_be_bytes([
                stsc[entry_pos + offset],
                stsc[entry_pos + offset + 1],
                stsc[entry_pos + offset + 2],
                stsc[entry_pos + offset + 3],
            ])
        };
        let entry = SampleToChunkEntry {
            first_chunk: field(0),
            samples_per_chunk: field(4),
            sample_description_index: field(8),
        };
        if entry.first_chunk == 0 {
            return Err(ExtractorError::parse("stsc entry references chunk 0"));
        }
        entries.push(entry);
    }

    Ok(entries)
}
