use super::r#box::find_box;
use crate::errors::{ExtractorError, ExtractorResult};

/// Parse stco (chunk offset) or co64 box
pub fn parse_stco_or_co64(stbl: &[u8]) -> ExtractorResult<Vec<u64>> {
    // Try stco first (32-bit offsets)
    if let Some(stco) = find_box(stbl, "stco") {
        return parse_offsets(stco, "stco", 4);
    }

    // Try co64 (64-bit offsets)
    if let Some(co64) = find_box(stbl, "co64") {
        return parse_offsets(co64, "co64", 8);
    }

    Err(ExtractorError::parse(
        "No chunk offset box found: missing both stco and co64",
    ))
}

fn parse_offsets(data: &[u8], name: &str, width: usize) -> ExtractorResult<Vec<u64>> {
    if data.len() < 8 {
        return Err(ExtractorError::parse(format!(
            "{} box too small: expected at least 8 bytes",
            name
        )));
    }
    let entry_count = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as usize;
    if 8 + entry_count * width > data.len() {
        return Err(ExtractorError::parse(format!(
            "{} box too small for {} entries",
            name, entry_count
        )));
    }

    let offsets = data[8..8 + entry_count * width]
        .chunks_exact(width)
        .map(|entry| {
            entry
                .iter()
                .fold(0u64, |acc, &byte| (acc << 8) | byte as u64)
        })
        .collect();
    Ok(offsets)
}
