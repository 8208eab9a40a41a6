use super::r#box::find_box;
use crate::errors::{ExtractorError, ExtractorResult};

/// Parse stss (sync samples) box.
///
/// Returns `None` when the box is absent, which means every sample is a
/// sync sample. Sample numbers are 1-based as stored.
pub fn parse_stss(stbl: &[u8]) -> ExtractorResult<Option<Vec<u32>>> {
    let Some(stss) = find_box(stbl, "stss") else {
        return Ok(None);
    };

    if stss.len() < 8 {
        return Err(ExtractorError::parse("stss box too small"));
    }

    let entry_count = u32::from_be_bytes([stss[4], stss[5], stss[6], stss[7]]);
    if 8 + entry_count as usize * 4 > stss.len() {
        return Err(ExtractorError::parse(format!(
            "stss box too small for {} entries",
            entry_count
        )));
    }
    let mut sync_samples = Vec::with_capacity(entry_count as usize);

    for i in 0..entry_count {
        let entry_pos = 8 + (i * 4) as usize;
        let sample_number = u32::from_be_bytes([
            stss[entry_pos],
            stss[entry_pos + 1],
            stss[entry_pos + 2],
            stss[entry_pos + 3],
        ]);
        sync_samples.push(sample_number);
    }

    Ok(Some(sync_samples))
}
