use super::r#box::require_box;
use crate::errors::{ExtractorError, ExtractorResult};
use log::warn;

/// Parse stsz (sample size) box, keeping at most `limit` sizes.
pub fn parse_stsz(stbl: &[u8], limit: usize) -> ExtractorResult<Vec<u32>> {
    let stsz = require_box(stbl, "stsz", "stbl")?;

    if stsz.len() < 12 {
        return Err(ExtractorError::parse(
            "stsz box too small: expected at least 12 bytes",
        ));
    }

    let sample_size = u32::from_be_bytes([stsz[4], stsz[5], stsz[6], stsz[7]]);
    let declared = u32::from_be_bytes([stsz[8], stsz[9], stsz[10], stsz[11]]);
    let sample_count = if declared as usize > limit {
        warn!(
            "stsz lists {} samples but only {} are timed, truncating",
            declared, limit
        );
        limit as u32
    } else {
        declared
    };

    if sample_size != 0 {
        // All samples have the same size
        return Ok(vec![sample_size; sample_count as usize]);
    }

    let required_size = 12 + (sample_count as usize * 4);
    if required_size > stsz.len() {
        return Err(ExtractorError::parse(format!(
            "stsz box too small for {} samples: expected {} bytes, got {}",
            sample_count,
            required_size,
            stsz.len()
        )));
    }

    let mut sizes = Vec::with_capacity(sample_count as usize);
    for i in 0..sample_count {
        let size_pos = 12 + (i * 4) as usize;
        let size = u32::from_be_bytes([
            stsz[size_pos],
            stsz[size_pos + 1],
            stsz[size_pos + 2],
            stsz[size_pos + 3],
        ]);
        sizes.push(size);
    }
    Ok(sizes)
}
