use crate::bits::reader::{read_u32, read_u64, read_version_and_flags, skip};
use crate::errors::{ExtractorError, ExtractorResult};

/// Movie-level timing from the mvhd box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieHeader {
    pub timescale: u32,
    pub duration: u64,
}

impl MovieHeader {
    /// Duration in seconds, if the timescale is usable.
    pub fn duration_secs(&self) -> Option<f64> {
        if self.timescale > 0 {
            Some(self.duration as f64 / self.timescale as f64)
        } else {
            None
        }
    }
}

/// Parse mvhd box payload
pub fn parse_mvhd(mvhd: &[u8]) -> ExtractorResult<MovieHeader> {
    let truncated = || ExtractorError::parse("mvhd box too small");
    let mut pos = 0;
    let (version, _) = read_version_and_flags(mvhd, &mut pos).ok_or_else(truncated)?;
    let (timescale, duration) = if version == 1 {
        // creation and modification times are 64-bit
        skip(mvhd, &mut pos, 16).ok_or_else(truncated)?;
        let timescale = read_u32(mvhd, &mut pos).ok_or_else(truncated)?;
        let duration = read_u64(mvhd, &mut pos).ok_or_else(truncated)?;
        (timescale, duration)
    } else {
        skip(mvhd, &mut pos, 8).ok_or_else(truncated)?;
        let timescale = read_u32(mvhd, &mut pos).ok_or_else(truncated)?;
        let duration = read_u32(mvhd, &mut pos).ok_or_else(truncated)? as u64;
        (timescale, duration)
    };
    Ok(MovieHeader {
        timescale,
        duration,
    })
}
