use crate::bits::reader::{read_u32, read_version_and_flags, skip};
use crate::errors::{ExtractorError, ExtractorResult};

/// Parse the track_ID out of a tkhd box payload
pub fn parse_tkhd_track_id(tkhd: &[u8]) -> ExtractorResult<u32> {
    let truncated = || ExtractorError::parse("tkhd box too small");
    let mut pos = 0;
    let (version, _) = read_version_and_flags(tkhd, &mut pos).ok_or_else(truncated)?;
    // creation_time + modification_time
    let times = if version == 1 { 16 } else { 8 };
    skip(tkhd, &mut pos, times).ok_or_else(truncated)?;
    read_u32(tkhd, &mut pos).ok_or_else(truncated)
}
