use super::r#box::{find_box, BoxIter};
use crate::bits::reader::{read_u16, read_u32, skip};
use crate::errors::{ExtractorError, ExtractorResult};

/// Bytes between the end of a visual sample entry header and its first
/// child box (ISO/IEC 14496-12 VisualSampleEntry).
const VISUAL_SAMPLE_ENTRY_FIELDS: usize = 78;

/// First sample description of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEntry {
    /// Sample entry fourcc, e.g. `avc1`.
    pub fourcc: String,
    pub width: u32,
    pub height: u32,
}

/// Configuration boxes recognised inside a visual sample entry.
const CONFIG_BOXES: [&str; 4] = ["avcC", "hvcC", "av1C", "vpcC"];

/// Parse the first entry of an stsd payload.
///
/// Width and height are only read for visual entries; other entries report 0.
pub fn parse_stsd(stsd: &[u8], visual: bool) -> ExtractorResult<SampleEntry> {
    let (fourcc, entry) = first_entry(stsd)?;

    let mut width = 0;
    let mut height = 0;
    if visual {
        let mut pos = 0;
        // reserved(6) data_reference_index(2) pre_defined/reserved(16)
        skip(entry, &mut pos, 24)
            .ok_or_else(|| ExtractorError::parse("visual sample entry truncated"))?;
        width = read_u16(entry, &mut pos)
            .ok_or_else(|| ExtractorError::parse("visual sample entry truncated"))?
            as u32;
        height = read_u16(entry, &mut pos)
            .ok_or_else(|| ExtractorError::parse("visual sample entry truncated"))?
            as u32;
    }

    Ok(SampleEntry {
        fourcc,
        width,
        height,
    })
}

/// Locate a configuration box (`avcC`, `hvcC`, `av1C`...) inside the first
/// visual sample entry of an stsd payload.
pub fn find_config_box<'a>(stsd: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let (_, entry) = first_entry(stsd).ok()?;
    let children = entry.get(VISUAL_SAMPLE_ENTRY_FIELDS..)?;
    find_box(children, name)
}

/// The decoder configuration record of the first sample entry, with the
/// name of the box that carried it.
pub fn decoder_configuration_record(stsd: &[u8]) -> Option<(&'static str, &[u8])> {
    CONFIG_BOXES
        .iter()
        .find_map(|&name| find_config_box(stsd, name).map(|record| (name, record)))
}

fn first_entry(stsd: &[u8]) -> ExtractorResult<(String, &[u8])> {
    let mut pos = 4;
    let entry_count = read_u32(stsd, &mut pos)
        .ok_or_else(|| ExtractorError::parse("stsd box too small"))?;
    if entry_count == 0 {
        return Err(ExtractorError::parse("stsd box has no sample entries"));
    }

    let mut entries = BoxIter::new(&stsd[pos..]);
    match entries.next() {
        Some((header, payload)) => Ok((header.name_str(), payload)),
        None => Err(ExtractorError::parse(format!(
            "stsd sample entry unreadable: {}",
            entries.error().unwrap_or("empty")
        ))),
    }
}

#[cfg(test)]
#[path = "stsd_test.rs"]
mod stsd_test;
