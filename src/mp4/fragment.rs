//! Fragmented MP4 support: `mvex/trex` defaults and `moof/traf/trun` sample runs.

use super::r#box::{find_box, find_boxes};
use super::sample_table::{SampleRecord, MAX_TRACK_SAMPLES};
use crate::bits::reader::{read_i32, read_u32, read_u64, read_version_and_flags};
use crate::errors::{ExtractorError, ExtractorResult};

const TFHD_BASE_DATA_OFFSET: u32 = 0x000001;
const TFHD_SAMPLE_DESCRIPTION_INDEX: u32 = 0x000002;
const TFHD_DEFAULT_SAMPLE_DURATION: u32 = 0x000008;
const TFHD_DEFAULT_SAMPLE_SIZE: u32 = 0x000010;
const TFHD_DEFAULT_SAMPLE_FLAGS: u32 = 0x000020;

const TRUN_DATA_OFFSET: u32 = 0x000001;
const TRUN_FIRST_SAMPLE_FLAGS: u32 = 0x000004;
const TRUN_SAMPLE_DURATION: u32 = 0x000100;
const TRUN_SAMPLE_SIZE: u32 = 0x000200;
const TRUN_SAMPLE_FLAGS: u32 = 0x000400;
const TRUN_SAMPLE_COMPOSITION_TIME_OFFSET: u32 = 0x000800;

/// `sample_is_non_sync_sample` bit of the sample flags word.
const SAMPLE_IS_NON_SYNC: u32 = 0x0001_0000;

/// Per-track defaults from a trex box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackExtends {
    pub track_id: u32,
    pub default_sample_description_index: u32,
    pub default_sample_duration: u32,
    pub default_sample_size: u32,
    pub default_sample_flags: u32,
}

/// Samples of one track carried by a single moof.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRun {
    pub track_id: u32,
    pub samples: Vec<SampleRecord>,
}

/// A parsed movie fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub sequence_number: u32,
    pub runs: Vec<TrackRun>,
}

impl Fragment {
    /// Samples of the given track in decode order.
    pub fn samples_for(&self, track_id: u32) -> impl Iterator<Item = &SampleRecord> {
        self.runs
            .iter()
            .filter(move |run| run.track_id == track_id)
            .flat_map(|run| run.samples.iter())
    }
}

fn truncated(name: &str) -> ExtractorError {
    ExtractorError::parse(format!("{} box truncated", name))
}

/// Parse mvex: trex defaults plus the optional mehd fragment duration.
pub fn parse_mvex(mvex: &[u8]) -> ExtractorResult<(Vec<TrackExtends>, Option<u64>)> {
    let mut extends = Vec::new();
    for trex in find_boxes(mvex, "trex") {
        let mut pos = 0;
        read_version_and_flags(trex, &mut pos).ok_or_else(|| truncated("trex"))?;
        let mut field = || read_u32(trex, &mut pos).ok_or_else(|| truncated("trex"));
        extends.push(TrackExtends {
            track_id: field()?,
            default_sample_description_index: field()?,
            default_sample_duration: field()?,
            default_sample_size: field()?,
            default_sample_flags: field()?,
        });
    }

    let fragment_duration = match find_box(mvex, "mehd") {
        Some(mehd) => {
            let mut pos = 0;
            let (version, _) =
                read_version_and_flags(mehd, &mut pos).ok_or_else(|| truncated("mehd"))?;
            let duration = if version == 1 {
                read_u64(mehd, &mut pos)
            } else {
                read_u32(mehd, &mut pos).map(u64::from)
            };
            Some(duration.ok_or_else(|| truncated("mehd"))?)
        }
        None => None,
    };

    Ok((extends, fragment_duration))
}

/// Parse a moof payload located at `moof_offset` in the file.
///
/// `next_dts` yields the decode time a track continues from when its traf
/// carries no tfdt; it is updated with the end of every parsed run.
pub fn parse_moof(
    moof: &[u8],
    moof_offset: u64,
    extends: &[TrackExtends],
    next_dts: &mut dyn FnMut(u32) -> i64,
) -> ExtractorResult<Fragment> {
    let mfhd = find_box(moof, "mfhd").ok_or_else(|| ExtractorError::parse("moof without mfhd"))?;
    let mut pos = 4;
    let sequence_number = read_u32(mfhd, &mut pos).ok_or_else(|| truncated("mfhd"))?;

    let mut runs = Vec::new();
    for traf in find_boxes(moof, "traf") {
        runs.push(parse_traf(
            traf,
            moof_offset,
            sequence_number,
            extends,
            next_dts,
        )?);
    }

    Ok(Fragment {
        sequence_number,
        runs,
    })
}

struct FragmentDefaults {
    base_data_offset: u64,
    duration: u32,
    size: u32,
    flags: u32,
}

fn parse_tfhd(
    tfhd: &[u8],
    moof_offset: u64,
    extends: &[TrackExtends],
) -> ExtractorResult<(u32, FragmentDefaults)> {
    let mut pos = 0;
    let (_, flags) = read_version_and_flags(tfhd, &mut pos).ok_or_else(|| truncated("tfhd"))?;
    let track_id = read_u32(tfhd, &mut pos).ok_or_else(|| truncated("tfhd"))?;
    let trex = extends
        .iter()
        .find(|t| t.track_id == track_id)
        .cloned()
        .unwrap_or_default();

    // Without an explicit base offset, data offsets are relative to the moof.
    let mut defaults = FragmentDefaults {
        base_data_offset: moof_offset,
        duration: trex.default_sample_duration,
        size: trex.default_sample_size,
        flags: trex.default_sample_flags,
    };
    if flags & TFHD_BASE_DATA_OFFSET != 0 {
        defaults.base_data_offset = read_u64(tfhd, &mut pos).ok_or_else(|| truncated("tfhd"))?;
    }
    if flags & TFHD_SAMPLE_DESCRIPTION_INDEX != 0 {
        read_u32(tfhd, &mut pos).ok_or_else(|| truncated("tfhd"))?;
    }
    if flags & TFHD_DEFAULT_SAMPLE_DURATION != 0 {
        defaults.duration = read_u32(tfhd, &mut pos).ok_or_else(|| truncated("tfhd"))?;
    }
    if flags & TFHD_DEFAULT_SAMPLE_SIZE != 0 {
        defaults.size = read_u32(tfhd, &mut pos).ok_or_else(|| truncated("tfhd"))?;
    }
    if flags & TFHD_DEFAULT_SAMPLE_FLAGS != 0 {
        defaults.flags = read_u32(tfhd, &mut pos).ok_or_else(|| truncated("tfhd"))?;
    }
    Ok((track_id, defaults))
}

fn parse_traf(
    traf: &[u8],
    moof_offset: u64,
    sequence_number: u32,
    extends: &[TrackExtends],
    next_dts: &mut dyn FnMut(u32) -> i64,
) -> ExtractorResult<TrackRun> {
    let tfhd = find_box(traf, "tfhd").ok_or_else(|| ExtractorError::parse("traf without tfhd"))?;
    let (track_id, defaults) = parse_tfhd(tfhd, moof_offset, extends)?;

    let mut dts = match find_box(traf, "tfdt") {
        Some(tfdt) => {
            let mut pos = 0;
            let (version, _) =
                read_version_and_flags(tfdt, &mut pos).ok_or_else(|| truncated("tfdt"))?;
            let time = if version == 1 {
                read_u64(tfdt, &mut pos)
            } else {
                read_u32(tfdt, &mut pos).map(u64::from)
            };
            time.ok_or_else(|| truncated("tfdt"))? as i64
        }
        None => next_dts(track_id),
    };

    let mut samples = Vec::new();
    let mut data_cursor = defaults.base_data_offset;
    for trun in find_boxes(traf, "trun") {
        let mut pos = 0;
        let (_, flags) =
            read_version_and_flags(trun, &mut pos).ok_or_else(|| truncated("trun"))?;
        let sample_count = read_u32(trun, &mut pos).ok_or_else(|| truncated("trun"))?;
        if flags & TRUN_DATA_OFFSET != 0 {
            let data_offset = read_i32(trun, &mut pos).ok_or_else(|| truncated("trun"))?;
            data_cursor = defaults
                .base_data_offset
                .checked_add_signed(data_offset as i64)
                .ok_or_else(|| ExtractorError::parse("trun data offset out of range"))?;
        }
        let first_sample_flags = if flags & TRUN_FIRST_SAMPLE_FLAGS != 0 {
            Some(read_u32(trun, &mut pos).ok_or_else(|| truncated("trun"))?)
        } else {
            None
        };
        if sample_count as u64 > MAX_TRACK_SAMPLES {
            return Err(ExtractorError::parse(format!(
                "trun lists {} samples, more than the {} supported per run",
                sample_count, MAX_TRACK_SAMPLES
            )));
        }
        let per_sample = [
            TRUN_SAMPLE_DURATION,
            TRUN_SAMPLE_SIZE,
            TRUN_SAMPLE_FLAGS,
            TRUN_SAMPLE_COMPOSITION_TIME_OFFSET,
        ]
        .iter()
        .filter(|&&bit| flags & bit != 0)
        .count()
            * 4;
        if sample_count as usize * per_sample > trun.len() - pos {
            return Err(truncated("trun"));
        }

        for i in 0..sample_count {
            let mut field = |present: bool, default: u32| -> ExtractorResult<u32> {
                if present {
                    read_u32(trun, &mut pos).ok_or_else(|| truncated("trun"))
                } else {
                    Ok(default)
                }
            };
            let duration = field(flags & TRUN_SAMPLE_DURATION != 0, defaults.duration)?;
            let size = field(flags & TRUN_SAMPLE_SIZE != 0, defaults.size)?;
            let mut sample_flags = field(flags & TRUN_SAMPLE_FLAGS != 0, defaults.flags)?;
            let raw_offset = field(flags & TRUN_SAMPLE_COMPOSITION_TIME_OFFSET != 0, 0)?;
            if i == 0 {
                if let Some(first) = first_sample_flags {
                    sample_flags = first;
                }
            }
            // Version 0 offsets are unsigned on paper but negative values
            // show up in the wild, so both versions are read as signed.
            let composition_offset = raw_offset as i32;

            samples.push(SampleRecord {
                offset: data_cursor,
                size,
                dts,
                composition_offset,
                duration,
                is_sync: sample_flags & SAMPLE_IS_NON_SYNC == 0,
                group: sequence_number,
            });
            data_cursor += size as u64;
            dts += duration as i64;
        }
    }

    Ok(TrackRun { track_id, samples })
}
