use super::avcc::AvccConfig;
use super::mdhd::parse_mdhd;
use super::r#box::require_box;
use super::sample_table::{build_sample_table, SampleRecord};
use super::stsd::{find_config_box, parse_stsd};
use super::tkhd::parse_tkhd_track_id;
use crate::errors::{ExtractorError, ExtractorResult};

/// Track type from the hdlr handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl TrackKind {
    fn from_handler(handler_type: &[u8]) -> Self {
        match handler_type {
            b"vide" => TrackKind::Video,
            b"soun" => TrackKind::Audio,
            b"sbtl" | b"text" | b"subt" => TrackKind::Subtitle,
            _ => TrackKind::Other,
        }
    }
}

/// Immutable description of a track once the movie header is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub track_id: u32,
    pub kind: TrackKind,
    /// Codec string such as `avc1.64001f`, or the sample entry fourcc.
    pub codec_identifier: String,
    /// Fourcc of the first sample entry.
    pub sample_entry: String,
    pub width: u32,
    pub height: u32,
    pub timescale: u32,
    /// Media duration in timescale ticks; 0 when unknown.
    pub duration: u64,
    /// Raw stsd payload holding the sample entry and its configuration boxes.
    pub raw_configuration_bytes: Vec<u8>,
}

impl TrackDescriptor {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.duration as f64 / self.timescale as f64
    }
}

/// A track plus its progressive sample index (empty for fragmented files).
#[derive(Debug, Clone)]
pub struct Track {
    pub descriptor: TrackDescriptor,
    pub samples: Vec<SampleRecord>,
}

/// Parse a trak payload.
pub fn parse_trak(trak: &[u8]) -> ExtractorResult<Track> {
    let track_id = parse_tkhd_track_id(require_box(trak, "tkhd", "trak")?)?;
    let mdia = require_box(trak, "mdia", "trak")?;
    let (timescale, duration) = parse_mdhd(require_box(mdia, "mdhd", "mdia")?)?;

    let hdlr = require_box(mdia, "hdlr", "mdia")?;
    if hdlr.len() < 12 {
        return Err(ExtractorError::parse("hdlr box too small"));
    }
    let kind = TrackKind::from_handler(&hdlr[8..12]);

    let minf = require_box(mdia, "minf", "mdia")?;
    let stbl = require_box(minf, "stbl", "minf")?;
    let stsd = require_box(stbl, "stsd", "stbl")?;
    let entry = parse_stsd(stsd, kind == TrackKind::Video)?;

    let codec_identifier = match entry.fourcc.as_str() {
        "avc1" | "avc3" => find_config_box(stsd, "avcC")
            .and_then(|avcc| AvccConfig::parse(avcc).ok())
            .map(|config| config.codec_string(&entry.fourcc))
            .unwrap_or_else(|| entry.fourcc.clone()),
        _ => entry.fourcc.clone(),
    };

    let samples = build_sample_table(stbl)?;

    Ok(Track {
        descriptor: TrackDescriptor {
            track_id,
            kind,
            codec_identifier,
            sample_entry: entry.fourcc,
            width: entry.width,
            height: entry.height,
            timescale,
            duration,
            raw_configuration_bytes: stsd.to_vec(),
        },
        samples,
    })
}

#[cfg(test)]
#[path = "trak_test.rs"]
mod trak_test;
