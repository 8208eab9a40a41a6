use super::fragment::{parse_mvex, TrackExtends};
use super::mvhd::{parse_mvhd, MovieHeader};
use super::r#box::{find_box, require_box, BoxIter};
use super::trak::{parse_trak, Track, TrackDescriptor, TrackKind};
use crate::errors::{ExtractorError, ExtractorResult};
use log::debug;

/// Everything the moov box describes.
#[derive(Debug, Clone)]
pub struct Movie {
    pub header: MovieHeader,
    pub tracks: Vec<Track>,
    /// trex defaults; non-empty only for fragmented files.
    pub extends: Vec<TrackExtends>,
    /// mehd fragment duration in movie timescale ticks.
    pub fragment_duration: Option<u64>,
    fragmented: bool,
}

impl Movie {
    /// True when samples live in movie fragments rather than the stbl.
    pub fn is_fragmented(&self) -> bool {
        self.fragmented
    }

    pub fn track(&self, track_id: u32) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|track| track.descriptor.track_id == track_id)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.tracks.iter().map(|track| &track.descriptor)
    }

    pub fn video_tracks(&self) -> Vec<&Track> {
        self.tracks
            .iter()
            .filter(|track| track.descriptor.kind == TrackKind::Video)
            .collect()
    }
}

/// Parse a complete moov payload.
pub fn parse_moov(moov: &[u8]) -> ExtractorResult<Movie> {
    let header = parse_mvhd(require_box(moov, "mvhd", "moov")?)?;

    let mut tracks = Vec::new();
    let mut children = BoxIter::new(moov);
    for (child, payload) in children.by_ref() {
        if &child.name == b"trak" {
            let track = parse_trak(payload)?;
            debug!(
                "track {}: {:?} {} {}x{} timescale={} samples={}",
                track.descriptor.track_id,
                track.descriptor.kind,
                track.descriptor.codec_identifier,
                track.descriptor.width,
                track.descriptor.height,
                track.descriptor.timescale,
                track.samples.len()
            );
            tracks.push(track);
        }
    }
    if let Some(error) = children.error() {
        return Err(ExtractorError::parse(format!("moov: {}", error)));
    }

    let (extends, fragment_duration, fragmented) = match find_box(moov, "mvex") {
        Some(mvex) => {
            let (extends, duration) = parse_mvex(mvex)?;
            (extends, duration, true)
        }
        None => (Vec::new(), None, false),
    };

    Ok(Movie {
        header,
        tracks,
        extends,
        fragment_duration,
        fragmented,
    })
}
