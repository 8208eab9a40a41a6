use crate::codec::CodecConfiguration;
use crate::mp4::TrackDescriptor;
use bytes::Bytes;

/// One compressed sample of the selected track, emitted in decode order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSample {
    /// Decode timestamp in track timescale ticks.
    pub decode_timestamp: i64,
    /// Presentation timestamp in track timescale ticks.
    pub presentation_timestamp: i64,
    pub duration: u32,
    pub is_key_frame: bool,
    pub payload: Bytes,
}

/// The selected video track, reported once the movie header is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub descriptor: TrackDescriptor,
    pub configuration: CodecConfiguration,
    /// Duration from the container header in seconds.
    pub duration_secs: f64,
    /// Sample count known up front; 0 for fragmented files.
    pub indexed_samples: usize,
    pub fragmented: bool,
}

impl TrackInfo {
    pub fn timescale(&self) -> u32 {
        self.descriptor.timescale
    }
}

/// Output of the demuxer.
#[derive(Debug, Clone, PartialEq)]
pub enum DemuxEvent {
    /// The track is selected and its decoder configuration built.
    Ready(TrackInfo),
    /// Samples of one chunk or fragment, in decode order.
    Samples(Vec<EncodedSample>),
}
