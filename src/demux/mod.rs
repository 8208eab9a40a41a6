pub mod demuxer;
pub mod types;

pub use demuxer::SampleDemuxer;
pub use types::{DemuxEvent, EncodedSample, TrackInfo};
