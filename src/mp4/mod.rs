pub mod r#box;
pub use r#box::{find_box, BoxHeader};
pub mod reader; // Incremental top-level box reader
pub use reader::BoxReader;
pub mod moov;
pub use moov::{parse_moov, Movie};
pub mod trak;
pub use trak::{Track, TrackDescriptor, TrackKind};
pub mod fragment;
pub use fragment::{Fragment, TrackExtends};
pub mod sample_table;
pub use sample_table::SampleRecord;
pub mod mdhd;
pub mod mvhd;
pub mod tkhd;
pub mod stco;
pub mod stsz;
pub mod stsc;
pub use stsc::SampleToChunkEntry;
pub mod stts;
pub use stts::SttsEntry;
pub mod ctts;
pub mod stss;
pub mod avcc;
pub use avcc::AvccConfig;
pub mod stsd;
