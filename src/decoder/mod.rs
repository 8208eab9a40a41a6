pub mod adapter;
pub mod engine;
pub mod openh264_engine;
pub mod picture;

pub use adapter::DecoderAdapter;
pub use engine::{DecodeEngine, FrameSink};
pub use openh264_engine::OpenH264Engine;
pub use picture::{DecodedPicture, PictureLedger};
