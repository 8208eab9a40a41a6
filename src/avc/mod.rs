pub mod annexb;
pub mod nalus;

pub mod avc_type;

#[cfg(test)]
pub use annexb::convert_bytestream_to_nalu_sample;
pub use annexb::{convert_sample_to_bytestream, parameter_sets_to_bytestream};
pub use avc_type::NaluType;
pub use nalus::{has_parameter_sets, split_sample};
