#[cfg(test)]
use super::nalus::extract_nalus_from_bytestream;
use super::nalus::split_sample;

const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// Convert a bytestream with Annex B start codes to a sample using 4-byte lengths.
/// The conversion is performed in a new buffer which is returned.
#[cfg(test)]
pub fn convert_bytestream_to_nalu_sample(stream: &[u8]) -> Vec<u8> {
    let nalus = extract_nalus_from_bytestream(stream);
    let mut out = Vec::new();

    for nalu in nalus {
        let len = nalu.data.len() as u32;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&nalu.data);
    }

    out
}

/// Replace the length prefixes of a sample with start codes (Annex B).
///
/// Returns `None` when the sample is not valid length-prefixed data.
pub fn convert_sample_to_bytestream(sample: &[u8], length_size: u8) -> Option<Vec<u8>> {
    let nalus = split_sample(sample, length_size)?;
    let mut out = Vec::with_capacity(sample.len() + nalus.len() * 4);
    for nalu in nalus {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(nalu);
    }
    Some(out)
}

/// Prefix each parameter set with a start code.
pub fn parameter_sets_to_bytestream<'a>(sets: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    for set in sets {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(set);
    }
    out
}
