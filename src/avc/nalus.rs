use super::avc_type::NaluType;

/// Represents a NAL unit with its type and data
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct Nalu {
    pub nalu_type: NaluType,
    pub data: Vec<u8>,
}

#[cfg(test)]
impl Nalu {
    /// Create a NALU from raw data
    pub fn new(data: Vec<u8>) -> Option<Self> {
        let nalu_type = NaluType::from_header_byte(*data.first()?);
        Some(Nalu { nalu_type, data })
    }
}

/// Split a length-prefixed sample into NAL unit slices.
///
/// `length_size` is the prefix width from the decoder configuration (1, 2
/// or 4). Returns `None` if a prefix overruns the sample.
pub fn split_sample(sample: &[u8], length_size: u8) -> Option<Vec<&[u8]>> {
    let width = length_size as usize;
    if !(1..=4).contains(&width) {
        return None;
    }
    let mut pos = 0usize;
    let mut nalus = Vec::new();
    while pos < sample.len() {
        let prefix = sample.get(pos..pos + width)?;
        let len = prefix
            .iter()
            .fold(0usize, |acc, &byte| (acc << 8) | byte as usize);
        pos += width;
        let nalu = sample.get(pos..pos + len)?;
        if !nalu.is_empty() {
            nalus.push(nalu);
        }
        pos += len;
    }
    Some(nalus)
}

/// True when a length-prefixed sample carries its own SPS or PPS, as
/// `avc3` key frames do.
pub fn has_parameter_sets(sample: &[u8], length_size: u8) -> bool {
    split_sample(sample, length_size).is_some_and(|nalus| {
        nalus
            .iter()
            .any(|nalu| NaluType::from_header_byte(nalu[0]).is_parameter_set())
    })
}

/// Extract NAL units from a bytestream with Annex B start codes.
/// Returns a vector of Nalu structs with type information.
#[cfg(test)]
pub fn extract_nalus_from_bytestream(stream: &[u8]) -> Vec<Nalu> {
    let mut nalus = Vec::new();
    let mut pos = 0usize;
    let mut curr_start: Option<usize> = None;

    let push = |start: usize, end: usize, nalus: &mut Vec<Nalu>| {
        let mut end = end;
        while end > start && stream[end - 1] == 0 {
            end -= 1;
        }
        if let Some(nalu) = Nalu::new(stream[start..end].to_vec()) {
            nalus.push(nalu);
        }
    };

    while pos + 3 <= stream.len() {
        let code_len = if pos + 4 <= stream.len() && stream[pos..pos + 4] == [0, 0, 0, 1] {
            4
        } else if stream[pos..pos + 3] == [0, 0, 1] {
            3
        } else {
            pos += 1;
            continue;
        };
        if let Some(s) = curr_start {
            push(s, pos, &mut nalus);
        }
        curr_start = Some(pos + code_len);
        pos += code_len;
    }

    if let Some(s) = curr_start {
        push(s, stream.len(), &mut nalus);
    }
    nalus
}
