//! A module for parsing AVCConfigurationBox (avcC) data.
//! Parses SPS and PPS NAL units for H.264 streams in AVCC format.

use crate::errors::{ExtractorError, ExtractorResult};

/// Represents the parsed AVCDecoderConfigurationRecord (avcC) configuration.
#[derive(Debug, Clone)]
pub struct AvccConfig {
    /// configurationVersion
    pub configuration_version: u8,
    /// AVCProfileIndication
    pub profile: u8,
    /// profileCompatibility
    pub compatibility: u8,
    /// AVCLevelIndication
    pub level: u8,
    /// lengthSizeMinusOne
    pub length_size_minus_one: u8,
    /// Sequence Parameter Sets
    pub sps: Vec<Vec<u8>>,
    /// Picture Parameter Sets
    pub pps: Vec<Vec<u8>>,
}

impl AvccConfig {
    /// Parse AVCDecoderConfigurationRecord as defined in ISO/IEC 14496-15.
    ///
    /// data: full contents of the avcC box (excluding header).
    pub fn parse(data: &[u8]) -> ExtractorResult<Self> {
        let mut pos = 0;
        if data.len() < 7 {
            return Err(ExtractorError::parse("avcC data too short"));
        }
        // configurationVersion
        let configuration_version = data[pos];
        pos += 1;
        // AVCProfileIndication
        let profile = data[pos];
        pos += 1;
        // profileCompatibility
        let compatibility = data[pos];
        pos += 1;
        // AVCLevelIndication
        let level = data[pos];
        pos += 1;
        // lengthSizeMinusOne: 6 bits reserved + 2 bits
        let length_size_minus_one = data[pos] & 0x03;
        pos += 1;
        // numOfSequenceParameterSets: 3 bits reserved + 5 bits count
        let num_sps = data[pos] & 0x1F;
        pos += 1;
        let sps = read_parameter_sets(data, &mut pos, num_sps as usize, "SPS")?;
        // numOfPictureParameterSets
        if pos >= data.len() {
            return Err(ExtractorError::parse(
                "Unexpected EOF while reading PPS count",
            ));
        }
        let num_pps = data[pos];
        pos += 1;
        let pps = read_parameter_sets(data, &mut pos, num_pps as usize, "PPS")?;
        Ok(AvccConfig {
            configuration_version,
            profile,
            compatibility,
            level,
            length_size_minus_one,
            sps,
            pps,
        })
    }

    /// Get the first SPS for profile/level analysis
    pub fn get_first_sps(&self) -> Option<&[u8]> {
        self.sps.first().map(|sps| sps.as_slice())
    }

    /// Get the first PPS for analysis
    pub fn get_first_pps(&self) -> Option<&[u8]> {
        self.pps.first().map(|pps| pps.as_slice())
    }

    /// Check if configuration is valid
    pub fn is_valid(&self) -> bool {
        !self.sps.is_empty() && !self.pps.is_empty()
    }

    /// Size in bytes of the NAL unit length prefix used by samples.
    pub fn nal_length_size(&self) -> u8 {
        self.length_size_minus_one + 1
    }

    /// RFC 6381 codec string, e.g. `avc1.4d401e`.
    pub fn codec_string(&self, fourcc: &str) -> String {
        format!(
            "{}.{:02x}{:02x}{:02x}",
            fourcc, self.profile, self.compatibility, self.level
        )
    }
}

fn read_parameter_sets(
    data: &[u8],
    pos: &mut usize,
    count: usize,
    kind: &str,
) -> ExtractorResult<Vec<Vec<u8>>> {
    let mut sets = Vec::with_capacity(count);
    for _ in 0..count {
        if *pos + 2 > data.len() {
            return Err(ExtractorError::parse(format!(
                "Unexpected EOF while reading {} length",
                kind
            )));
        }
        let len = u16::from_be_bytes([data[*pos], data[*pos + 1]]) as usize;
        *pos += 2;
        if *pos + len > data.len() {
            return Err(ExtractorError::parse(format!(
                "Unexpected EOF while reading {} data",
                kind
            )));
        }
        sets.push(data[*pos..*pos + len].to_vec());
        *pos += len;
    }
    Ok(sets)
}
