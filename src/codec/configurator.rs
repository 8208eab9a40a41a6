//! Builds the out-of-band decoder configuration for a track.

use crate::errors::{ExtractorError, ExtractorResult};
use crate::mp4::{AvccConfig, TrackDescriptor};
use log::debug;

/// Decoder configuration derived from a track's sample description.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecConfiguration {
    /// Codec string, e.g. `avc1.64001f`.
    pub codec: String,
    /// Sample entry fourcc the configuration was built from.
    pub sample_entry: String,
    pub coded_width: u32,
    pub coded_height: u32,
    /// Configuration record for decoders that need one before the first sample.
    pub description: Option<Vec<u8>>,
    /// Width of the NAL unit length prefix in samples (AVC/HEVC only).
    pub nal_length_size: u8,
}

impl CodecConfiguration {
    pub fn is_avc(&self) -> bool {
        matches!(self.sample_entry.as_str(), "avc1" | "avc3")
    }
}

pub struct CodecConfigurator;

impl CodecConfigurator {
    /// Build the configuration for `track` from its decoder configuration
    /// record, as returned by [`crate::mp4::BoxReader::decoder_configuration`].
    ///
    /// AVC tracks get a record rebuilt from the first SPS and PPS; a missing
    /// record or parameter set fails with `MissingCodecConfiguration`. Codecs
    /// without out-of-band configuration get `description: None`.
    pub fn build(
        track: &TrackDescriptor,
        record: Option<(&str, &[u8])>,
    ) -> ExtractorResult<CodecConfiguration> {
        let mut config = CodecConfiguration {
            codec: track.codec_identifier.clone(),
            sample_entry: track.sample_entry.clone(),
            coded_width: track.width,
            coded_height: track.height,
            description: None,
            nal_length_size: 4,
        };
        let record_named = |wanted: &str| {
            record
                .filter(|(name, _)| *name == wanted)
                .map(|(_, payload)| payload)
        };

        match track.sample_entry.as_str() {
            "avc1" | "avc3" => {
                let avcc = record_named("avcC").ok_or_else(|| {
                    ExtractorError::MissingCodecConfiguration(format!(
                        "track {} has no avcC box",
                        track.track_id
                    ))
                })?;
                let avcc = AvccConfig::parse(avcc).map_err(|e| {
                    ExtractorError::MissingCodecConfiguration(format!(
                        "track {} avcC unreadable: {}",
                        track.track_id, e
                    ))
                })?;
                config.nal_length_size = avcc.nal_length_size();
                config.description = Some(Self::assemble_avc_record(&avcc, track.track_id)?);
            }
            "hvc1" | "hev1" => {
                let hvcc = record_named("hvcC").ok_or_else(|| {
                    ExtractorError::MissingCodecConfiguration(format!(
                        "track {} has no hvcC box",
                        track.track_id
                    ))
                })?;
                // lengthSizeMinusOne sits in the low bits of byte 21.
                if let Some(byte) = hvcc.get(21) {
                    config.nal_length_size = (byte & 0x03) + 1;
                }
                config.description = Some(hvcc.to_vec());
            }
            "av01" => {
                config.description = record_named("av1C").map(|c| c.to_vec());
            }
            other => debug!("no out-of-band configuration for {}", other),
        }

        Ok(config)
    }

    /// Assemble `[version, profile, compatibility, level, 0xFC | lengthSizeMinusOne,
    /// 0xE0 | 1, sps_len, sps, 1, pps_len, pps]` from the record header and its
    /// first parameter sets.
    fn assemble_avc_record(avcc: &AvccConfig, track_id: u32) -> ExtractorResult<Vec<u8>> {
        let sps = avcc.get_first_sps().ok_or_else(|| {
            ExtractorError::MissingCodecConfiguration(format!(
                "track {} avcC carries no SPS",
                track_id
            ))
        })?;
        let pps = avcc.get_first_pps().ok_or_else(|| {
            ExtractorError::MissingCodecConfiguration(format!(
                "track {} avcC carries no PPS",
                track_id
            ))
        })?;

        let mut blob = Vec::with_capacity(11 + sps.len() + pps.len());
        blob.extend_from_slice(&[
            avcc.configuration_version,
            avcc.profile,
            avcc.compatibility,
            avcc.level,
            0xFC | avcc.length_size_minus_one,
            0xE0 | 1,
        ]);
        blob.extend_from_slice(&(sps.len() as u16).to_be_bytes());
        blob.extend_from_slice(sps);
        blob.push(1);
        blob.extend_from_slice(&(pps.len() as u16).to_be_bytes());
        blob.extend_from_slice(pps);
        Ok(blob)
    }
}
