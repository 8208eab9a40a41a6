//! Software H.264 engine backed by the `openh264` crate.

use super::engine::{DecodeEngine, FrameSink};
use crate::avc::{convert_sample_to_bytestream, has_parameter_sets, parameter_sets_to_bytestream};
use crate::codec::CodecConfiguration;
use crate::demux::EncodedSample;
use crate::errors::{ExtractorError, ExtractorResult};
use crate::mp4::AvccConfig;
use async_trait::async_trait;
use log::{debug, warn};
use openh264::decoder::{DecodedYUV, Decoder};
use openh264::formats::YUVSource;

struct RgbFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

fn to_rgb(yuv: &DecodedYUV<'_>) -> RgbFrame {
    let (width, height) = yuv.dimensions();
    let mut pixels = vec![0u8; yuv.rgb8_len()];
    yuv.write_rgb8(&mut pixels);
    RgbFrame {
        width: width as u32,
        height: height as u32,
        pixels,
    }
}

/// openh264 does not hand timestamps back, so each output picture takes the
/// smallest presentation timestamp still outstanding.
#[derive(Default)]
pub struct OpenH264Engine {
    decoder: Option<Decoder>,
    sink: Option<FrameSink>,
    /// Annex B SPS/PPS prepended to key frames.
    parameter_sets: Vec<u8>,
    nal_length_size: u8,
    outstanding: Vec<i64>,
}

impl OpenH264Engine {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, frame: RgbFrame) {
        let Some(index) = self
            .outstanding
            .iter()
            .enumerate()
            .min_by_key(|(_, pts)| **pts)
            .map(|(i, _)| i)
        else {
            warn!("openh264 produced a picture with no outstanding sample");
            return;
        };
        let pts = self.outstanding.swap_remove(index);
        if let Some(sink) = &self.sink {
            sink.emit(pts, frame.width, frame.height, frame.pixels);
        }
    }
}

#[async_trait(?Send)]
impl DecodeEngine for OpenH264Engine {
    fn name(&self) -> &str {
        "openh264"
    }

    async fn is_config_supported(&self, config: &CodecConfiguration) -> bool {
        config.is_avc() && config.description.is_some()
    }

    async fn configure(
        &mut self,
        config: &CodecConfiguration,
        sink: FrameSink,
    ) -> ExtractorResult<()> {
        let description = config
            .description
            .as_deref()
            .ok_or_else(|| ExtractorError::MissingCodecConfiguration(config.codec.clone()))?;
        let record = AvccConfig::parse(description)?;
        self.parameter_sets = parameter_sets_to_bytestream(
            record
                .sps
                .iter()
                .chain(record.pps.iter())
                .map(|set| set.as_slice()),
        );
        self.nal_length_size = record.nal_length_size();

        let mut decoder = Decoder::new()
            .map_err(|e| ExtractorError::DecoderFault(format!("Failed to create decoder: {}", e)))?;
        decoder.decode(&self.parameter_sets).map_err(|e| {
            ExtractorError::DecoderFault(format!("Failed to initialize decoder: {}", e))
        })?;
        self.decoder = Some(decoder);
        self.sink = Some(sink);
        self.outstanding.clear();
        Ok(())
    }

    async fn decode(&mut self, sample: &EncodedSample) -> ExtractorResult<()> {
        let mut data = convert_sample_to_bytestream(&sample.payload, self.nal_length_size)
            .ok_or_else(|| {
                ExtractorError::DecoderFault(format!(
                    "malformed sample at dts {}",
                    sample.decode_timestamp
                ))
            })?;
        // avc3 key frames carry their own parameter sets.
        if sample.is_key_frame && !has_parameter_sets(&sample.payload, self.nal_length_size) {
            let mut with_sets = self.parameter_sets.clone();
            with_sets.append(&mut data);
            data = with_sets;
        }

        let decoder = self
            .decoder
            .as_mut()
            .ok_or(ExtractorError::NotConfigured)?;
        self.outstanding.push(sample.presentation_timestamp);
        let frame = decoder
            .decode(&data)
            .map_err(|e| ExtractorError::DecoderFault(format!("H.264 decoding failed: {}", e)))?
            .map(|yuv| to_rgb(&yuv));
        if let Some(frame) = frame {
            self.emit(frame);
        }
        Ok(())
    }

    async fn flush(&mut self) -> ExtractorResult<()> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(ExtractorError::NotConfigured);
        };
        let frames: Vec<RgbFrame> = decoder
            .flush_remaining()
            .map_err(|e| ExtractorError::DecoderFault(format!("H.264 flush failed: {}", e)))?
            .iter()
            .map(to_rgb)
            .collect();
        for frame in frames {
            self.emit(frame);
        }
        if !self.outstanding.is_empty() {
            debug!(
                "openh264 skipped {} samples without output",
                self.outstanding.len()
            );
            self.outstanding.clear();
        }
        Ok(())
    }

    fn close(&mut self) {
        self.decoder = None;
        self.sink = None;
        self.outstanding.clear();
    }
}
