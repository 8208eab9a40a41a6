//! Shared fixtures: a synthetic MP4 writer and a scripted decode engine.
#![allow(dead_code)]

use async_trait::async_trait;
use frameseek::decoder::FrameSink;
use frameseek::{
    CodecConfiguration, DecodeEngine, EncodedSample, ExtractorConfig, ExtractorError,
    ExtractorResult, FrameExtractor, MemorySource, NullSurface, RenderSurface,
};
use std::cell::RefCell;
use std::rc::Rc;

pub const SPS: [u8; 8] = [0x67, 0x42, 0xc0, 0x1e, 0xd9, 0x00, 0xa0, 0x47];
pub const PPS: [u8; 4] = [0x68, 0xce, 0x3c, 0x80];

pub fn make_box(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 8);
    buf.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn words(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// One coded picture of a synthetic stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSpec {
    pub composition_offset: i32,
    pub key: bool,
}

/// Description of a synthetic movie. Samples have a constant duration and
/// are listed in decode order.
#[derive(Debug, Clone)]
pub struct MovieSpec {
    pub timescale: u32,
    pub sample_duration: u32,
    pub frames: Vec<FrameSpec>,
    pub samples_per_chunk: usize,
    pub video_tracks: usize,
    pub audio_track: bool,
    pub with_avcc: bool,
    /// Fragmented output declares its duration in an `mehd` box.
    pub with_mehd: bool,
    pub sample_entry: &'static str,
    pub width: u16,
    pub height: u16,
}

impl MovieSpec {
    /// `count` frames with a key frame every `gop` frames and no reordering.
    pub fn linear(count: usize, gop: usize, timescale: u32, sample_duration: u32) -> Self {
        let frames = (0..count)
            .map(|i| FrameSpec {
                composition_offset: 0,
                key: i % gop == 0,
            })
            .collect();
        Self::with_frames(frames, timescale, sample_duration)
    }

    /// I P B B style reordering: every group of four after a key frame is
    /// coded as `P B B` with the P presented last.
    pub fn reordered(count: usize, gop: usize, timescale: u32, sample_duration: u32) -> Self {
        let d = sample_duration as i32;
        let mut frames = Vec::with_capacity(count);
        let mut i = 0;
        while i < count {
            let in_gop = i % gop;
            if in_gop == 0 {
                frames.push(FrameSpec {
                    composition_offset: d,
                    key: true,
                });
                i += 1;
            } else if i + 3 <= count && in_gop + 3 <= gop {
                // decode: P(i+2) B(i) B(i+1) shifted by one tick of delay
                frames.push(FrameSpec {
                    composition_offset: 3 * d,
                    key: false,
                });
                frames.push(FrameSpec {
                    composition_offset: 0,
                    key: false,
                });
                frames.push(FrameSpec {
                    composition_offset: 0,
                    key: false,
                });
                i += 3;
            } else {
                frames.push(FrameSpec {
                    composition_offset: d,
                    key: false,
                });
                i += 1;
            }
        }
        Self::with_frames(frames, timescale, sample_duration)
    }

    pub fn with_frames(frames: Vec<FrameSpec>, timescale: u32, sample_duration: u32) -> Self {
        Self {
            timescale,
            sample_duration,
            frames,
            samples_per_chunk: 5,
            video_tracks: 1,
            audio_track: false,
            with_avcc: true,
            with_mehd: true,
            sample_entry: "avc1",
            width: 64,
            height: 48,
        }
    }

    pub fn duration_ticks(&self) -> u64 {
        self.frames.len() as u64 * self.sample_duration as u64
    }

    pub fn dts(&self, index: usize) -> i64 {
        index as i64 * self.sample_duration as i64
    }

    pub fn pts(&self, index: usize) -> i64 {
        self.dts(index) + self.frames[index].composition_offset as i64
    }

    /// Presentation timestamps sorted ascending.
    pub fn presentation_order(&self) -> Vec<i64> {
        let mut pts: Vec<i64> = (0..self.frames.len()).map(|i| self.pts(i)).collect();
        pts.sort_unstable();
        pts
    }

    /// Payload of sample `index`: a 4 byte length prefix and a fake slice NAL.
    pub fn payload(&self, index: usize) -> Vec<u8> {
        let nal_type = if self.frames[index].key { 0x65 } else { 0x41 };
        let mut nal = vec![nal_type];
        nal.extend_from_slice(&(index as u32).to_be_bytes());
        let mut out = (nal.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(&nal);
        out
    }

    fn avcc(&self) -> Vec<u8> {
        let mut record = vec![1, SPS[1], SPS[2], SPS[3], 0xff, 0xe1];
        record.extend_from_slice(&(SPS.len() as u16).to_be_bytes());
        record.extend_from_slice(&SPS);
        record.push(1);
        record.extend_from_slice(&(PPS.len() as u16).to_be_bytes());
        record.extend_from_slice(&PPS);
        make_box("avcC", &record)
    }

    fn stsd(&self, fourcc: &str, visual: bool) -> Vec<u8> {
        let mut entry = vec![0u8; if visual { 78 } else { 28 }];
        entry[7] = 1;
        if visual {
            entry[24..26].copy_from_slice(&self.width.to_be_bytes());
            entry[26..28].copy_from_slice(&self.height.to_be_bytes());
            if self.with_avcc {
                entry.extend_from_slice(&self.avcc());
            }
        }
        let mut payload = words(&[0, 1]);
        payload.extend_from_slice(&make_box(fourcc, &entry));
        make_box("stsd", &payload)
    }

    fn progressive_stbl(&self, fourcc: &str, visual: bool, chunk_offsets: &[u32]) -> Vec<u8> {
        let n = self.frames.len() as u32;
        let sizes: Vec<u32> = (0..self.frames.len())
            .map(|i| self.payload(i).len() as u32)
            .collect();

        let mut ctts = words(&[0, n]);
        for frame in &self.frames {
            ctts.extend_from_slice(&words(&[1, frame.composition_offset as u32]));
        }
        let keys: Vec<u32> = (0..self.frames.len())
            .filter(|&i| self.frames[i].key)
            .map(|i| i as u32 + 1)
            .collect();
        let mut stss = words(&[0, keys.len() as u32]);
        stss.extend_from_slice(&words(&keys));
        let mut stsz = words(&[0, 0, n]);
        stsz.extend_from_slice(&words(&sizes));
        let mut stco = words(&[0, chunk_offsets.len() as u32]);
        stco.extend_from_slice(&words(chunk_offsets));

        make_box(
            "stbl",
            &[
                self.stsd(fourcc, visual),
                make_box("stts", &words(&[0, 1, n, self.sample_duration])),
                make_box("ctts", &ctts),
                make_box("stss", &stss),
                make_box("stsc", &words(&[0, 1, 1, self.samples_per_chunk as u32, 1])),
                make_box("stsz", &stsz),
                make_box("stco", &stco),
            ]
            .concat(),
        )
    }

    fn empty_stbl(&self, fourcc: &str, visual: bool) -> Vec<u8> {
        make_box(
            "stbl",
            &[
                self.stsd(fourcc, visual),
                make_box("stts", &words(&[0, 0])),
                make_box("stsc", &words(&[0, 0])),
                make_box("stsz", &words(&[0, 0, 0])),
                make_box("stco", &words(&[0, 0])),
            ]
            .concat(),
        )
    }

    fn trak(&self, track_id: u32, handler: &[u8; 4], duration: u32, stbl: Vec<u8>) -> Vec<u8> {
        let tkhd = make_box("tkhd", &words(&[0, 0, 0, track_id, 0, 0]));
        let mdhd = make_box("mdhd", &words(&[0, 0, 0, self.timescale, duration, 0x55c40000]));
        let mut hdlr = words(&[0, 0]);
        hdlr.extend_from_slice(handler);
        hdlr.extend_from_slice(&[0; 13]);
        let minf = make_box("minf", &stbl);
        let mdia = make_box("mdia", &[mdhd, make_box("hdlr", &hdlr), minf].concat());
        make_box("trak", &[tkhd, mdia].concat())
    }

    fn mvhd(&self, duration: u32) -> Vec<u8> {
        let mut payload = words(&[0, 0, 0, self.timescale, duration]);
        payload.extend_from_slice(&[0; 80]);
        make_box("mvhd", &payload)
    }

    fn chunk_count(&self) -> usize {
        self.frames.len().div_ceil(self.samples_per_chunk.max(1))
    }

    fn progressive_moov(&self, chunk_offsets: &[u32]) -> Vec<u8> {
        let duration = self.duration_ticks() as u32;
        let mut children = vec![self.mvhd(duration)];
        for t in 0..self.video_tracks {
            let stbl = self.progressive_stbl(self.sample_entry, true, chunk_offsets);
            children.push(self.trak(t as u32 + 1, b"vide", duration, stbl));
        }
        if self.audio_track {
            let stbl = self.empty_stbl("mp4a", false);
            children.push(self.trak(100, b"soun", 0, stbl));
        }
        make_box("moov", &children.concat())
    }

    /// ftyp, moov, then a single mdat holding every sample.
    pub fn progressive(&self) -> Vec<u8> {
        let ftyp = make_box("ftyp", b"isom\0\0\x02\0isomavc1");
        let placeholder = vec![0u32; self.chunk_count()];
        let moov_len = self.progressive_moov(&placeholder).len();
        let mdat_start = (ftyp.len() + moov_len + 8) as u32;

        let mut data = Vec::new();
        let mut offsets = Vec::new();
        for (i, _) in self.frames.iter().enumerate() {
            if i % self.samples_per_chunk.max(1) == 0 {
                offsets.push(mdat_start + data.len() as u32);
            }
            data.extend_from_slice(&self.payload(i));
        }
        [ftyp, self.progressive_moov(&offsets), make_box("mdat", &data)].concat()
    }

    /// ftyp, moov with mvex, then one moof + mdat pair per
    /// `samples_per_chunk` samples.
    pub fn fragmented(&self) -> Vec<u8> {
        let ftyp = make_box("ftyp", b"iso6\0\0\x02\0iso6avc1");
        let duration = self.duration_ticks() as u32;
        let trex = make_box("trex", &words(&[0, 1, 1, self.sample_duration, 0, 0x0001_0000]));
        let mvex = if self.with_mehd {
            [make_box("mehd", &words(&[0, duration])), trex].concat()
        } else {
            trex
        };
        let moov = make_box(
            "moov",
            &[
                self.mvhd(0),
                self.trak(1, b"vide", 0, self.empty_stbl(self.sample_entry, true)),
                make_box("mvex", &mvex),
            ]
            .concat(),
        );

        let mut out = [ftyp, moov].concat();
        let per = self.samples_per_chunk.max(1);
        for (seq, start) in (0..self.frames.len()).step_by(per).enumerate() {
            let end = (start + per).min(self.frames.len());
            out.extend_from_slice(&self.fragment(seq as u32 + 1, start, end));
        }
        out
    }

    fn fragment(&self, sequence: u32, start: usize, end: usize) -> Vec<u8> {
        let build_moof = |data_offset: u32| {
            // data offset, duration, size, flags, composition offset
            let trun_flags = 0x000001 | 0x000100 | 0x000200 | 0x000400 | 0x000800;
            let mut trun = words(&[trun_flags, (end - start) as u32, data_offset]);
            for i in start..end {
                let flags = if self.frames[i].key { 0x0200_0000 } else { 0x0001_0000 };
                trun.extend_from_slice(&words(&[
                    self.sample_duration,
                    self.payload(i).len() as u32,
                    flags,
                    self.frames[i].composition_offset as u32,
                ]));
            }
            let mut tfdt = words(&[0x0100_0000]);
            tfdt.extend_from_slice(&(self.dts(start) as u64).to_be_bytes());
            let traf = make_box(
                "traf",
                &[
                    make_box("tfhd", &words(&[0x020000, 1])),
                    make_box("tfdt", &tfdt),
                    make_box("trun", &trun),
                ]
                .concat(),
            );
            make_box("moof", &[make_box("mfhd", &words(&[0, sequence])), traf].concat())
        };
        let moof_len = build_moof(0).len() as u32;
        let moof = build_moof(moof_len + 8);
        let data: Vec<u8> = (start..end).flat_map(|i| self.payload(i)).collect();
        [moof, make_box("mdat", &data)].concat()
    }
}

/// What a [`ScriptedEngine`] saw, shared with the test.
#[derive(Debug, Default)]
pub struct EngineLog {
    /// Decode timestamps of every submitted sample, in submission order.
    pub submitted: Vec<i64>,
    pub flushes: usize,
    pub closed: bool,
}

/// Fake decode engine that reorders like a real one.
///
/// Pictures are held until more than `reorder_depth` are outstanding, then
/// the earliest is emitted. Delta samples without a preceding key frame and
/// samples at `fail_at_dts` are rejected.
pub struct ScriptedEngine {
    pub supported: bool,
    pub reorder_depth: usize,
    pub fail_at_dts: Option<i64>,
    pub log: Rc<RefCell<EngineLog>>,
    sink: Option<FrameSink>,
    held: Vec<i64>,
    has_reference: bool,
    size: (u32, u32),
}

impl ScriptedEngine {
    pub fn new(reorder_depth: usize) -> Self {
        Self {
            supported: true,
            reorder_depth,
            fail_at_dts: None,
            log: Rc::new(RefCell::new(EngineLog::default())),
            sink: None,
            held: Vec::new(),
            has_reference: false,
            size: (2, 2),
        }
    }

    fn emit_earliest(&mut self) {
        let Some((at, _)) = self.held.iter().enumerate().min_by_key(|(_, pts)| **pts) else {
            return;
        };
        let pts = self.held.remove(at);
        if let Some(sink) = &self.sink {
            let (w, h) = self.size;
            sink.emit(pts, w, h, vec![pts as u8; (w * h * 3) as usize]);
        }
    }
}

#[async_trait(?Send)]
impl DecodeEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn is_config_supported(&self, _config: &CodecConfiguration) -> bool {
        self.supported
    }

    async fn configure(
        &mut self,
        config: &CodecConfiguration,
        sink: FrameSink,
    ) -> ExtractorResult<()> {
        self.size = (config.coded_width.max(1), config.coded_height.max(1));
        self.sink = Some(sink);
        Ok(())
    }

    async fn decode(&mut self, sample: &EncodedSample) -> ExtractorResult<()> {
        self.log.borrow_mut().submitted.push(sample.decode_timestamp);
        if self.fail_at_dts == Some(sample.decode_timestamp) {
            return Err(ExtractorError::DecoderFault("corrupt slice".into()));
        }
        if sample.is_key_frame {
            self.has_reference = true;
        } else if !self.has_reference {
            return Err(ExtractorError::DecoderFault(format!(
                "delta sample at {} has no reference",
                sample.decode_timestamp
            )));
        }
        self.held.push(sample.presentation_timestamp);
        while self.held.len() > self.reorder_depth {
            self.emit_earliest();
        }
        Ok(())
    }

    async fn flush(&mut self) -> ExtractorResult<()> {
        self.log.borrow_mut().flushes += 1;
        while !self.held.is_empty() {
            self.emit_earliest();
        }
        Ok(())
    }

    fn close(&mut self) {
        self.log.borrow_mut().closed = true;
        self.sink = None;
        self.held.clear();
    }
}

/// An initialized extractor over `bytes` fed in `chunk_size` pieces.
pub async fn extractor_over(
    bytes: Vec<u8>,
    chunk_size: usize,
    engine: ScriptedEngine,
    surface: Box<dyn RenderSurface>,
    config: ExtractorConfig,
) -> ExtractorResult<FrameExtractor> {
    let source = MemorySource::new(bytes, chunk_size);
    let mut extractor = FrameExtractor::new(Box::new(source), Box::new(engine), surface, config)?;
    extractor.initialize().await?;
    Ok(extractor)
}

/// Shorthand for the common case: default config, null surface.
pub async fn simple_extractor(
    spec: &MovieSpec,
    chunk_size: usize,
    reorder_depth: usize,
) -> (FrameExtractor, Rc<RefCell<EngineLog>>) {
    let engine = ScriptedEngine::new(reorder_depth);
    let log = engine.log.clone();
    let extractor = extractor_over(
        spec.progressive(),
        chunk_size,
        engine,
        Box::new(NullSurface),
        ExtractorConfig::default(),
    )
    .await
    .expect("extractor initializes");
    (extractor, log)
}
