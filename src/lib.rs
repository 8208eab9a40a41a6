pub mod bits;

pub mod mp4;
pub use mp4::{AvccConfig, BoxReader, TrackDescriptor, TrackKind};

pub mod avc;
pub use avc::NaluType;

pub mod codec;
pub use codec::{CodecConfiguration, CodecConfigurator};

pub mod demux;
pub use demux::{DemuxEvent, EncodedSample, SampleDemuxer, TrackInfo};

pub mod decoder;
pub use decoder::{DecodeEngine, DecodedPicture, DecoderAdapter, OpenH264Engine, PictureLedger};

pub mod extractor;
pub use extractor::{
    spawn_service, DeliveredFrame, ExtractorConfig, ExtractorHandle, ExtractorState,
    ExtractorWorker, FrameExtractor,
};

pub mod render;
pub use render::{DataUriFrame, DataUriSurface, NullSurface, RenderSurface};

pub mod streams;
pub use streams::{ByteSource, FileSource, HttpSource, MemorySource, PrefetchSource};

pub mod diagnostics;
pub use diagnostics::DiagnosticLog;

pub mod errors;
pub use errors::{ExtractorError, ExtractorResult, StreamError};

/// Open `source` as a byte source: `http://` and `https://` URLs are
/// streamed over HTTP, anything else is read as a local file. The source is
/// read ahead on a background task through a bounded channel.
pub async fn open_source(
    source: &str,
    config: &ExtractorConfig,
) -> ExtractorResult<Box<dyn ByteSource>> {
    let inner: Box<dyn ByteSource> =
        if source.starts_with("http://") || source.starts_with("https://") {
            Box::new(HttpSource::new(source.to_string(), config.http_timeout_secs).await?)
        } else {
            Box::new(FileSource::open(source).await?)
        };
    Ok(Box::new(PrefetchSource::spawn(
        inner,
        config.max_pending_chunks,
    )))
}

/// Open `source` and return an initialized extractor decoding with openh264.
pub async fn open(
    source: &str,
    config: ExtractorConfig,
    surface: Box<dyn RenderSurface>,
) -> ExtractorResult<FrameExtractor> {
    config.validate()?;
    let bytes = open_source(source, &config).await?;
    let mut extractor =
        FrameExtractor::new(bytes, Box::new(OpenH264Engine::new()), surface, config)?;
    extractor.initialize().await?;
    Ok(extractor)
}
