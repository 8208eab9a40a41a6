mod common;

use common::{extractor_over, MovieSpec, ScriptedEngine};
use frameseek::{
    ExtractorConfig, ExtractorError, ExtractorState, FrameExtractor, MemorySource, NullSurface,
};

async fn init(bytes: Vec<u8>, engine: ScriptedEngine) -> Result<FrameExtractor, ExtractorError> {
    extractor_over(
        bytes,
        128,
        engine,
        Box::new(NullSurface),
        ExtractorConfig::default(),
    )
    .await
}

#[tokio::test]
async fn test_no_video_track() {
    let mut spec = MovieSpec::linear(4, 2, 100, 10);
    spec.video_tracks = 0;
    spec.audio_track = true;
    let err = init(spec.progressive(), ScriptedEngine::new(0))
        .await
        .err()
        .expect("initialize fails");
    assert!(matches!(err, ExtractorError::NoVideoTrack));
}

#[tokio::test]
async fn test_two_video_tracks_rejected() {
    let mut spec = MovieSpec::linear(4, 2, 100, 10);
    spec.video_tracks = 2;
    let err = init(spec.progressive(), ScriptedEngine::new(0))
        .await
        .err()
        .expect("initialize fails");
    assert!(matches!(err, ExtractorError::UnsupportedMultiTrack(2)));
}

#[tokio::test]
async fn test_audio_track_alongside_video_is_ignored() {
    let mut spec = MovieSpec::linear(4, 2, 100, 10);
    spec.audio_track = true;
    let mut extractor = init(spec.progressive(), ScriptedEngine::new(0))
        .await
        .expect("initializes");
    assert_eq!(extractor.next().await.unwrap().map(|f| f.pts), Some(0));
}

#[tokio::test]
async fn test_missing_avcc_aborts_initialization() {
    let mut spec = MovieSpec::linear(4, 2, 100, 10);
    spec.with_avcc = false;
    let err = init(spec.progressive(), ScriptedEngine::new(0))
        .await
        .err()
        .expect("initialize fails");
    assert!(matches!(err, ExtractorError::MissingCodecConfiguration(_)));
}

#[tokio::test]
async fn test_unsupported_configuration_aborts_initialization() {
    let spec = MovieSpec::linear(4, 2, 100, 10);
    let mut engine = ScriptedEngine::new(0);
    engine.supported = false;
    let log = engine.log.clone();
    let err = init(spec.progressive(), engine)
        .await
        .err()
        .expect("initialize fails");
    assert!(matches!(err, ExtractorError::UnsupportedCodecConfiguration(_)));
    assert!(log.borrow().submitted.is_empty());
}

#[tokio::test]
async fn test_truncated_movie_header() {
    let spec = MovieSpec::linear(4, 2, 100, 10);
    let mut bytes = spec.progressive();
    // Cut inside the moov box.
    bytes.truncate(60);
    let err = init(bytes, ScriptedEngine::new(0))
        .await
        .err()
        .expect("initialize fails");
    assert!(matches!(err, ExtractorError::ContainerParse(_)));
}

#[tokio::test]
async fn test_failed_initialization_is_terminal() {
    let mut spec = MovieSpec::linear(4, 2, 100, 10);
    spec.with_avcc = false;
    let source = MemorySource::new(spec.progressive(), 256);
    let mut extractor = FrameExtractor::new(
        Box::new(source),
        Box::new(ScriptedEngine::new(0)),
        Box::new(NullSurface),
        ExtractorConfig::default(),
    )
    .unwrap();
    assert!(extractor.initialize().await.is_err());
    assert_eq!(extractor.state(), ExtractorState::Failed);
    assert!(extractor
        .diagnostics()
        .last_error()
        .unwrap_or_default()
        .contains("Missing codec configuration"));
    assert!(matches!(
        extractor.initialize().await,
        Err(ExtractorError::SessionEnded)
    ));
}

#[tokio::test]
async fn test_requests_before_initialize() {
    let spec = MovieSpec::linear(4, 2, 100, 10);
    let source = MemorySource::new(spec.progressive(), 256);
    let mut extractor = FrameExtractor::new(
        Box::new(source),
        Box::new(ScriptedEngine::new(0)),
        Box::new(NullSurface),
        ExtractorConfig::default(),
    )
    .unwrap();
    assert!(matches!(
        extractor.next().await,
        Err(ExtractorError::NotConfigured)
    ));
    assert!(matches!(
        extractor.seek(Some(0.0)).await,
        Err(ExtractorError::NotConfigured)
    ));
}

#[tokio::test]
async fn test_decoder_fault_ends_session() {
    let spec = MovieSpec::linear(40, 10, 100, 10);
    let mut engine = ScriptedEngine::new(1);
    engine.fail_at_dts = Some(spec.dts(13));
    let mut extractor = init(spec.progressive(), engine).await.unwrap();
    let ledger = extractor.ledger().clone();

    let mut delivered = Vec::new();
    let err = loop {
        match extractor.next().await {
            Ok(Some(frame)) => delivered.push(frame.pts),
            Ok(None) => panic!("stream ended without the injected fault"),
            Err(e) => break e,
        }
    };
    assert!(matches!(err, ExtractorError::DecoderFault(_)));
    assert!(delivered.len() <= 13);
    let expected: Vec<i64> = (0..delivered.len()).map(|i| spec.pts(i)).collect();
    assert_eq!(delivered, expected);
    assert_eq!(extractor.state(), ExtractorState::Failed);
    assert_eq!(ledger.outstanding(), 0);
    assert!(extractor
        .diagnostics()
        .last_error()
        .unwrap_or_default()
        .contains("corrupt slice"));

    assert!(matches!(
        extractor.next().await,
        Err(ExtractorError::SessionEnded)
    ));
    assert!(matches!(
        extractor.seek(Some(0.0)).await,
        Err(ExtractorError::SessionEnded)
    ));
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let spec = MovieSpec::linear(4, 2, 100, 10);
    let config = ExtractorConfig {
        decode_batch: 0,
        ..ExtractorConfig::default()
    };
    let result = FrameExtractor::new(
        Box::new(MemorySource::new(spec.progressive(), 256)),
        Box::new(ScriptedEngine::new(0)),
        Box::new(NullSurface),
        config,
    );
    assert!(result.is_err());
}
