mod common;

use common::{extractor_over, simple_extractor, MovieSpec, ScriptedEngine};
use frameseek::{ExtractorConfig, ExtractorState, NullSurface};

fn secs(ticks: i64, spec: &MovieSpec) -> f64 {
    ticks as f64 / spec.timescale as f64
}

/// Ten seconds at 60 fps, key frame every two seconds.
fn sixty_fps() -> MovieSpec {
    let mut spec = MovieSpec::linear(600, 120, 600, 10);
    spec.samples_per_chunk = 30;
    spec
}

#[tokio::test]
async fn test_initialize_reports_track() {
    let spec = sixty_fps();
    let (extractor, _) = simple_extractor(&spec, 4096, 0).await;
    let track = extractor.track().expect("track info");
    assert_eq!(track.descriptor.codec_identifier, "avc1.42c01e");
    assert_eq!((track.descriptor.width, track.descriptor.height), (64, 48));
    assert_eq!(track.timescale(), 600);
    assert!((track.duration_secs - 10.0).abs() < 1e-9);
    assert!(!track.fragmented);
    assert_eq!(extractor.state(), ExtractorState::Ready);
    assert!(extractor.diagnostics().lines()[0].contains("avc1.42c01e"));
}

#[tokio::test]
async fn test_sixty_advances_deliver_first_second_in_order() {
    let spec = sixty_fps();
    let (mut extractor, _) = simple_extractor(&spec, 1000, 0).await;
    for i in 0..60 {
        let frame = extractor.next().await.unwrap().expect("frame");
        assert_eq!(frame.pts, spec.pts(i));
        assert_eq!((frame.width, frame.height), (64, 48));
    }
    assert_eq!(extractor.watermark(), Some(secs(590, &spec)));
}

#[tokio::test]
async fn test_seek_replays_from_preceding_key_frame() {
    let spec = sixty_fps();
    let (mut extractor, log) = simple_extractor(&spec, 1000, 0).await;

    let frame = extractor.seek(Some(3.0)).await.unwrap().expect("frame");
    assert_eq!(frame.pts, 1800);
    assert!((frame.timestamp - 3.0).abs() < 1e-9);

    let submitted = log.borrow().submitted.clone();
    assert_eq!(submitted.first(), Some(&1200));
    assert_eq!(submitted.last(), Some(&1800));
    assert_eq!(submitted.len(), 61);

    // Sequential playback continues right after the target.
    let next = extractor.next().await.unwrap().expect("frame");
    assert_eq!(next.pts, 1810);
}

#[tokio::test]
async fn test_seek_back_to_start_rewinds_watermark() {
    let spec = sixty_fps();
    let (mut extractor, _) = simple_extractor(&spec, 1000, 0).await;
    let frame = extractor.seek(Some(5.0)).await.unwrap().expect("frame");
    assert_eq!(frame.pts, 3000);
    assert_eq!(extractor.watermark(), Some(5.0));

    let frame = extractor.seek(Some(0.0)).await.unwrap().expect("frame");
    assert_eq!(frame.pts, 0);
    assert_eq!(extractor.watermark(), Some(0.0));
    assert_eq!(extractor.next().await.unwrap().map(|f| f.pts), Some(10));
}

#[tokio::test]
async fn test_nearby_forward_seek_is_served_from_buffer() {
    let spec = sixty_fps();
    let (mut extractor, log) = simple_extractor(&spec, 1000, 0).await;
    let mut watermark = 0;
    for _ in 0..60 {
        watermark = extractor.next().await.unwrap().expect("frame").pts;
        if watermark >= 100 && extractor.pending_pictures() > 1 {
            break;
        }
    }
    assert!(extractor.pending_pictures() > 1);
    let before = log.borrow().submitted.len();

    let target = watermark + 10;
    let frame = extractor
        .seek(Some(secs(target, &spec)))
        .await
        .unwrap()
        .expect("frame");
    assert_eq!(frame.pts, target);
    assert_eq!(log.borrow().submitted.len(), before);
}

#[tokio::test]
async fn test_seek_between_frames_rounds_up() {
    let spec = sixty_fps();
    let (mut extractor, _) = simple_extractor(&spec, 1000, 0).await;
    // 2.005s lies between the pictures at 1200 and 1210 ticks.
    let frame = extractor.seek(Some(2.005)).await.unwrap().expect("frame");
    assert_eq!(frame.pts, 1210);
    // Exact hits count as a match.
    let frame = extractor.seek(Some(2.0)).await.unwrap().expect("frame");
    assert_eq!(frame.pts, 1200);
}

#[tokio::test]
async fn test_out_of_range_seeks_change_nothing() {
    let spec = sixty_fps();
    let (mut extractor, log) = simple_extractor(&spec, 1000, 0).await;
    for _ in 0..10 {
        extractor.next().await.unwrap();
    }
    let watermark = extractor.watermark();
    let pending = extractor.pending_pictures();
    let submitted = log.borrow().submitted.len();
    let acquired = extractor.ledger().acquired();

    for target in [None, Some(-1.0), Some(10.5), Some(f64::NAN), Some(f64::INFINITY)] {
        assert_eq!(extractor.seek(target).await.unwrap(), None);
    }

    assert_eq!(extractor.watermark(), watermark);
    assert_eq!(extractor.pending_pictures(), pending);
    assert_eq!(log.borrow().submitted.len(), submitted);
    assert_eq!(extractor.ledger().acquired(), acquired);
    assert_eq!(extractor.state(), ExtractorState::Ready);
}

#[tokio::test]
async fn test_seek_after_last_picture_is_a_no_op() {
    let spec = MovieSpec::linear(10, 5, 100, 10);
    let (mut extractor, _) = simple_extractor(&spec, 64, 0).await;
    // Duration is 1.0s but the last picture is presented at 0.9s.
    assert_eq!(extractor.seek(Some(0.95)).await.unwrap(), None);
    assert_eq!(extractor.watermark(), None);
    assert_eq!(extractor.seek(Some(0.9)).await.unwrap().map(|f| f.pts), Some(90));
}

#[tokio::test]
async fn test_reordered_stream_plays_in_presentation_order() {
    let spec = MovieSpec::reordered(40, 8, 1000, 40);
    let (mut extractor, _) = simple_extractor(&spec, 97, 2).await;
    let mut delivered = Vec::new();
    while let Some(frame) = extractor.next().await.unwrap() {
        delivered.push(frame.pts);
    }
    assert_eq!(delivered, spec.presentation_order());
    assert_eq!(extractor.next().await.unwrap(), None);
}

#[tokio::test]
async fn test_pending_capacity_of_one_still_plays_every_frame() {
    let spec = MovieSpec::reordered(16, 8, 1000, 40);
    let config = ExtractorConfig {
        max_pending_pictures: 1,
        decode_batch: 1,
        ..ExtractorConfig::default()
    };
    let mut extractor = extractor_over(
        spec.progressive(),
        97,
        ScriptedEngine::new(2),
        Box::new(NullSurface),
        config,
    )
    .await
    .unwrap();

    let mut delivered = Vec::new();
    while let Some(frame) = extractor.next().await.unwrap() {
        delivered.push(frame.pts);
    }
    assert_eq!(delivered, spec.presentation_order());
    assert_eq!(extractor.ledger().outstanding(), 0);
}

#[tokio::test]
async fn test_reordered_seek_finds_b_frame() {
    let spec = MovieSpec::reordered(40, 8, 1000, 40);
    let (mut extractor, log) = simple_extractor(&spec, 97, 2).await;
    // Presentation slot 10 is a B picture decoded after the P at slot 11.
    let target = spec.presentation_order()[10];
    let frame = extractor
        .seek(Some(target as f64 / 1000.0))
        .await
        .unwrap()
        .expect("frame");
    assert_eq!(frame.pts, target);
    // Replay began at the key frame of the second group of pictures.
    assert_eq!(log.borrow().submitted.first(), Some(&spec.dts(8)));
}

#[tokio::test]
async fn test_seek_frame_and_step_back() {
    let spec = MovieSpec::reordered(24, 6, 1000, 40);
    let (mut extractor, _) = simple_extractor(&spec, 50, 1).await;
    let order = spec.presentation_order();

    let frame = extractor.seek_frame(7).await.unwrap().expect("frame");
    assert_eq!(frame.pts, order[7]);

    let frame = extractor.step_back().await.unwrap().expect("frame");
    assert_eq!(frame.pts, order[6]);
    let frame = extractor.step_back().await.unwrap().expect("frame");
    assert_eq!(frame.pts, order[5]);

    assert_eq!(extractor.seek_frame(order.len()).await.unwrap(), None);
    assert_eq!(extractor.seek_frame(0).await.unwrap().map(|f| f.pts), Some(order[0]));
    assert_eq!(extractor.step_back().await.unwrap(), None);
}

#[tokio::test]
async fn test_every_picture_released_after_close() {
    let spec = MovieSpec::reordered(60, 12, 1000, 40);
    let (mut extractor, log) = simple_extractor(&spec, 33, 3).await;
    for _ in 0..7 {
        extractor.next().await.unwrap();
    }
    extractor.seek(Some(1.5)).await.unwrap();
    extractor.seek(Some(0.2)).await.unwrap();
    extractor.step_back().await.unwrap();
    for _ in 0..5 {
        extractor.next().await.unwrap();
    }
    let ledger = extractor.ledger().clone();
    assert!(ledger.acquired() > 0);

    extractor.close();
    extractor.close();
    assert_eq!(ledger.outstanding(), 0);
    assert_eq!(ledger.acquired(), ledger.released());
    assert!(log.borrow().closed);
    assert_eq!(extractor.state(), ExtractorState::Closed);
}

#[tokio::test]
async fn test_dropping_extractor_releases_pictures() {
    let spec = sixty_fps();
    let (mut extractor, log) = simple_extractor(&spec, 1000, 0).await;
    extractor.next().await.unwrap();
    let ledger = extractor.ledger().clone();
    assert!(ledger.outstanding() > 0);
    drop(extractor);
    assert_eq!(ledger.outstanding(), 0);
    assert!(log.borrow().closed);
}

#[tokio::test]
async fn test_closed_session_rejects_requests() {
    let spec = MovieSpec::linear(10, 5, 100, 10);
    let (mut extractor, _) = simple_extractor(&spec, 64, 0).await;
    extractor.close();
    assert!(matches!(
        extractor.next().await,
        Err(frameseek::ExtractorError::SessionEnded)
    ));
    assert!(matches!(
        extractor.seek(None).await,
        Err(frameseek::ExtractorError::SessionEnded)
    ));
}

#[tokio::test]
async fn test_seek_latency_is_logged() {
    let spec = sixty_fps();
    let (mut extractor, _) = simple_extractor(&spec, 1000, 0).await;
    extractor.seek(Some(4.5)).await.unwrap();
    let lines = extractor.diagnostics().lines();
    let line = lines
        .iter()
        .find(|l| l.starts_with("Seek to 4.500s"))
        .expect("seek line");
    let pattern = regex::Regex::new(r"delivered 4\.500s in \d+ ms$").unwrap();
    assert!(pattern.is_match(line), "{}", line);
}

#[tokio::test]
async fn test_index_to_end_counts_every_sample() {
    let spec = sixty_fps();
    let (mut extractor, _) = simple_extractor(&spec, 1000, 0).await;
    assert_eq!(extractor.index_to_end().await.unwrap(), 600);
    assert_eq!(
        extractor.index().key_frame_times(),
        vec![0, 1200, 2400, 3600, 4800]
    );
    assert!((extractor.duration() - 10.0).abs() < 1e-9);
}
