// Integration tests for the simulated engine: WAV output, failure
// codes, event emission, and the PCM/mixer pass-through surfaces.

use std::time::Duration;
use tinyalsa_harness::engine::sim::codes;
use tinyalsa_harness::engine::{CARD_DMIC, CARD_LINEIN};
use tinyalsa_harness::{
    AudioEngine, EngineFailure, PcmDirection, PcmParams, SimEngine, SimEngineConfig, TestEvent,
};
use tokio::sync::mpsc;

fn new_engine() -> SimEngine {
    SimEngine::new(SimEngineConfig::default())
}

fn failure_code(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<EngineFailure>()
        .expect("engine errors carry an EngineFailure")
        .code
}

#[tokio::test]
async fn record_writes_wav_matching_params() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dmic.wav");

    let engine = new_engine();
    let params = PcmParams::dmic();
    engine
        .record(&params, &path, Duration::from_secs(2))
        .await
        .unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(
        reader.len(),
        2 * params.sample_rate * params.channels as u32
    );
}

#[tokio::test]
async fn linein_route_records_at_44100() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("amic.wav");

    let engine = new_engine();
    engine
        .record(&PcmParams::linein(), &path, Duration::from_secs(1))
        .await
        .unwrap();

    let spec = hound::WavReader::open(&path).unwrap().spec();
    assert_eq!(spec.sample_rate, 44100);
}

#[tokio::test]
async fn zero_duration_record_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.wav");

    let engine = new_engine();
    let err = engine
        .record(&PcmParams::dmic(), &path, Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(failure_code(&err), codes::INVALID_ARGUMENT);
    assert!(!path.exists());
}

#[tokio::test]
async fn unwritable_record_path_reports_io_failure() {
    let engine = new_engine();
    let err = engine
        .record(
            &PcmParams::dmic(),
            std::path::Path::new("/nonexistent-dir/out.wav"),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
    assert_eq!(failure_code(&err), codes::IO);
}

#[tokio::test]
async fn playback_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    let engine = new_engine();
    let err = engine
        .playback(&PcmParams::default_output(), &dir.path().join("missing.wav"))
        .await
        .unwrap_err();
    assert_eq!(failure_code(&err), codes::IO);
}

#[tokio::test]
async fn playback_of_garbage_file_reports_bad_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.wav");
    std::fs::write(&path, b"this is not a wav file").unwrap();

    let engine = new_engine();
    let err = engine
        .playback(&PcmParams::default_output(), &path)
        .await
        .unwrap_err();
    let code = failure_code(&err);
    assert!(code == codes::IO || code == codes::BAD_FORMAT);
}

#[tokio::test]
async fn events_are_emitted_in_protocol_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dmic.wav");

    let engine = new_engine();
    let (tx, mut rx) = mpsc::unbounded_channel();
    engine.set_event_sink(Some(tx));

    engine
        .record(&PcmParams::dmic(), &path, Duration::from_secs(3))
        .await
        .unwrap();
    engine.set_event_sink(None);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    // Zero or more progress events, then exactly one completion
    let completions: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, TestEvent::Complete { .. }))
        .collect();
    assert_eq!(completions.len(), 1);
    assert!(matches!(
        events.last(),
        Some(TestEvent::Complete { success: true, .. })
    ));

    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            TestEvent::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100));
}

#[tokio::test]
async fn failed_operation_still_emits_one_completion() {
    let dir = tempfile::tempdir().unwrap();

    let engine = new_engine();
    let (tx, mut rx) = mpsc::unbounded_channel();
    engine.set_event_sink(Some(tx));

    let result = engine
        .playback(&PcmParams::default_output(), &dir.path().join("missing.wav"))
        .await;
    assert!(result.is_err());

    let mut completions = 0;
    while let Ok(event) = rx.try_recv() {
        if let TestEvent::Complete { success, message } = event {
            assert!(!success);
            assert!(!message.is_empty());
            completions += 1;
        }
    }
    assert_eq!(completions, 1);
}

#[test]
fn pcm_loopback_write_then_read() {
    let engine = new_engine();
    let params = PcmParams::linein();

    let playback = engine.pcm_open(&params, PcmDirection::Playback).unwrap();
    engine.pcm_start(playback).unwrap();

    let written = engine.pcm_write(playback, &[1, 2, 3, 4]).unwrap();
    assert_eq!(written, 4);

    let mut buf = [0u8; 4];
    let read = engine.pcm_read(playback, &mut buf).unwrap();
    assert_eq!(read, 4);
    assert_eq!(buf, [1, 2, 3, 4]);

    engine.pcm_stop(playback).unwrap();
    engine.pcm_close(playback).unwrap();
}

#[test]
fn capture_stream_reads_full_buffers() {
    let engine = new_engine();
    let capture = engine
        .pcm_open(&PcmParams::dmic(), PcmDirection::Capture)
        .unwrap();

    // A capture device never underruns in the simulation
    let mut buf = [0xffu8; 64];
    let read = engine.pcm_read(capture, &mut buf).unwrap();
    assert_eq!(read, 64);
    assert!(buf.iter().all(|&b| b == 0));
}

#[test]
fn pcm_buffer_size_follows_params() {
    let engine = new_engine();
    let params = PcmParams::dmic();
    let handle = engine.pcm_open(&params, PcmDirection::Capture).unwrap();

    // period_size * period_count * channels * bytes per sample
    let expected = 1024 * 4 * 2 * 2;
    assert_eq!(engine.pcm_buffer_size(handle).unwrap(), expected);
    assert_eq!(params.buffer_bytes(), expected);
}

#[test]
fn closed_pcm_handle_is_rejected() {
    let engine = new_engine();
    let handle = engine
        .pcm_open(&PcmParams::dmic(), PcmDirection::Capture)
        .unwrap();
    engine.pcm_close(handle).unwrap();

    let err = engine.pcm_start(handle).unwrap_err();
    assert_eq!(failure_code(&err), codes::BAD_HANDLE);
    let err = engine.pcm_close(handle).unwrap_err();
    assert_eq!(failure_code(&err), codes::BAD_HANDLE);
}

#[test]
fn mixer_set_get_round_trips() {
    let engine = new_engine();
    let mixer = engine.mixer_open(CARD_LINEIN).unwrap();

    let initial = engine.mixer_get(mixer, "Master Playback Volume").unwrap();
    assert_eq!(initial, 80);

    engine.mixer_set(mixer, "Master Playback Volume", 42).unwrap();
    assert_eq!(engine.mixer_get(mixer, "Master Playback Volume").unwrap(), 42);

    engine.mixer_close(mixer).unwrap();
}

#[test]
fn mixer_contexts_are_per_card() {
    let engine = new_engine();
    let dmic = engine.mixer_open(CARD_DMIC).unwrap();
    let linein = engine.mixer_open(CARD_LINEIN).unwrap();

    assert!(engine.mixer_get(dmic, "DMIC Capture Volume").is_ok());
    let err = engine.mixer_get(linein, "DMIC Capture Volume").unwrap_err();
    assert_eq!(failure_code(&err), codes::INVALID_ARGUMENT);
}

#[test]
fn unknown_mixer_control_is_rejected() {
    let engine = new_engine();
    let mixer = engine.mixer_open(CARD_DMIC).unwrap();

    let err = engine.mixer_set(mixer, "No Such Control", 1).unwrap_err();
    assert_eq!(failure_code(&err), codes::INVALID_ARGUMENT);

    engine.mixer_close(mixer).unwrap();
    let err = engine.mixer_get(mixer, "DMIC Capture Volume").unwrap_err();
    assert_eq!(failure_code(&err), codes::BAD_HANDLE);
}
