// Integration tests for bounded operation submission

use std::sync::Arc;
use std::time::Duration;
use tinyalsa_harness::{
    AudioTestSession, Operation, OperationKind, OperationRunner, SimEngine, SimEngineConfig,
};

fn new_runner(max_in_flight: usize, tick: Duration) -> Arc<OperationRunner> {
    let engine = Arc::new(SimEngine::new(SimEngineConfig { tick }));
    let session = Arc::new(AudioTestSession::new(engine));
    Arc::new(OperationRunner::new(session, max_in_flight))
}

#[tokio::test]
async fn submitted_operations_resolve_to_result_codes() {
    let dir = tempfile::tempdir().unwrap();
    let runner = new_runner(2, Duration::ZERO);

    let path = dir.path().join("dmic.wav");
    let record = runner.submit(Operation::record(OperationKind::DmicRecord, &path, 1));
    assert_eq!(record.await.unwrap(), 0);

    let playback = runner.submit(Operation::playback(OperationKind::DmicPlayback, &path));
    assert_eq!(playback.await.unwrap(), 0);

    let missing = runner.submit(Operation::playback(
        OperationKind::LineinPlayback,
        dir.path().join("missing.wav"),
    ));
    assert_ne!(missing.await.unwrap(), 0);
}

#[tokio::test]
async fn burst_of_submissions_all_complete() {
    let dir = tempfile::tempdir().unwrap();
    let runner = new_runner(2, Duration::ZERO);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let path = dir.path().join(format!("burst-{}.wav", i));
            runner.submit(Operation::record(OperationKind::LineinRecord, path, 1))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 0);
    }
    assert_eq!(runner.available_permits(), runner.max_in_flight());
}

#[tokio::test]
async fn in_flight_operations_are_capped() {
    let dir = tempfile::tempdir().unwrap();
    // Pace the engine so operations overlap
    let runner = new_runner(2, Duration::from_millis(30));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let path = dir.path().join(format!("capped-{}.wav", i));
            runner.submit(Operation::record(OperationKind::DmicRecord, path, 2))
        })
        .collect();

    // With 4 paced operations and 2 permits, the semaphore must
    // saturate at some point before everything finishes
    let saturated = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if runner.available_permits() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(saturated.is_ok(), "runner never saturated its permits");

    for handle in handles {
        assert_eq!(handle.await.unwrap(), 0);
    }
    assert_eq!(runner.available_permits(), runner.max_in_flight());
}
