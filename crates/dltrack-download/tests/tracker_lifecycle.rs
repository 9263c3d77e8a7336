//! End-to-end tracker behaviour against the scripted engine.
//!
//! Every test runs on a paused clock: interval ticks fire as soon as the
//! runtime is otherwise idle, so the scripts below play out deterministically.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout};

use dltrack_core::download::status::codes;
use dltrack_download::{
    DownloadEvent, DownloadId, DownloadState, DownloadSubmission, DownloadTrackerConfig,
    DownloadTrackerImpl, DownloadTrackerPort, EngineStatus, EventBus, EventSubscription,
    FailureReason, ScriptedEngine,
};

struct Harness {
    engine: Arc<ScriptedEngine>,
    tracker: DownloadTrackerImpl,
    events: EventSubscription,
}

fn harness_with_interval(poll_interval: Duration) -> Harness {
    let engine = Arc::new(ScriptedEngine::new());
    let bus = Arc::new(EventBus::new(64));
    let events = bus.subscribe();
    let config = DownloadTrackerConfig::new(PathBuf::from("/downloads"))
        .with_poll_interval(poll_interval);
    let tracker = DownloadTrackerImpl::new(Arc::clone(&engine), bus, config);
    Harness {
        engine,
        tracker,
        events,
    }
}

fn harness() -> Harness {
    harness_with_interval(Duration::from_millis(1000))
}

fn submission(id: &str) -> DownloadSubmission {
    DownloadSubmission::new(id, format!("https://files.example.com/{id}.bin"), format!("{id}.bin"))
}

async fn next_event(events: &mut EventSubscription) -> DownloadEvent {
    timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("no event within 60s")
        .expect("event bus closed")
}

async fn assert_quiet(events: &mut EventSubscription) {
    let waited = timeout(Duration::from_secs(30), events.recv()).await;
    assert!(waited.is_err(), "unexpected event: {waited:?}");
}

#[tokio::test(start_paused = true)]
async fn completed_download_reports_progress_then_one_completion() {
    let mut h = harness();
    h.engine
        .push_script(vec![
            EngineStatus::running(0, 1000),
            EngineStatus::running(500, 1000),
            EngineStatus::successful(1000),
        ])
        .await;

    let ack = h.tracker.download(submission("a")).await.unwrap();
    assert_eq!(ack.id, DownloadId::new("a"));
    assert_eq!(ack.status, DownloadState::Pending);
    assert!(h.events.try_recv().is_err(), "event before acknowledgement");

    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("a", 0.0));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("a", 0.5));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("a", 1.0));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::completed("a"));
    assert_quiet(&mut h.events).await;

    let record = h.tracker.record(&DownloadId::new("a")).await.unwrap();
    assert_eq!(record.state, DownloadState::Successful);
    assert_eq!(record.bytes_downloaded, 1000);
    assert_eq!(record.bytes_total, 1000);
}

#[tokio::test(start_paused = true)]
async fn failed_download_reports_reason_text_once() {
    let mut h = harness();
    h.engine
        .push_script(vec![EngineStatus::failed(
            0,
            1000,
            codes::ERROR_INSUFFICIENT_SPACE,
        )])
        .await;

    h.tracker.download(submission("b")).await.unwrap();

    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("b", 0.0));
    match next_event(&mut h.events).await {
        DownloadEvent::DownloadFailed { id, error, reason } => {
            assert_eq!(id, DownloadId::new("b"));
            assert_eq!(error, "ERROR_INSUFFICIENT_SPACE");
            assert_eq!(reason, FailureReason::InsufficientSpace);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_quiet(&mut h.events).await;

    let record = h.tracker.record(&DownloadId::new("b")).await.unwrap();
    assert_eq!(record.reason, Some(FailureReason::InsufficientSpace));
}

#[tokio::test(start_paused = true)]
async fn duplicate_submission_is_rejected_while_first_continues() {
    let mut h = harness();
    h.engine.push_script(vec![EngineStatus::running(100, 1000)]).await;

    h.tracker.download(submission("c")).await.unwrap();
    let err = h.tracker.download(submission("c")).await.unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_ID");
    assert_eq!(h.engine.requests().await.len(), 1);

    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("c", 0.1));

    let handle = h.tracker.record(&DownloadId::new("c")).await.unwrap().handle;
    h.engine
        .set_script(handle, vec![EngineStatus::successful(1000)])
        .await;

    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("c", 1.0));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::completed("c"));
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_are_unsupported() {
    let h = harness();
    h.tracker.download(submission("p")).await.unwrap();
    let before = h.tracker.snapshot().await;

    for id in ["p", "never-submitted"] {
        let id = DownloadId::new(id);
        let err = tokio_test::assert_err!(h.tracker.pause(&id).await);
        assert_eq!(err.code(), "UNSUPPORTED");
        let err = tokio_test::assert_err!(h.tracker.resume(&id).await);
        assert_eq!(err.code(), "UNSUPPORTED");
    }

    assert_eq!(h.tracker.snapshot().await, before);
}

#[tokio::test(start_paused = true)]
async fn no_event_is_delivered_after_stop() {
    let mut h = harness();
    h.engine.push_script(vec![EngineStatus::running(100, 1000)]).await;

    h.tracker.download(submission("s")).await.unwrap();
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("s", 0.1));

    let id = DownloadId::new("s");
    let handle = h.tracker.record(&id).await.unwrap().handle;
    let outcome = h.tracker.stop(&id).await.unwrap();
    assert!(outcome.removed);
    assert_eq!(h.engine.removed().await, vec![handle]);

    assert_quiet(&mut h.events).await;
    assert_eq!(h.tracker.tracked_count().await, 0);
    assert_eq!(h.tracker.stop(&id).await.unwrap_err().code(), "NOT_FOUND");
    assert_eq!(h.tracker.check_status(&id).await.unwrap_err().code(), "NOT_FOUND");
}

#[tokio::test(start_paused = true)]
async fn stop_succeeds_when_engine_removed_nothing() {
    let h = harness();
    h.tracker.download(submission("gone")).await.unwrap();

    let id = DownloadId::new("gone");
    let handle = h.tracker.record(&id).await.unwrap().handle;
    assert!(h.engine.forget(handle).await);

    let outcome = h.tracker.stop(&id).await.unwrap();
    assert!(!outcome.removed);
}

#[tokio::test(start_paused = true)]
async fn terminal_downloads_stay_tracked_until_stopped() {
    let mut h = harness();
    h.engine.push_script(vec![EngineStatus::successful(10)]).await;

    h.tracker.download(submission("t")).await.unwrap();
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("t", 1.0));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::completed("t"));

    let err = h.tracker.download(submission("t")).await.unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_ID");

    assert!(h.tracker.stop(&DownloadId::new("t")).await.unwrap().removed);
    h.tracker.download(submission("t")).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn check_status_reflects_latest_engine_row_without_committing() {
    let mut h = harness();
    h.engine
        .push_script(vec![
            EngineStatus::running(100, 1000),
            EngineStatus::running(400, 1000),
        ])
        .await;

    let id = DownloadId::new("q");
    assert_eq!(h.tracker.check_status(&id).await.unwrap_err().code(), "NOT_FOUND");

    h.tracker.download(submission("q")).await.unwrap();
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("q", 0.1));

    let report = h.tracker.check_status(&id).await.unwrap();
    assert_eq!(report.status, DownloadState::Running);
    assert_eq!(report.bytes_downloaded, 400);
    assert_eq!(report.bytes_total, 1000);
    assert!((report.progress - 0.4).abs() < f64::EPSILON);
    assert!(report.reason.is_none());

    let record = h.tracker.record(&id).await.unwrap();
    assert_eq!(record.bytes_downloaded, 100);
}

#[tokio::test(start_paused = true)]
async fn check_status_reports_failure_reason() {
    let mut h = harness_with_interval(Duration::from_secs(60));
    h.engine
        .push_script(vec![
            EngineStatus::running(1, 10),
            EngineStatus::failed(5, 10, codes::ERROR_FILE_ALREADY_EXISTS),
        ])
        .await;
    h.tracker.download(submission("f")).await.unwrap();
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("f", 0.1));

    let report = h.tracker.check_status(&DownloadId::new("f")).await.unwrap();
    assert_eq!(report.status, DownloadState::Failed);
    assert_eq!(report.reason, Some(FailureReason::FileAlreadyExists));
    assert_eq!(report.reason_text.as_deref(), Some("ERROR_FILE_ALREADY_EXISTS"));
}

#[tokio::test(start_paused = true)]
async fn check_status_fails_when_engine_forgot_the_handle() {
    let h = harness();
    h.tracker.download(submission("lost")).await.unwrap();

    let id = DownloadId::new("lost");
    let handle = h.tracker.record(&id).await.unwrap().handle;
    h.engine.forget(handle).await;

    assert_eq!(h.tracker.check_status(&id).await.unwrap_err().code(), "NOT_FOUND");
}

#[tokio::test(start_paused = true)]
async fn progress_is_clamped_and_never_divides_by_zero() {
    let mut h = harness();
    h.engine
        .push_script(vec![
            EngineStatus::running(-1, -1),
            EngineStatus::running(10, 0),
            EngineStatus::running(1500, 1000),
            EngineStatus::successful(1000),
        ])
        .await;

    h.tracker.download(submission("z")).await.unwrap();

    for expected in [0.0, 0.0, 1.0, 1.0] {
        match next_event(&mut h.events).await {
            DownloadEvent::DownloadProgress { progress, .. } => {
                assert!((0.0..=1.0).contains(&progress));
                assert!((progress - expected).abs() < f64::EPSILON);
            }
            other => panic!("expected progress, got {other:?}"),
        }
    }
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::completed("z"));
}

#[tokio::test(start_paused = true)]
async fn engine_notification_runs_an_immediate_tick() {
    let mut h = harness_with_interval(Duration::from_secs(3600));
    h.engine
        .push_script(vec![EngineStatus::pending(1000), EngineStatus::successful(1000)])
        .await;

    h.tracker.download(submission("n")).await.unwrap();
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("n", 0.0));

    let handle = h.tracker.record(&DownloadId::new("n")).await.unwrap().handle;
    let woken_at = Instant::now();
    assert!(h.tracker.handle_engine_notification(handle).await);

    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("n", 1.0));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::completed("n"));
    assert!(woken_at.elapsed() < Duration::from_secs(1));

    // A repeated notification after the terminal tick changes nothing
    assert!(h.tracker.handle_engine_notification(handle).await);
    assert_quiet(&mut h.events).await;
}

#[tokio::test(start_paused = true)]
async fn notification_during_slow_query_cannot_reorder_rows() {
    let mut h = harness_with_interval(Duration::from_secs(3600));
    h.engine
        .push_slow_script(
            vec![EngineStatus::running(200, 1000), EngineStatus::running(900, 1000)],
            vec![Duration::from_millis(500)],
        )
        .await;

    h.tracker.download(submission("r")).await.unwrap();
    let id = DownloadId::new("r");
    let handle = h.tracker.record(&id).await.unwrap().handle;

    // The first query is still waiting on the engine
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.tracker.handle_engine_notification(handle).await);

    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("r", 0.2));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("r", 0.9));
    assert_quiet(&mut h.events).await;

    let record = h.tracker.record(&id).await.unwrap();
    assert_eq!(record.bytes_downloaded, 900);
    assert_eq!(h.engine.query_count(handle).await, 2);
}

#[tokio::test(start_paused = true)]
async fn stop_during_query_suppresses_its_terminal_row() {
    let mut h = harness();
    h.engine
        .push_slow_script(
            vec![EngineStatus::successful(1000)],
            vec![Duration::from_millis(500)],
        )
        .await;

    h.tracker.download(submission("x")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let outcome = h.tracker.stop(&DownloadId::new("x")).await.unwrap();
    assert!(outcome.removed);

    assert_quiet(&mut h.events).await;
    assert_eq!(h.tracker.tracked_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_query_does_not_hold_up_other_downloads() {
    let mut h = harness();
    h.engine
        .push_slow_script(vec![EngineStatus::running(1, 10)], vec![Duration::from_secs(10)])
        .await;
    h.engine.push_script(vec![EngineStatus::successful(10)]).await;

    let started = Instant::now();
    h.tracker.download(submission("slow")).await.unwrap();
    h.tracker.download(submission("fast")).await.unwrap();

    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("fast", 1.0));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::completed("fast"));
    assert!(started.elapsed() < Duration::from_secs(10));

    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("slow", 0.1));
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn discard_forgets_finished_download_without_engine_removal() {
    let mut h = harness();
    h.engine.push_script(vec![EngineStatus::successful(10)]).await;

    let id = DownloadId::new("d");
    h.tracker.download(submission("d")).await.unwrap();
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("d", 1.0));
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::completed("d"));

    h.tracker.discard(&id).await.unwrap();
    assert!(h.engine.removed().await.is_empty());
    assert_eq!(h.tracker.tracked_count().await, 0);
    assert_eq!(h.tracker.discard(&id).await.unwrap_err().code(), "NOT_FOUND");

    h.tracker.download(submission("d")).await.unwrap();
    assert_eq!(h.tracker.tracked_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn discard_refuses_active_download() {
    let mut h = harness();
    h.engine.push_script(vec![EngineStatus::running(1, 10)]).await;

    let id = DownloadId::new("busy");
    h.tracker.download(submission("busy")).await.unwrap();
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("busy", 0.1));

    let err = tokio_test::assert_err!(h.tracker.discard(&id).await);
    assert_eq!(err.code(), "INVALID_ARGUMENT");
    assert_eq!(h.tracker.tracked_count().await, 1);

    // Polling carries on
    assert_eq!(next_event(&mut h.events).await, DownloadEvent::progress("busy", 0.1));
}

#[tokio::test(start_paused = true)]
async fn notification_for_unknown_handle_is_ignored() {
    let h = harness();
    let handle = h.engine.enqueue_scripted(vec![EngineStatus::successful(1)]).await;
    assert!(!h.tracker.handle_engine_notification(handle).await);
}

#[tokio::test(start_paused = true)]
async fn many_downloads_are_tracked_independently() {
    let mut h = harness();
    for id in ["m1", "m2", "m3"] {
        h.engine
            .push_script(vec![EngineStatus::running(1, 2), EngineStatus::successful(2)])
            .await;
        h.tracker.download(submission(id)).await.unwrap();
    }

    let mut completed = Vec::new();
    while completed.len() < 3 {
        if let DownloadEvent::DownloadCompleted { id } = next_event(&mut h.events).await {
            completed.push(id.as_str().to_string());
        }
    }
    completed.sort();
    assert_eq!(completed, ["m1", "m2", "m3"]);

    let snapshot = h.tracker.snapshot().await;
    assert!(snapshot.iter().all(|r| r.state == DownloadState::Successful));
    assert_eq!(h.tracker.shutdown().await, 3);
    assert_quiet(&mut h.events).await;
}

#[tokio::test]
async fn file_info_reports_size_and_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("track.mp3");
    std::fs::write(&path, vec![7u8; 2048]).unwrap();

    let h = harness();
    let info = h
        .tracker
        .get_file_info(path.to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(info.size, 2048);
    assert_eq!(info.mime_type.as_deref(), Some("audio/mpeg"));

    let missing = h
        .tracker
        .get_file_info(dir.path().join("missing.zip").to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(missing.size, 0);
    assert_eq!(missing.mime_type.as_deref(), Some("application/zip"));
}
