// Integration tests for the create / upload / report workflows
//
// Spy backends assert which calls were made and in what order.
//
// Run with: cargo test -p cme-core --test workflow_test

mod common;

use std::sync::Arc;
use std::time::Duration;

use cme_core::config::Jurisdictions;
use cme_core::create::{CreateError, CreateOutcome, CreateSessionForm, Route, SessionCreator};
use cme_core::error::ValidationError;
use cme_core::report::{fetch_report, ReportError};
use cme_core::session::{Session, SessionStatus};
use cme_core::upload::{RecordingFile, UploadError, UploadStep, UploadWorkflow};
use cme_core::views::DetailState;
use cme_core::watch::{watch_session, WatchError, WatchOptions};
use common::SpyBackend;

fn recording() -> RecordingFile {
    RecordingFile::new("exam.mp4", "video/mp4", b"fake-video-bytes".to_vec()).unwrap()
}

fn workflow(spy: &Arc<SpyBackend>) -> UploadWorkflow {
    UploadWorkflow::new(spy.clone(), spy.clone())
}

fn filled_form() -> CreateSessionForm {
    CreateSessionForm {
        patient_id: "P-100".into(),
        patient_name: "Jane Roe".into(),
        doctor_name: "Dr. Alvarez".into(),
        state: "FL".into(),
        exam_date: "2026-10-19".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_upload_runs_steps_in_order() {
    let spy = Arc::new(SpyBackend::with_sessions(vec![Session::new(
        "s1",
        SessionStatus::Created,
    )]));
    let session = Session::new("s1", SessionStatus::Created);

    let refreshed = workflow(&spy).run(&session, recording()).await.unwrap();

    assert_eq!(
        spy.calls(),
        vec![
            "request_upload",
            "put_object",
            "start_processing",
            "get_session"
        ]
    );
    let DetailState::Loaded(refreshed) = refreshed else {
        panic!("session should have been re-fetched");
    };
    assert_eq!(refreshed.status, SessionStatus::Processing);
    assert_eq!(*spy.uploaded_length.lock().unwrap(), Some(16));
}

#[tokio::test]
async fn test_failed_refresh_after_processing_started_still_succeeds() {
    let spy = Arc::new(SpyBackend::default().failing("get_session"));
    let session = Session::new("s1", SessionStatus::Created);

    let refreshed = workflow(&spy).run(&session, recording()).await.unwrap();

    assert_eq!(refreshed, DetailState::NotFound);
    assert_eq!(
        spy.calls(),
        vec![
            "request_upload",
            "put_object",
            "start_processing",
            "get_session"
        ]
    );
}

#[tokio::test]
async fn test_upload_from_disk_sends_file_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exam.webm");
    std::fs::write(&path, vec![7u8; 4096]).unwrap();

    let spy = Arc::new(SpyBackend::with_sessions(vec![Session::new(
        "s1",
        SessionStatus::Created,
    )]));
    let file = RecordingFile::from_path(&path, None).await.unwrap();

    workflow(&spy)
        .run(&Session::new("s1", SessionStatus::Created), file)
        .await
        .unwrap();

    assert_eq!(*spy.uploaded_length.lock().unwrap(), Some(4096));
}

#[tokio::test]
async fn test_failed_transfer_never_starts_processing() {
    let spy = Arc::new(
        SpyBackend::with_sessions(vec![Session::new("s1", SessionStatus::Created)])
            .failing("put_object"),
    );
    let session = Session::new("s1", SessionStatus::Created);

    let err = workflow(&spy).run(&session, recording()).await.unwrap_err();

    assert_eq!(err.step(), Some(UploadStep::TransferBytes));
    assert!(!spy.called("start_processing"));
    assert_eq!(spy.calls(), vec!["request_upload", "put_object"]);
    // Status is left as the backend has it
    assert_eq!(
        spy.sessions.lock().unwrap()["s1"].status,
        SessionStatus::Created
    );
}

#[tokio::test]
async fn test_failed_target_request_sends_no_bytes() {
    let spy = Arc::new(SpyBackend::default().failing("request_upload"));
    let session = Session::new("s1", SessionStatus::Created);

    let err = workflow(&spy).run(&session, recording()).await.unwrap_err();

    assert_eq!(err.step(), Some(UploadStep::RequestTarget));
    assert_eq!(spy.calls(), vec!["request_upload"]);
}

#[tokio::test]
async fn test_failed_process_start_is_reported() {
    let spy = Arc::new(SpyBackend::default().failing("start_processing"));
    let session = Session::new("s1", SessionStatus::Created);

    let err = workflow(&spy).run(&session, recording()).await.unwrap_err();

    assert_eq!(err.step(), Some(UploadStep::StartProcessing));
    assert!(!spy.called("get_session"));
}

#[tokio::test]
async fn test_upload_gated_on_created_status() {
    let spy = Arc::new(SpyBackend::default());
    for status in [
        SessionStatus::RecordingUploaded,
        SessionStatus::Processing,
        SessionStatus::Completed,
        SessionStatus::Error,
    ] {
        let session = Session::new("s1", status.clone());
        let err = workflow(&spy).run(&session, recording()).await.unwrap_err();
        assert!(matches!(err, UploadError::NotAllowed(s) if s == status));
    }
    assert!(spy.calls().is_empty());
}

#[tokio::test]
async fn test_create_rejects_missing_field_without_network_call() {
    let spy = Arc::new(SpyBackend::default());
    let creator = SessionCreator::new(spy.clone(), Jurisdictions::default());

    let mut form = filled_form();
    form.doctor_name.clear();

    let err = creator.submit(&form).await.unwrap_err();
    assert!(matches!(
        err,
        CreateError::Validation(ValidationError::MissingField("doctor_name"))
    ));
    assert!(spy.calls().is_empty());
    assert!(!creator.is_submitting());
}

#[tokio::test]
async fn test_create_navigates_to_new_session() {
    let spy = Arc::new(SpyBackend::default());
    *spy.next_session_id.lock().unwrap() = Some("s2".to_string());
    let creator = SessionCreator::new(spy.clone(), Jurisdictions::default());

    let outcome = creator.submit(&filled_form()).await.unwrap();

    assert_eq!(
        outcome,
        CreateOutcome::Created {
            session_id: "s2".to_string(),
            route: Route::SessionDetail("s2".to_string()),
        }
    );
    let CreateOutcome::Created { route, .. } = outcome else {
        unreachable!()
    };
    assert_eq!(route.path(), "/sessions/s2");
    assert_eq!(spy.created_requests.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_outstanding_is_ignored() {
    let spy = Arc::new(SpyBackend::default());
    *spy.create_delay.lock().unwrap() = Some(Duration::from_millis(50));
    *spy.next_session_id.lock().unwrap() = Some("s3".to_string());
    let creator = SessionCreator::new(spy.clone(), Jurisdictions::default());
    let form = filled_form();

    let (first, second) = tokio::join!(creator.submit(&form), creator.submit(&form));
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, CreateOutcome::AlreadySubmitting));

    assert_eq!(
        outcomes,
        vec![
            CreateOutcome::Created {
                session_id: "s3".to_string(),
                route: Route::SessionDetail("s3".to_string()),
            },
            CreateOutcome::AlreadySubmitting,
        ]
    );
    assert_eq!(spy.calls(), vec!["create_session"]);
    assert_eq!(spy.created_requests.lock().unwrap().len(), 1);
    assert!(!creator.is_submitting());
}

#[tokio::test]
async fn test_create_failure_surfaces_message_and_allows_retry() {
    let spy = Arc::new(SpyBackend::default().failing("create_session"));
    let creator = SessionCreator::new(spy.clone(), Jurisdictions::default());

    let err = creator.submit(&filled_form()).await.unwrap_err();
    assert_eq!(err.to_string(), "create_session failed");
    assert!(!creator.is_submitting());

    spy.fail.lock().unwrap().clear();
    let outcome = creator.submit(&filled_form()).await.unwrap();
    assert!(matches!(outcome, CreateOutcome::Created { .. }));
}

#[tokio::test]
async fn test_report_requires_completed() {
    let spy = SpyBackend::default();
    let err = fetch_report(&spy, &Session::new("s1", SessionStatus::Processing))
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::NotAllowed(SessionStatus::Processing)));
    assert!(spy.calls().is_empty());
}

#[tokio::test]
async fn test_report_link() {
    let spy = SpyBackend::default();
    *spy.report_url.lock().unwrap() = Some("https://reports.example/s1.pdf".to_string());

    let link = fetch_report(&spy, &Session::new("s1", SessionStatus::Completed))
        .await
        .unwrap();
    assert_eq!(link.download_url, "https://reports.example/s1.pdf");
}

#[tokio::test]
async fn test_report_without_link() {
    let spy = SpyBackend::default();
    let err = fetch_report(&spy, &Session::new("s1", SessionStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::NoLink));
}

#[tokio::test(start_paused = true)]
async fn test_watch_stops_at_terminal_status() {
    let spy = SpyBackend::with_sessions(vec![Session::new("s1", SessionStatus::Completed)]);
    let mut seen = Vec::new();

    let session = watch_session(&spy, "s1", WatchOptions::default(), |s| {
        seen.push(s.status.clone())
    })
    .await
    .unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(seen, vec![SessionStatus::Completed]);
    assert_eq!(spy.calls(), vec!["get_session"]);
}

#[tokio::test(start_paused = true)]
async fn test_watch_times_out() {
    let spy = SpyBackend::with_sessions(vec![Session::new("s1", SessionStatus::Processing)]);
    let options = WatchOptions {
        interval: Duration::from_secs(5),
        timeout: Duration::from_secs(12),
    };

    let err = watch_session(&spy, "s1", options, |_| {}).await.unwrap_err();

    assert!(matches!(
        err,
        WatchError::Timeout {
            last: SessionStatus::Processing,
            ..
        }
    ));
    // Polled at t=0, 5, 10 and 15
    assert_eq!(spy.calls().len(), 4);
}

#[tokio::test]
async fn test_watch_aborts_on_fetch_error() {
    let spy = SpyBackend::default();
    let err = watch_session(&spy, "missing", WatchOptions::default(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::Api(_)));
}
