// Integration tests for the recording session pipeline
//
// These tests drive the full capture -> decode -> transcribe flow with a
// scripted device and model, verifying status transitions and recovery.

mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use scribe_assist::{
    PipelineError, RecordingSession, SessionStatus, Transcriber,
};
use tokio::time::timeout;

use support::{
    silent_wav, sine_wav, wav_codec, ScriptedDevice, ScriptedLoader, ScriptedRun,
};

const WAIT: Duration = Duration::from_secs(10);

async fn ready_transcriber(loader: ScriptedLoader) -> Result<Arc<Transcriber>> {
    let transcriber = Arc::new(Transcriber::new(loader));
    timeout(WAIT, transcriber.wait_until_ready()).await??;
    Ok(transcriber)
}

#[tokio::test]
async fn test_full_pipeline_produces_transcript() -> Result<()> {
    let device = ScriptedDevice::new(vec![sine_wav(48000, 0.5)]).with_codec(wav_codec(48000));
    let transcriber = ready_transcriber(ScriptedLoader::new("hello from the mic")).await?;
    let session = RecordingSession::new(Box::new(device), transcriber);

    assert_eq!(session.status(), SessionStatus::Idle);

    session.start_recording().await?;
    assert_eq!(session.status(), SessionStatus::Recording);

    session.stop_recording().await?;
    assert_eq!(session.status(), SessionStatus::Stopped);
    assert!(session.encoded_audio().await.is_some());

    let text = timeout(WAIT, session.transcribe()).await??;
    assert_eq!(text, "hello from the mic");
    assert_eq!(session.status(), SessionStatus::Complete);

    let snapshot = session.snapshot().await;
    assert!(snapshot.audio_bytes > 0);
    assert_eq!(snapshot.transcript, "hello from the mic");
    assert_eq!(snapshot.codec.as_deref(), Some("audio/wav;codecs=pcm_s16le;rate=48000;channels=1"));
    assert!(!snapshot.busy);

    Ok(())
}

#[tokio::test]
async fn test_transcribe_without_recording_fails() -> Result<()> {
    let device = ScriptedDevice::new(Vec::new());
    let transcriber = ready_transcriber(ScriptedLoader::new("unused")).await?;
    let session = RecordingSession::new(Box::new(device), transcriber);

    let err = session
        .transcribe()
        .await
        .expect_err("no artifact to transcribe");
    assert!(matches!(err, PipelineError::NoRecording), "got {err:?}");
    assert_eq!(session.status(), SessionStatus::Idle);

    Ok(())
}

#[tokio::test]
async fn test_double_start_is_rejected() -> Result<()> {
    let device = ScriptedDevice::new(vec![sine_wav(16000, 0.1)]);
    let transcriber = ready_transcriber(ScriptedLoader::new("unused")).await?;
    let session = RecordingSession::new(Box::new(device), transcriber);

    session.start_recording().await?;

    let err = session
        .start_recording()
        .await
        .expect_err("second start must fail");
    assert!(matches!(err, PipelineError::AlreadyRecording), "got {err:?}");
    assert_eq!(session.status(), SessionStatus::Recording);

    session.stop_recording().await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_failure_surfaces_and_marks_failure() -> Result<()> {
    let device = ScriptedDevice::new(vec![sine_wav(16000, 0.1)]).finalize_outcomes(vec![true]);
    let transcriber = ready_transcriber(ScriptedLoader::new("unused")).await?;
    let session = RecordingSession::new(Box::new(device), transcriber);

    session.start_recording().await?;

    let err = session
        .stop_recording()
        .await
        .expect_err("finalize failure must propagate");
    assert!(matches!(err, PipelineError::Permission(_)), "got {err:?}");
    assert_eq!(session.status(), SessionStatus::Failed);
    assert!(session.encoded_audio().await.is_none());

    Ok(())
}

#[tokio::test]
async fn test_undecodable_recording_marks_failure() -> Result<()> {
    let device = ScriptedDevice::new(vec![vec![0xAB; 64]]);
    let transcriber = ready_transcriber(ScriptedLoader::new("unused")).await?;
    let session = RecordingSession::new(Box::new(device), transcriber);

    session.start_recording().await?;
    session.stop_recording().await?;

    let err = timeout(WAIT, session.transcribe())
        .await?
        .expect_err("garbage bytes must not decode");
    assert!(matches!(err, PipelineError::Decode(_)), "got {err:?}");
    assert_eq!(session.status(), SessionStatus::Failed);

    Ok(())
}

#[tokio::test]
async fn test_empty_recording_fails_decode() -> Result<()> {
    // A device that produced no chunks still finalizes, into an empty
    // artifact; decode rejects it.
    let device = ScriptedDevice::new(Vec::new());
    let transcriber = ready_transcriber(ScriptedLoader::new("unused")).await?;
    let session = RecordingSession::new(Box::new(device), transcriber);

    session.start_recording().await?;
    session.stop_recording().await?;
    assert!(session.encoded_audio().await.is_some());

    let err = timeout(WAIT, session.transcribe())
        .await?
        .expect_err("empty artifact must not decode");
    assert!(matches!(err, PipelineError::Decode(_)), "got {err:?}");
    assert_eq!(session.status(), SessionStatus::Failed);

    Ok(())
}

#[tokio::test]
async fn test_inference_failure_marks_failure_and_allows_retry() -> Result<()> {
    let device = ScriptedDevice::new(vec![sine_wav(16000, 0.25)]);
    let loader = ScriptedLoader::new("unused")
        .with_runs(vec![ScriptedRun::Fail("boom"), ScriptedRun::Text("take two")]);
    let transcriber = ready_transcriber(loader).await?;
    let session = RecordingSession::new(Box::new(device), transcriber);

    session.start_recording().await?;
    session.stop_recording().await?;

    let err = timeout(WAIT, session.transcribe())
        .await?
        .expect_err("scripted failure must surface");
    assert!(matches!(err, PipelineError::Inference(_)), "got {err:?}");
    assert_eq!(session.status(), SessionStatus::Failed);

    // The artifact is still held; transcription can simply be retried.
    let text = timeout(WAIT, session.transcribe()).await??;
    assert_eq!(text, "take two");
    assert_eq!(session.status(), SessionStatus::Complete);

    Ok(())
}

#[tokio::test]
async fn test_silent_recording_still_completes() -> Result<()> {
    let device = ScriptedDevice::new(vec![silent_wav(16000, 0.25)]);
    let transcriber = ready_transcriber(ScriptedLoader::new("")).await?;
    let session = RecordingSession::new(Box::new(device), transcriber);

    session.start_recording().await?;
    session.stop_recording().await?;

    // Silence is diagnosed, not rejected; it transcribes to nothing.
    let text = timeout(WAIT, session.transcribe()).await??;
    assert_eq!(text, "");
    assert_eq!(session.status(), SessionStatus::Complete);

    Ok(())
}
