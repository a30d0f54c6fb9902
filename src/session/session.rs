use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::status::{SessionSnapshot, SessionStatus};
use crate::audio::{decode_to_pcm, EncodedAudio};
use crate::capture::{CaptureDevice, Recorder};
use crate::error::PipelineError;
use crate::worker::Transcriber;

/// One capture-to-transcript cycle.
///
/// Owns the capture controller; the transcriber is the process-wide worker
/// session, shared by handle. At most one recording is active at a time and
/// each stage gates on the previous one's success.
pub struct RecordingSession {
    name: String,
    created_at: DateTime<Utc>,
    recorder: Mutex<Recorder>,
    transcriber: Arc<Transcriber>,
    status: StdMutex<SessionStatus>,
}

impl RecordingSession {
    pub fn new(device: Box<dyn CaptureDevice>, transcriber: Arc<Transcriber>) -> Self {
        let name = format!("session-{}", uuid::Uuid::new_v4());
        info!("Created recording session: {}", name);

        Self {
            name,
            created_at: Utc::now(),
            recorder: Mutex::new(Recorder::new(device)),
            transcriber,
            status: StdMutex::new(SessionStatus::Idle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.lock().expect("session status mutex poisoned")
    }

    /// Begin recording. Rejected while a recording is already in progress;
    /// a permission failure surfaces immediately and leaves the session in
    /// its prior state.
    pub async fn start_recording(&self) -> Result<(), PipelineError> {
        let mut recorder = self.recorder.lock().await;
        recorder.start().await?;
        self.set_status(SessionStatus::Recording);
        Ok(())
    }

    /// Stop and finalize. No-op when not recording. A finalization failure
    /// is surfaced, never swallowed.
    pub async fn stop_recording(&self) -> Result<(), PipelineError> {
        let mut recorder = self.recorder.lock().await;
        match recorder.stop().await {
            Ok(finalized) => {
                if finalized.is_some() {
                    self.set_status(SessionStatus::Stopped);
                }
                Ok(())
            }
            Err(e) => {
                self.set_status(SessionStatus::Failed);
                Err(e)
            }
        }
    }

    /// The finalized artifact, cloned for upload.
    pub async fn encoded_audio(&self) -> Option<EncodedAudio> {
        self.recorder.lock().await.finalized().cloned()
    }

    /// Decode the finalized recording and run one transcription pass.
    ///
    /// The transcript starts empty for every call; a decode failure is
    /// surfaced distinctly from a transcription failure and either one
    /// clears the busy state so the user can retry.
    pub async fn transcribe(&self) -> Result<String, PipelineError> {
        let encoded = self
            .encoded_audio()
            .await
            .ok_or(PipelineError::NoRecording)?;

        self.set_status(SessionStatus::Decoding);

        // Decode is CPU-bound; keep it off the async threads.
        let pcm = match tokio::task::spawn_blocking(move || decode_to_pcm(&encoded)).await {
            Ok(Ok(pcm)) => pcm,
            Ok(Err(e)) => {
                self.set_status(SessionStatus::Failed);
                return Err(e);
            }
            Err(e) => {
                self.set_status(SessionStatus::Failed);
                return Err(PipelineError::Decode(format!("decode task failed: {e}")));
            }
        };

        if pcm.is_silent() {
            warn!("Session {}: decoded audio is silent", self.name);
        }

        self.set_status(SessionStatus::Transcribing);

        let run_id = self.transcriber.dispatch(&pcm).map_err(|e| {
            self.set_status(SessionStatus::Failed);
            e
        })?;

        match self.transcriber.wait_for_run(run_id).await {
            Ok(text) => {
                self.set_status(SessionStatus::Complete);
                Ok(text)
            }
            Err(e) => {
                self.set_status(SessionStatus::Failed);
                Err(e)
            }
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let recorder = self.recorder.lock().await;
        let transcriber = self.transcriber.snapshot();

        SessionSnapshot {
            name: self.name.clone(),
            status: self.status(),
            elapsed_seconds: recorder.elapsed_seconds(),
            codec: recorder.codec().map(|c| c.mime.clone()),
            audio_bytes: recorder.finalized().map(|a| a.len()).unwrap_or(0),
            transcript: transcriber.transcript,
            model: transcriber.load_state,
            busy: transcriber.busy,
        }
    }

    fn set_status(&self, status: SessionStatus) {
        *self.status.lock().expect("session status mutex poisoned") = status;
    }
}
