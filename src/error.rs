use thiserror::Error;

/// Failure taxonomy for the capture → decode → transcribe pipeline.
///
/// Each variant maps to a distinct user-facing recovery: permission and
/// capture errors block recording, decode errors discard the recording,
/// model/inference errors leave the worker usable for another attempt.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Microphone unavailable or access denied.
    #[error("microphone unavailable: {0}")]
    Permission(String),

    /// A recording is already in progress; only one session may be active.
    #[error("recording already in progress")]
    AlreadyRecording,

    /// No finalized recording exists for the requested operation.
    #[error("no finalized recording available")]
    NoRecording,

    /// The encoded audio bytes could not be parsed or decoded.
    #[error("could not decode audio: {0}")]
    Decode(String),

    /// The speech model could not be acquired or initialized.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// A single transcription run failed; the worker remains usable.
    #[error("transcription failed: {0}")]
    Inference(String),

    /// The inference worker is gone (channel closed / thread exited).
    #[error("inference worker unavailable")]
    WorkerGone,
}
