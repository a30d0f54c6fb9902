use serde::Serialize;

use crate::worker::LoadState;

/// Lifecycle of a capture-to-transcript cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Recording,
    /// A finalized encoded artifact is held.
    Stopped,
    Decoding,
    Transcribing,
    Complete,
    Failed,
}

/// Point-in-time view of a session, serialized by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub name: String,
    pub status: SessionStatus,
    pub elapsed_seconds: u64,
    /// Codec the capture device negotiated, once known.
    pub codec: Option<String>,
    /// Size of the finalized encoded artifact, zero before finalization.
    pub audio_bytes: usize,
    pub transcript: String,
    pub model: LoadState,
    pub busy: bool,
}
