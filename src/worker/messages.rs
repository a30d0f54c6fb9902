use serde::Serialize;

/// Requests sent from the application to the inference worker.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Acquire the model if not already loaded. Idempotent: a repeat while
    /// the model is loaded re-emits `Ready` without re-acquiring.
    Load,
    /// Run inference over a normalized PCM buffer. Only valid once loaded.
    Generate { run_id: u64, samples: Vec<f32> },
}

/// Events emitted by the worker, delivered FIFO.
///
/// `Partial` is advisory; the single `Complete` for a run carries the
/// authoritative transcript and supersedes every prior partial for that run.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Model acquisition succeeded; `Generate` is now accepted.
    Ready,
    /// Progress during model acquisition. Informational only.
    Download(DownloadProgress),
    /// Incremental output for an in-flight run, if the model produces any.
    Partial { run_id: u64, text: String },
    /// Final, cumulative transcript for a run.
    Complete { run_id: u64, text: String },
    /// Load failure (`run_id` None) or a failed run (`run_id` set). The
    /// worker stays usable for subsequent requests either way; a failed
    /// load leaves it unloaded until the next `Load`.
    Error { run_id: Option<u64>, message: String },
}

/// Model acquisition progress, as reported by the downloader.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub file: String,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
}

/// Caller-side view of the worker's model lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Unloaded,
    Downloading,
    Ready,
    Error,
}
