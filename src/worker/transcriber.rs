use std::sync::Mutex;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::messages::{DownloadProgress, LoadState, WorkerEvent};
use super::model::ModelLoader;
use super::worker::InferenceWorker;
use crate::audio::PcmBuffer;
use crate::error::PipelineError;

/// Caller-side session around the inference worker.
///
/// Created once at startup and shared by handle; `load` is sent immediately
/// on creation. Every `Generate` dispatch gets a fresh run id, and events
/// carrying any other run id are discarded, so a stale result from an
/// abandoned run can never overwrite the current transcript.
pub struct Transcriber {
    worker: InferenceWorker,
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    changed: Notify,
}

struct State {
    load_state: LoadState,
    busy: bool,
    transcript: String,
    partial: Option<String>,
    last_error: Option<String>,
    download: Option<DownloadProgress>,
    current_run: u64,
    dispatched_runs: u64,
}

/// Point-in-time view of the transcriber, safe to serialize for status
/// endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriberSnapshot {
    pub load_state: LoadState,
    pub busy: bool,
    pub transcript: String,
    pub partial: Option<String>,
    pub last_error: Option<String>,
}

impl Transcriber {
    /// Spawn the worker, start pumping its events, and request the model
    /// load immediately.
    pub fn new<L: ModelLoader>(loader: L) -> Self {
        let (worker, events) = InferenceWorker::spawn(loader);

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                load_state: LoadState::Unloaded,
                busy: false,
                transcript: String::new(),
                partial: None,
                last_error: None,
                download: None,
                current_run: 0,
                dispatched_runs: 0,
            }),
            changed: Notify::new(),
        });

        tokio::spawn(pump_events(events, Arc::clone(&shared)));

        let transcriber = Self { worker, shared };
        if transcriber.worker.load().is_err() {
            warn!("Inference worker exited before the initial load request");
        }
        transcriber
    }

    pub fn snapshot(&self) -> TranscriberSnapshot {
        let state = self.lock_state();
        TranscriberSnapshot {
            load_state: state.load_state,
            busy: state.busy,
            transcript: state.transcript.clone(),
            partial: state.partial.clone(),
            last_error: state.last_error.clone(),
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.lock_state().load_state
    }

    pub fn is_busy(&self) -> bool {
        self.lock_state().busy
    }

    pub fn transcript(&self) -> String {
        self.lock_state().transcript.clone()
    }

    /// Re-request a model load after a load failure.
    pub fn reload(&self) -> Result<(), PipelineError> {
        {
            let mut state = self.lock_state();
            if state.load_state == LoadState::Error {
                state.load_state = LoadState::Unloaded;
                state.last_error = None;
            }
        }
        self.worker.load()
    }

    /// Dispatch one transcription run. Resets the transcript to empty:
    /// runs never accumulate across recordings.
    ///
    /// Dispatching while a run is in flight supersedes it: the new run id
    /// becomes current and any late events from the old run are discarded.
    /// Callers are still expected to disable the triggering control while
    /// busy; supersession is the safety net, not the intended flow.
    pub fn dispatch(&self, pcm: &PcmBuffer) -> Result<u64, PipelineError> {
        let run_id = {
            let mut state = self.lock_state();
            if state.busy {
                warn!("Dispatch while run {} is in flight; superseding", state.current_run);
            }
            state.dispatched_runs += 1;
            state.current_run = state.dispatched_runs;
            state.busy = true;
            state.transcript.clear();
            state.partial = None;
            state.last_error = None;
            state.current_run
        };

        if let Err(e) = self.worker.generate(run_id, pcm.samples().to_vec()) {
            let mut state = self.lock_state();
            state.busy = false;
            state.last_error = Some(e.to_string());
            return Err(e);
        }

        info!("Dispatched transcription run {}", run_id);
        Ok(run_id)
    }

    /// Wait until the given run completes, returning its final transcript.
    ///
    /// Errors with [`PipelineError::Inference`] when the run failed or was
    /// superseded by a newer dispatch.
    pub async fn wait_for_run(&self, run_id: u64) -> Result<String, PipelineError> {
        loop {
            let notified = self.shared.changed.notified();
            {
                let state = self.lock_state();
                if state.current_run != run_id {
                    return Err(PipelineError::Inference(
                        "run superseded by a newer dispatch".into(),
                    ));
                }
                if !state.busy {
                    return match &state.last_error {
                        Some(message) => Err(PipelineError::Inference(message.clone())),
                        None => Ok(state.transcript.clone()),
                    };
                }
            }
            notified.await;
        }
    }

    /// Wait until the model is `Ready`, or error once the load fails.
    pub async fn wait_until_ready(&self) -> Result<(), PipelineError> {
        loop {
            let notified = self.shared.changed.notified();
            {
                let state = self.lock_state();
                match state.load_state {
                    LoadState::Ready => return Ok(()),
                    LoadState::Error => {
                        let message = state
                            .last_error
                            .clone()
                            .unwrap_or_else(|| "model load failed".into());
                        return Err(PipelineError::ModelLoad(message));
                    }
                    LoadState::Unloaded | LoadState::Downloading => {}
                }
            }
            notified.await;
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .expect("transcriber state mutex poisoned")
    }
}

async fn pump_events(mut events: mpsc::UnboundedReceiver<WorkerEvent>, shared: Arc<Shared>) {
    while let Some(event) = events.recv().await {
        {
            let mut state = shared
                .state
                .lock()
                .expect("transcriber state mutex poisoned");

            match event {
                WorkerEvent::Ready => {
                    info!("Speech model ready");
                    state.load_state = LoadState::Ready;
                    state.download = None;
                }
                WorkerEvent::Download(progress) => {
                    debug!(
                        "Model download: {} {}/{:?} bytes",
                        progress.file, progress.downloaded_bytes, progress.total_bytes
                    );
                    state.load_state = LoadState::Downloading;
                    state.download = Some(progress);
                }
                WorkerEvent::Partial { run_id, text } => {
                    if run_id == state.current_run {
                        state.partial = Some(text);
                    } else {
                        debug!("Discarding stale partial from run {}", run_id);
                    }
                }
                WorkerEvent::Complete { run_id, text } => {
                    if run_id == state.current_run {
                        info!("Run {} complete: {} chars", run_id, text.len());
                        state.transcript = text;
                        state.partial = None;
                        state.busy = false;
                    } else {
                        debug!("Discarding stale completion from run {}", run_id);
                    }
                }
                WorkerEvent::Error { run_id, message } => match run_id {
                    None => {
                        warn!("Model load failed: {}", message);
                        state.load_state = LoadState::Error;
                        state.last_error = Some(message);
                    }
                    Some(id) if id == state.current_run => {
                        warn!("Run {} failed: {}", id, message);
                        state.busy = false;
                        state.last_error = Some(message);
                    }
                    Some(id) => debug!("Discarding stale error from run {}", id),
                },
            }
        }
        shared.changed.notify_waiters();
    }

    debug!("Worker event channel closed");
}
