use tokio::sync::mpsc;
use tracing::{info, warn};

use super::messages::{DownloadProgress, WorkerEvent, WorkerRequest};
use super::model::{ModelLoader, SpeechModel};
use crate::error::PipelineError;

/// Handle to the inference worker thread.
///
/// The thread owns at most one loaded model for its entire lifetime and is
/// driven purely by [`WorkerRequest`] messages; results come back as
/// [`WorkerEvent`]s in FIFO order. Dropping the handle closes the request
/// channel, which terminates the thread.
pub struct InferenceWorker {
    requests: mpsc::UnboundedSender<WorkerRequest>,
    _thread: std::thread::JoinHandle<()>,
}

impl InferenceWorker {
    /// Spawn the worker thread. The caller receives the event channel; no
    /// state is shared with the thread besides the two channels.
    pub fn spawn<L: ModelLoader>(loader: L) -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let thread = std::thread::spawn(move || worker_loop(loader, req_rx, event_tx));

        (
            Self {
                requests: req_tx,
                _thread: thread,
            },
            event_rx,
        )
    }

    pub fn send(&self, request: WorkerRequest) -> Result<(), PipelineError> {
        self.requests
            .send(request)
            .map_err(|_| PipelineError::WorkerGone)
    }

    pub fn load(&self) -> Result<(), PipelineError> {
        self.send(WorkerRequest::Load)
    }

    pub fn generate(&self, run_id: u64, samples: Vec<f32>) -> Result<(), PipelineError> {
        self.send(WorkerRequest::Generate { run_id, samples })
    }
}

fn worker_loop<L: ModelLoader>(
    mut loader: L,
    mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut model: Option<Box<dyn SpeechModel>> = None;

    while let Some(request) = requests.blocking_recv() {
        match request {
            WorkerRequest::Load => {
                if model.is_some() {
                    // Idempotent: confirm readiness without re-acquiring.
                    let _ = events.send(WorkerEvent::Ready);
                    continue;
                }

                let mut on_progress = |progress: DownloadProgress| {
                    let _ = events.send(WorkerEvent::Download(progress));
                };

                match loader.load(&mut on_progress) {
                    Ok(loaded) => {
                        info!("Speech model loaded");
                        model = Some(loaded);
                        let _ = events.send(WorkerEvent::Ready);
                    }
                    Err(e) => {
                        warn!("Model load failed: {:#}", e);
                        let _ = events.send(WorkerEvent::Error {
                            run_id: None,
                            message: format!("{e:#}"),
                        });
                    }
                }
            }

            WorkerRequest::Generate { run_id, samples } => {
                let Some(model) = model.as_mut() else {
                    let _ = events.send(WorkerEvent::Error {
                        run_id: Some(run_id),
                        message: "model not loaded; send load first".into(),
                    });
                    continue;
                };

                if samples.is_empty() {
                    let _ = events.send(WorkerEvent::Error {
                        run_id: Some(run_id),
                        message: "empty audio buffer".into(),
                    });
                    continue;
                }

                info!(
                    "Transcribing run {} ({:.1}s of audio)",
                    run_id,
                    samples.len() as f64 / crate::audio::TARGET_SAMPLE_RATE as f64
                );

                let partial_events = events.clone();
                let mut on_partial = move |text: String| {
                    let _ = partial_events.send(WorkerEvent::Partial { run_id, text });
                };

                let event = match model.transcribe(&samples, &mut on_partial) {
                    Ok(text) => WorkerEvent::Complete { run_id, text },
                    Err(e) => WorkerEvent::Error {
                        run_id: Some(run_id),
                        message: format!("{e:#}"),
                    },
                };
                let _ = events.send(event);
            }
        }
    }

    info!("Inference worker shutting down");
}
