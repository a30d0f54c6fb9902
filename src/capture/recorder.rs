use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::device::CaptureDevice;
use crate::audio::{CodecTag, EncodedAudio};
use crate::error::PipelineError;

/// Recording lifecycle state. `Stopped` means a finalized artifact is held;
/// the machine is re-enterable from `Idle` or `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

/// Capture controller: owns the device for the duration of one recording,
/// accumulates its encoded chunks, and finalizes them into a single
/// immutable [`EncodedAudio`] artifact.
pub struct Recorder {
    device: Box<dyn CaptureDevice>,
    state: RecorderState,
    elapsed: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
    collector: Option<JoinHandle<Vec<u8>>>,
    codec: Option<CodecTag>,
    finalized: Option<EncodedAudio>,
}

impl Recorder {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            state: RecorderState::Idle,
            elapsed: Arc::new(AtomicU64::new(0)),
            ticker: None,
            collector: None,
            codec: None,
            finalized: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Whole seconds elapsed since the current recording started.
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    /// The most recent finalized artifact, if any.
    pub fn finalized(&self) -> Option<&EncodedAudio> {
        self.finalized.as_ref()
    }

    /// Codec the device negotiated for the current/last recording.
    pub fn codec(&self) -> Option<&CodecTag> {
        self.codec.as_ref()
    }

    /// Acquire the input and begin recording.
    ///
    /// Rejects with [`PipelineError::AlreadyRecording`] while a recording is
    /// in progress; the active session is never silently replaced.
    pub async fn start(&mut self) -> Result<(), PipelineError> {
        if self.state == RecorderState::Recording {
            warn!("Start requested while already recording; rejecting");
            return Err(PipelineError::AlreadyRecording);
        }

        let stream = self.device.start().await?;
        self.codec = Some(stream.codec.clone());

        info!(
            "Recording started on {} ({})",
            self.device.name(),
            stream.codec
        );

        self.elapsed.store(0, Ordering::SeqCst);
        let elapsed = Arc::clone(&self.elapsed);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                elapsed.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let mut chunks = stream.chunks;
        self.collector = Some(tokio::spawn(async move {
            let mut buf = Vec::new();
            while let Some(chunk) = chunks.recv().await {
                buf.extend_from_slice(&chunk);
            }
            buf
        }));

        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Stop recording and finalize the artifact.
    ///
    /// No-op unless `Recording`. Finalization must complete before the
    /// device is released; releasing early would drop buffered trailing
    /// audio.
    pub async fn stop(&mut self) -> Result<Option<&EncodedAudio>, PipelineError> {
        if self.state != RecorderState::Recording {
            return Ok(self.finalized.as_ref());
        }

        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }

        if let Err(e) = self.device.finalize().await {
            error!("Finalization failed: {}", e);
            self.abort_collector();
            self.device.release();
            // No new artifact was produced; Stopped is only justified by a
            // previously finalized one.
            self.state = if self.finalized.is_some() {
                RecorderState::Stopped
            } else {
                RecorderState::Idle
            };
            return Err(e);
        }

        let bytes = match self.collector.take() {
            Some(collector) => match collector.await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Chunk collector task panicked: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let codec = self
            .codec
            .clone()
            .unwrap_or_else(|| CodecTag::new("application/octet-stream"));

        info!(
            "Recording stopped after {}s: {} bytes ({})",
            self.elapsed_seconds(),
            bytes.len(),
            codec
        );

        // Only the most recent recording is retained.
        self.finalized = Some(EncodedAudio::new(bytes, codec));

        // Release strictly after finalization so no trailing audio is lost.
        self.device.release();
        self.state = RecorderState::Stopped;

        Ok(self.finalized.as_ref())
    }

    fn abort_collector(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Abnormal teardown mid-recording must still release the microphone.
        if self.state == RecorderState::Recording {
            warn!("Recorder dropped while recording; releasing input");
            self.device.release();
            if let Some(ticker) = self.ticker.take() {
                ticker.abort();
            }
            self.abort_collector();
        }
    }
}
