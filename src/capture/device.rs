use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SupportedStreamConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::audio::CodecTag;
use crate::error::PipelineError;

/// Live capture stream: the codec the device negotiated plus a channel of
/// encoded chunks. The channel closes once finalization has flushed all
/// buffered audio.
pub struct CaptureStream {
    pub codec: CodecTag,
    pub chunks: mpsc::Receiver<Vec<u8>>,
}

/// Device-level audio capture boundary.
///
/// The codec is chosen by the device, not the caller; it is reported through
/// [`CaptureStream::codec`] after acquisition succeeds.
#[async_trait::async_trait]
pub trait CaptureDevice: Send {
    /// Request access to the input and begin capturing.
    ///
    /// Fails with [`PipelineError::Permission`] when the input is denied or
    /// unavailable.
    async fn start(&mut self) -> Result<CaptureStream, PipelineError>;

    /// Flush buffered audio into the chunk channel and close it.
    async fn finalize(&mut self) -> Result<(), PipelineError>;

    /// Stop the underlying input and release it. Idempotent.
    fn release(&mut self);

    /// Device name for logging.
    fn name(&self) -> &str;
}

/// Default-input microphone device.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated OS thread
/// for the whole capture. The thread accumulates samples and, on stop,
/// encodes them into one in-memory WAV chunk at the rate and channel count
/// the device actually negotiated.
pub struct MicrophoneDevice {
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneDevice {
    pub fn new() -> Self {
        Self {
            stop_tx: None,
            thread: None,
        }
    }
}

impl Default for MicrophoneDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MicrophoneDevice {
    async fn start(&mut self) -> Result<CaptureStream, PipelineError> {
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>(16);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<CodecTag, PipelineError>>();

        let thread = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || capture_thread(stop_rx, chunk_tx, ready_tx))
            .map_err(|e| PipelineError::Permission(format!("capture thread failed: {e}")))?;

        let codec = match ready_rx.await {
            Ok(Ok(codec)) => codec,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(PipelineError::Permission(
                    "capture thread exited before acquiring the input".into(),
                ))
            }
        };

        info!("Microphone acquired, negotiated codec: {}", codec);

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);

        Ok(CaptureStream {
            codec,
            chunks: chunk_rx,
        })
    }

    async fn finalize(&mut self) -> Result<(), PipelineError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || {
                if thread.join().is_err() {
                    error!("Capture thread panicked during finalization");
                }
            })
            .await
            .map_err(|e| PipelineError::Permission(format!("finalize join failed: {e}")))?;
        }
        Ok(())
    }

    fn release(&mut self) {
        // Normal stop already joined the thread; this path only fires on
        // abnormal teardown while still recording.
        if let Some(stop_tx) = self.stop_tx.take() {
            warn!("Releasing microphone without finalization");
            let _ = stop_tx.send(());
        }
        self.thread.take();
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Body of the capture thread: build the input stream, accumulate samples
/// until stopped, then encode everything into a single WAV chunk.
fn capture_thread(
    stop_rx: std::sync::mpsc::Receiver<()>,
    chunk_tx: mpsc::Sender<Vec<u8>>,
    ready_tx: oneshot::Sender<Result<CodecTag, PipelineError>>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(PipelineError::Permission(
                "no input device available".into(),
            )));
            return;
        }
    };

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(PipelineError::Permission(format!(
                "input config unavailable: {e}"
            ))));
            return;
        }
    };

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let samples: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));

    let stream = match build_stream(&device, &supported, Arc::clone(&samples)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(PipelineError::Permission(format!(
            "input stream failed to start: {e}"
        ))));
        return;
    }

    // The negotiated codec is reported after acquisition, never assumed.
    let codec = CodecTag::new(format!(
        "audio/wav;codecs=pcm_s16le;rate={sample_rate};channels={channels}"
    ));
    if ready_tx.send(Ok(codec)).is_err() {
        return; // caller went away
    }

    // Block until stop; the sender side dropping also counts as stop.
    let _ = stop_rx.recv();

    // Dropping the stream stops the input before we flush, so no samples can
    // arrive mid-encode.
    drop(stream);

    let captured = samples
        .lock()
        .expect("capture sample buffer mutex poisoned")
        .clone();

    match encode_wav(&captured, sample_rate, channels) {
        Ok(bytes) => {
            info!(
                "Capture finalized: {} samples -> {} WAV bytes",
                captured.len(),
                bytes.len()
            );
            if chunk_tx.blocking_send(bytes).is_err() {
                warn!("Capture chunk receiver dropped before finalization");
            }
        }
        Err(e) => error!("Failed to encode captured audio: {}", e),
    }
    // chunk_tx drops here, closing the channel.
}

fn build_stream(
    device: &cpal::Device,
    supported: &SupportedStreamConfig,
    samples: Arc<Mutex<Vec<f32>>>,
) -> Result<cpal::Stream, PipelineError> {
    let config = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_typed_stream::<f32>(device, &config, samples),
        SampleFormat::I16 => build_typed_stream::<i16>(device, &config, samples),
        SampleFormat::U16 => build_typed_stream::<u16>(device, &config, samples),
        other => {
            return Err(PipelineError::Permission(format!(
                "unsupported input sample format: {other}"
            )))
        }
    };

    stream.map_err(|e| PipelineError::Permission(format!("failed to open input stream: {e}")))
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: Arc<Mutex<Vec<f32>>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mut buf = samples
                .lock()
                .expect("capture sample buffer mutex poisoned");
            buf.extend(data.iter().map(|s| f32::from_sample(*s)));
        },
        |e| error!("Input stream error: {}", e),
        None,
    )
}

/// Encode interleaved f32 samples as 16-bit PCM WAV, in memory.
fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let int_sample = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(int_sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
