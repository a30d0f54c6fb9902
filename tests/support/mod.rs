// Shared test doubles and audio fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use scribe_assist::{
    CaptureDevice, CaptureStream, CodecTag, DownloadProgress, ModelLoader, PipelineError,
    SpeechModel,
};
use tokio::sync::mpsc;

/// Scripted capture device: hands out canned encoded chunks instead of
/// touching real audio hardware. Records the order of lifecycle calls so
/// tests can assert finalize-before-release.
pub struct ScriptedDevice {
    codec: CodecTag,
    chunks: Vec<Vec<u8>>,
    queued: VecDeque<Vec<Vec<u8>>>,
    tail: Option<Vec<u8>>,
    deny: bool,
    finalize_failures: VecDeque<bool>,
    tx: Option<mpsc::Sender<Vec<u8>>>,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedDevice {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            codec: wav_codec(16000),
            chunks,
            queued: VecDeque::new(),
            tail: None,
            deny: false,
            finalize_failures: VecDeque::new(),
            tx: None,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A device whose input acquisition always fails.
    pub fn denied() -> Self {
        let mut device = Self::new(Vec::new());
        device.deny = true;
        device
    }

    pub fn with_codec(mut self, codec: CodecTag) -> Self {
        self.codec = codec;
        self
    }

    /// A chunk emitted only at finalization, after the stop request.
    pub fn with_tail(mut self, tail: Vec<u8>) -> Self {
        self.tail = Some(tail);
        self
    }

    /// Queue a chunk list for one future `start`; queued lists are consumed
    /// in order before falling back to the default chunks.
    pub fn queue_chunks(mut self, chunks: Vec<Vec<u8>>) -> Self {
        self.queued.push_back(chunks);
        self
    }

    /// Script outcomes for future `finalize` calls, in order; `true` means
    /// fail. Calls beyond the queue succeed.
    pub fn finalize_outcomes(mut self, failures: Vec<bool>) -> Self {
        self.finalize_failures = failures.into();
        self
    }

    /// Handle onto the lifecycle log, usable after the device is boxed.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<&'static str>>> {
        Arc::clone(&self.log)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    async fn start(&mut self) -> Result<CaptureStream, PipelineError> {
        self.log.lock().unwrap().push("start");

        if self.deny {
            return Err(PipelineError::Permission(
                "microphone access denied".into(),
            ));
        }

        let chunks = self
            .queued
            .pop_front()
            .unwrap_or_else(|| self.chunks.clone());

        let (tx, rx) = mpsc::channel(chunks.len() + 2);
        for chunk in chunks {
            tx.try_send(chunk).expect("scripted chunk channel overflow");
        }
        self.tx = Some(tx);

        Ok(CaptureStream {
            codec: self.codec.clone(),
            chunks: rx,
        })
    }

    async fn finalize(&mut self) -> Result<(), PipelineError> {
        self.log.lock().unwrap().push("finalize");

        if self.finalize_failures.pop_front().unwrap_or(false) {
            self.tx.take();
            return Err(PipelineError::Permission("capture stream lost".into()));
        }

        if let Some(tx) = self.tx.take() {
            if let Some(tail) = self.tail.clone() {
                let _ = tx.send(tail).await;
            }
            // Dropping the sender closes the chunk channel.
        }
        Ok(())
    }

    fn release(&mut self) {
        self.log.lock().unwrap().push("release");
        self.tx.take();
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// One scripted transcription run for [`ScriptedModel`].
pub enum ScriptedRun {
    /// Succeed with this transcript, no partials.
    Text(&'static str),
    /// Emit the partials in order, then succeed with the final text.
    Partials {
        partials: Vec<&'static str>,
        final_text: &'static str,
    },
    /// Fail with this message.
    Fail(&'static str),
    /// Emit the partials, then block until the paired gate sender signals
    /// or is dropped, then succeed with the final text.
    Gated {
        partials: Vec<&'static str>,
        final_text: &'static str,
        gate: std::sync::mpsc::Receiver<()>,
    },
}

/// Build a gated run plus the sender that releases it.
pub fn gated_run(
    partials: Vec<&'static str>,
    final_text: &'static str,
) -> (ScriptedRun, std::sync::mpsc::Sender<()>) {
    let (tx, rx) = std::sync::mpsc::channel();
    (
        ScriptedRun::Gated {
            partials,
            final_text,
            gate: rx,
        },
        tx,
    )
}

/// Deterministic speech model: plays back scripted runs in order, then
/// falls back to a fixed transcript.
pub struct ScriptedModel {
    runs: VecDeque<ScriptedRun>,
    fallback: &'static str,
}

impl SpeechModel for ScriptedModel {
    fn transcribe(
        &mut self,
        _samples: &[f32],
        on_partial: &mut dyn FnMut(String),
    ) -> Result<String> {
        match self.runs.pop_front() {
            None => Ok(self.fallback.to_string()),
            Some(ScriptedRun::Text(text)) => Ok(text.to_string()),
            Some(ScriptedRun::Partials {
                partials,
                final_text,
            }) => {
                for partial in partials {
                    on_partial(partial.to_string());
                }
                Ok(final_text.to_string())
            }
            Some(ScriptedRun::Fail(message)) => Err(anyhow!(message)),
            Some(ScriptedRun::Gated {
                partials,
                final_text,
                gate,
            }) => {
                for partial in partials {
                    on_partial(partial.to_string());
                }
                let _ = gate.recv();
                Ok(final_text.to_string())
            }
        }
    }
}

/// Loader for [`ScriptedModel`]: counts acquisitions, reports synthetic
/// download progress, and can be told to fail a number of loads first.
pub struct ScriptedLoader {
    runs: VecDeque<ScriptedRun>,
    fallback: &'static str,
    failures_remaining: usize,
    loads: Arc<AtomicUsize>,
}

impl ScriptedLoader {
    pub fn new(fallback: &'static str) -> Self {
        Self {
            runs: VecDeque::new(),
            fallback,
            failures_remaining: 0,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_runs(mut self, runs: Vec<ScriptedRun>) -> Self {
        self.runs = runs.into();
        self
    }

    pub fn fail_next_load(mut self) -> Self {
        self.failures_remaining += 1;
        self
    }

    /// Counter of how many times `load` actually ran, usable after the
    /// loader moves into the worker.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

impl ModelLoader for ScriptedLoader {
    fn load(
        &mut self,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<Box<dyn SpeechModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);

        on_progress(DownloadProgress {
            file: "scripted.bin".into(),
            downloaded_bytes: 0,
            total_bytes: Some(1024),
        });

        if self.failures_remaining > 0 {
            self.failures_remaining -= 1;
            return Err(anyhow!("model fetch failed"));
        }

        on_progress(DownloadProgress {
            file: "scripted.bin".into(),
            downloaded_bytes: 1024,
            total_bytes: Some(1024),
        });

        Ok(Box::new(ScriptedModel {
            runs: std::mem::take(&mut self.runs),
            fallback: self.fallback,
        }))
    }
}

/// Codec tag matching what the in-memory WAV fixtures actually contain.
pub fn wav_codec(sample_rate: u32) -> CodecTag {
    CodecTag::new(format!(
        "audio/wav;codecs=pcm_s16le;rate={sample_rate};channels=1"
    ))
}

/// Encode interleaved i16 samples as an in-memory WAV file.
pub fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for &sample in samples {
            writer.write_sample(sample).expect("wav sample");
        }
        writer.finalize().expect("wav finalize");
    }
    cursor.into_inner()
}

/// A half-amplitude sine tone.
pub fn sine_samples(freq_hz: f32, sample_rate: u32, seconds: f32) -> Vec<i16> {
    let count = (sample_rate as f32 * seconds) as usize;
    (0..count)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let value = (2.0 * std::f32::consts::PI * freq_hz * t).sin() * 0.5;
            (value * i16::MAX as f32) as i16
        })
        .collect()
}

/// Mono 440 Hz sine WAV.
pub fn sine_wav(sample_rate: u32, seconds: f32) -> Vec<u8> {
    wav_bytes(&sine_samples(440.0, sample_rate, seconds), sample_rate, 1)
}

/// Mono all-zero WAV.
pub fn silent_wav(sample_rate: u32, seconds: f32) -> Vec<u8> {
    let count = (sample_rate as f32 * seconds) as usize;
    wav_bytes(&vec![0i16; count], sample_rate, 1)
}

/// Stereo WAV from separate left and right channels.
pub fn stereo_wav(left: &[i16], right: &[i16], sample_rate: u32) -> Vec<u8> {
    assert_eq!(left.len(), right.len());
    let interleaved: Vec<i16> = left
        .iter()
        .zip(right.iter())
        .flat_map(|(&l, &r)| [l, r])
        .collect();
    wav_bytes(&interleaved, sample_rate, 2)
}
