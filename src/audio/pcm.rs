/// Sample rate every decoded buffer is normalized to. Whisper models take
/// 16 kHz mono input.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Mono f32 PCM, always at [`TARGET_SAMPLE_RATE`] once it leaves the decode
/// stage.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn peak_amplitude(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    /// True when every sample is exactly zero. A silent buffer usually means
    /// the wrong input was captured; it still transcribes (to nothing).
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }
}
