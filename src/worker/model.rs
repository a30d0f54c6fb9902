use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::messages::DownloadProgress;

/// A loaded speech-recognition model. Created at most once per worker.
pub trait SpeechModel: Send {
    /// Transcribe mono 16 kHz samples. `on_partial` may be invoked zero or
    /// more times with advisory incremental output; the returned string is
    /// the authoritative transcript.
    fn transcribe(
        &mut self,
        samples: &[f32],
        on_partial: &mut dyn FnMut(String),
    ) -> Result<String>;
}

/// Acquires a [`SpeechModel`], reporting download progress along the way.
pub trait ModelLoader: Send + 'static {
    fn load(
        &mut self,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<Box<dyn SpeechModel>>;
}

/// Downloads a ggml Whisper model into the local cache (skipping the
/// download when already present) and builds a whisper.cpp context from it.
pub struct WhisperLoader {
    repo: String,
    model_file: String,
    cache_dir: PathBuf,
}

impl WhisperLoader {
    pub fn new(repo: impl Into<String>, model_file: impl Into<String>) -> Self {
        let cache_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("scribe-assist")
            .join("models");
        Self {
            repo: repo.into(),
            model_file: model_file.into(),
            cache_dir,
        }
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = dir;
        self
    }

    fn ensure_model_file(
        &self,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<PathBuf> {
        let dest = self.cache_dir.join(&self.model_file);
        if dest.exists() {
            info!("Model already cached at {:?}", dest);
            return Ok(dest);
        }

        std::fs::create_dir_all(&self.cache_dir)
            .context("failed to create model cache directory")?;

        let url = format!(
            "https://huggingface.co/{}/resolve/main/{}",
            self.repo, self.model_file
        );
        info!("Downloading model from {}", url);

        download_file(&url, &dest, |downloaded, total| {
            on_progress(DownloadProgress {
                file: self.model_file.clone(),
                downloaded_bytes: downloaded,
                total_bytes: total,
            });
        })?;

        Ok(dest)
    }
}

impl ModelLoader for WhisperLoader {
    fn load(
        &mut self,
        on_progress: &mut dyn FnMut(DownloadProgress),
    ) -> Result<Box<dyn SpeechModel>> {
        let model_path = self.ensure_model_file(on_progress)?;
        let model = WhisperModel::open(&model_path)?;
        Ok(Box::new(model))
    }
}

/// Owns a single whisper.cpp context so repeated runs reuse the same
/// memory-mapped model.
pub struct WhisperModel {
    ctx: WhisperContext,
}

impl WhisperModel {
    pub fn open(model_path: &Path) -> Result<Self> {
        let path = model_path
            .to_str()
            .ok_or_else(|| anyhow!("model path is not valid UTF-8: {:?}", model_path))?;
        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .context("failed to load whisper model")?;
        Ok(Self { ctx })
    }
}

impl SpeechModel for WhisperModel {
    fn transcribe(
        &mut self,
        samples: &[f32],
        _on_partial: &mut dyn FnMut(String),
    ) -> Result<String> {
        let mut state = self
            .ctx
            .create_state()
            .context("failed to create whisper state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some("en"));
        // Bounded so inference doesn't saturate every core.
        params.set_n_threads(num_cpus::get().min(8) as i32);
        params.set_print_progress(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_translate(false);
        params.set_token_timestamps(false);

        state.full(params, samples)?;

        // Whisper splits output into small segments; stitch them together.
        let mut transcript = String::new();
        let num_segments = state.full_n_segments();
        for i in 0..num_segments.max(0) {
            let Some(segment) = state.get_segment(i) else {
                continue;
            };
            if let Ok(text) = segment.to_str() {
                transcript.push_str(text);
            }
        }

        Ok(transcript.trim().to_string())
    }
}

/// Stream a URL to disk, reporting (downloaded, total) after each chunk.
/// Writes to a `.part` file and renames on completion so an interrupted
/// download never poses as a cached model.
fn download_file(
    url: &str,
    dest: &Path,
    mut on_progress: impl FnMut(u64, Option<u64>),
) -> Result<()> {
    let mut response = reqwest::blocking::get(url)
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("download rejected: {url}"))?;

    let total = response.content_length();
    let partial = dest.with_extension("part");
    let mut file =
        std::fs::File::create(&partial).context("failed to create model download file")?;

    let mut buf = [0u8; 64 * 1024];
    let mut downloaded: u64 = 0;
    let mut last_reported: u64 = 0;

    loop {
        let n = response.read(&mut buf).context("download read failed")?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).context("download write failed")?;
        downloaded += n as u64;

        // Throttle progress to ~1 MiB granularity.
        if downloaded - last_reported >= 1024 * 1024 {
            last_reported = downloaded;
            on_progress(downloaded, total);
        }
    }

    file.flush().context("download flush failed")?;
    drop(file);
    std::fs::rename(&partial, dest).context("failed to move model into cache")?;

    on_progress(downloaded, total);
    info!("Downloaded {} bytes to {:?}", downloaded, dest);

    Ok(())
}
