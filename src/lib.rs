pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod services;
pub mod session;
pub mod worker;

pub use audio::{decode_to_pcm, CodecTag, EncodedAudio, PcmBuffer, TARGET_SAMPLE_RATE};
pub use capture::{CaptureDevice, CaptureStream, MicrophoneDevice, Recorder, RecorderState};
pub use config::Config;
pub use error::PipelineError;
pub use http::{create_router, AppState};
pub use services::{SessionLogEntry, TokenStore};
pub use session::{RecordingSession, SessionSnapshot, SessionStatus};
pub use worker::{
    DownloadProgress, InferenceWorker, LoadState, ModelLoader, SpeechModel, Transcriber,
    WhisperLoader, WorkerEvent, WorkerRequest,
};
