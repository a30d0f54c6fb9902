//! Inference worker: a dedicated thread hosting the speech model, spoken to
//! exclusively through typed messages over FIFO channels.

pub mod messages;
pub mod model;
pub mod transcriber;
pub mod worker;

pub use messages::{DownloadProgress, LoadState, WorkerEvent, WorkerRequest};
pub use model::{ModelLoader, SpeechModel, WhisperLoader};
pub use transcriber::{Transcriber, TranscriberSnapshot};
pub use worker::InferenceWorker;
