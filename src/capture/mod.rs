//! Recording lifecycle: microphone acquisition, encoded-chunk accumulation,
//! and finalization into a single codec-tagged artifact.

pub mod device;
pub mod recorder;

pub use device::{CaptureDevice, CaptureStream, MicrophoneDevice};
pub use recorder::{Recorder, RecorderState};
