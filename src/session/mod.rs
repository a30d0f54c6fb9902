//! Recording session orchestration
//!
//! One capture-to-transcript cycle: recording lifecycle, decode gating,
//! transcription dispatch, and status snapshots for the HTTP layer.

mod session;
mod status;

pub use session::RecordingSession;
pub use status::{SessionSnapshot, SessionStatus};
