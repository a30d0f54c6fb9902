//! HTTP control surface
//!
//! The thin application around the pipeline: recording control,
//! transcription, and the upload → summarize → create-doc → log-row
//! publishing sequence.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
