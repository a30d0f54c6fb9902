//! Downstream collaborators: Google Drive/Docs/Sheets and the Gemini
//! summarization endpoint, plus the persisted bearer credential they all
//! require. Invoked strictly in the order upload → summarize → create-doc →
//! log-row; any failure aborts the remaining steps.

pub mod auth;
pub mod docs;
pub mod drive;
pub mod sheets;
pub mod summarize;

pub use auth::TokenStore;
pub use docs::{create_summary_doc, DocInfo};
pub use drive::{upload_audio, DriveFile};
pub use sheets::{append_session_log, fetch_history, SessionLogEntry};
pub use summarize::summarize_transcript;
