use std::sync::Arc;

use crate::config::GoogleConfig;
use crate::services::TokenStore;
use crate::session::RecordingSession;
use crate::worker::Transcriber;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The single recording session (one active capture at a time).
    pub session: Arc<RecordingSession>,
    /// Process-wide inference worker session.
    pub transcriber: Arc<Transcriber>,
    /// Persisted bearer credential for the Google collaborators.
    pub tokens: Arc<TokenStore>,
    /// Google folder/spreadsheet naming.
    pub google: GoogleConfig,
    /// Shared HTTP client for the downstream collaborators.
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(
        session: Arc<RecordingSession>,
        transcriber: Arc<Transcriber>,
        tokens: Arc<TokenStore>,
        google: GoogleConfig,
    ) -> Self {
        Self {
            session,
            transcriber,
            tokens,
            google,
            client: reqwest::Client::new(),
        }
    }
}
