use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub model: ModelConfig,
    pub google: GoogleConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Which Whisper model to fetch and run.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    /// Hugging Face repository holding ggml model files.
    pub repo: String,
    /// Model file within the repository.
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Drive folder that receives uploaded recordings.
    pub folder_name: String,
    /// Spreadsheet holding the session log.
    pub spreadsheet_title: String,
    /// Where the bearer credential is persisted; defaults to the local
    /// data dir when unset.
    pub token_path: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
