use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use scribe_assist::{
    create_router, AppState, Config, MicrophoneDevice, RecordingSession, TokenStore, Transcriber,
    WhisperLoader,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "scribe-assist", about = "Record, transcribe, and publish audio sessions")]
struct Args {
    /// Path to the configuration file (without extension).
    #[arg(long, default_value = "config/scribe-assist")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("ScribeAssist v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Speech model: {}/{}",
        cfg.model.repo, cfg.model.file
    );

    // One inference worker session for the whole process; the model load
    // kicks off immediately so it overlaps with the user signing in.
    let transcriber = Arc::new(Transcriber::new(WhisperLoader::new(
        &cfg.model.repo,
        &cfg.model.file,
    )));

    let session = Arc::new(RecordingSession::new(
        Box::new(MicrophoneDevice::new()),
        Arc::clone(&transcriber),
    ));

    let token_path = match &cfg.google.token_path {
        Some(path) => std::path::PathBuf::from(path),
        None => TokenStore::default_path(),
    };
    let tokens = Arc::new(TokenStore::open(token_path));

    let state = AppState::new(session, transcriber, tokens, cfg.google.clone());
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
