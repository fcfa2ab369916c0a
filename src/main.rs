use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;

use talking_grandpa::audio::capture::{CaptureDevice, ToneCaptureDevice, WavCaptureDevice};
use talking_grandpa::{
    AppConfig, CharacterContext, GeminiLive, GeminiVoice, Location, SessionManager, SessionOptions,
};

/// Talking Grandpa - real-time voice character demo
#[derive(Parser, Debug)]
#[command(name = "grandpa-voice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// 16 kHz mono WAV file to replay as the microphone (sine tone if omitted)
    #[arg(short = 'w', long = "wav", value_name = "FILE")]
    wav: Option<PathBuf>,

    /// Voice override (puck, charon, kore, fenrir, zephyr)
    #[arg(long = "voice")]
    voice: Option<String>,

    /// Starting room override (living-room, kitchen, outside, bedroom)
    #[arg(long = "location")]
    location: Option<String>,

    /// How long to keep the session running, in seconds
    #[arg(short = 's', long = "seconds", default_value_t = 30)]
    seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    let config = AppConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;

    let voice = cli
        .voice
        .map(|v| GeminiVoice::from_str_or_default(&v))
        .unwrap_or(config.voice);
    let location = cli
        .location
        .map(|l| Location::from_str_or_default(&l))
        .unwrap_or(config.location);

    let transport =
        Arc::new(GeminiLive::new(config.api_key.clone()).map_err(|e| anyhow!(e.to_string()))?);
    let capture: Arc<dyn CaptureDevice> = match cli.wav {
        Some(path) => {
            info!("replaying {} as the microphone", path.display());
            Arc::new(WavCaptureDevice { path })
        }
        None => Arc::new(ToneCaptureDevice { frequency: 440.0 }),
    };

    let mut manager = SessionManager::new(
        transport,
        capture,
        SessionOptions {
            model: config.model,
            voice,
            context: CharacterContext::new().moved_to(location),
        },
    );

    // Print every character state change while the session runs.
    let mut states = manager.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            let state = *states.borrow_and_update();
            println!("character state: {state:?}");
            if states.changed().await.is_err() {
                break;
            }
        }
    });

    manager.start().await.map_err(|e| anyhow!(e.to_string()))?;
    info!(voice = %voice, "grandpa is listening, speak up");

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(cli.seconds)) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }

    manager.stop(false);
    watcher.abort();
    Ok(())
}
