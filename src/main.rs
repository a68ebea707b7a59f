use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hanuman_gateway::api::{ApiServer, ApiState};
use hanuman_gateway::{Assistant, Config, LogBus, SessionStore, identify};

/// Hanuman - voice command gateway
#[derive(Parser)]
#[command(name = "hanuman", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Directory for synthesized audio (overrides config)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve,
    /// Show which command a phrase triggers
    Identify {
        /// Phrase to classify
        text: String,
    },
    /// Run the dual-model transcription race on a WAV file
    Transcribe {
        /// Path to the recording
        file: PathBuf,
    },
    /// Synthesize a reply and print where it was stored
    Speak {
        /// Text to speak
        #[arg(default_value = "Jai Shri Ram. I am ready.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,hanuman_gateway=info",
        1 => "info,hanuman_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Command::Identify { text }) = &cli.command {
        let matched = identify(text);
        match matched.tag {
            Some(tag) => println!("{tag} ({:.2})", matched.confidence),
            None => println!("none"),
        }
        return Ok(());
    }

    let mut config = Config::load().context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = cli.cache_dir {
        config.server.cache_dir = dir;
    }
    tracing::debug!(?config, "loaded configuration");

    let assistant = Assistant::from_config(&config)?;

    match cli.command {
        Some(Command::Transcribe { file }) => transcribe(&assistant, &file).await,
        Some(Command::Speak { text }) => speak(&assistant, &text).await,
        Some(Command::Identify { .. } | Command::Serve) | None => {
            tracing::info!(
                port = config.server.port,
                cache_dir = %config.server.cache_dir.display(),
                "starting hanuman gateway"
            );
            let sessions =
                SessionStore::with_limits(config.server.session_ttl, config.server.max_sessions);
            let state = ApiState::new(assistant).with_sessions(sessions);
            ApiServer::new(state, config.server.port).run().await?;
            Ok(())
        }
    }
}

async fn transcribe(assistant: &Assistant, file: &std::path::Path) -> anyhow::Result<()> {
    let audio = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let bus = LogBus::new();
    let mut log = bus.request();
    let transcription = assistant.transcriber().transcribe_smart(audio, &mut log).await;

    if transcription.is_empty() {
        anyhow::bail!("no clear speech detected");
    }

    let matched = identify(&transcription.text);
    println!("[{}] {}", transcription.source.as_str(), transcription.text);
    if let Some(tag) = matched.tag {
        println!("command: {tag} ({:.2})", matched.confidence);
    }

    Ok(())
}

async fn speak(assistant: &Assistant, text: &str) -> anyhow::Result<()> {
    let bus = LogBus::new();
    let mut log = bus.request();

    let audio = assistant
        .synthesizer()
        .synthesize(text, &mut log)
        .await
        .context("all voice providers failed")?;

    println!("{}", audio.path.display());
    Ok(())
}
