use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use configurator_core::{
    Ack, ConfigStore, Configuration, DesignCatalog, Namespace, Pacer, RendererBridge,
    RendererChannel, ReplayEngine, ReplayLog, ReplayOutcome, SendError,
};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Catalog { catalog } => run_catalog(catalog.as_deref()),
        Commands::Sync { config, catalog } => run_sync(config.as_deref(), catalog.as_deref()),
        Commands::Validate { log } => run_validate(&log),
        Commands::Replay { log } => run_replay(&log).await,
    }
}

fn run_catalog(catalog: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog)?;
    for namespace in [Namespace::Pendant, Namespace::System] {
        println!("[{}]", namespace);
        for (design, asset_id) in catalog.designs(namespace) {
            println!("  {:<12} {}", design, asset_id);
        }
    }
    println!("[system types]");
    for (name, system_type) in catalog.system_types() {
        println!("  {:<12} {}", name, system_type.base_geometry);
    }
    Ok(())
}

fn run_sync(config: Option<&Path>, catalog: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog)?;
    let store = match config {
        Some(path) => {
            let json = read(path)?;
            let initial: Configuration = serde_json::from_str(&json)
                .with_context(|| format!("parsing configuration {}", path.display()))?;
            ConfigStore::new(catalog, initial)?
        }
        None => ConfigStore::with_catalog(catalog)?,
    };

    for line in sync_lines(store.current()) {
        println!("{}", line);
    }
    Ok(())
}

fn run_validate(log: &Path) -> Result<()> {
    println!("{}", describe_log(&load_log(log)?));
    Ok(())
}

async fn run_replay(path: &Path) -> Result<()> {
    let log = load_log(path)?;
    tracing::info!(path = %path.display(), messages = log.len(), "replaying log");

    let (outcome, _) = replay_log(log, TokioPacer, StdoutChannel).await?;
    tracing::info!(sent = outcome.sent, "replay complete");
    Ok(())
}

fn describe_log(log: &ReplayLog) -> String {
    format!("version {}, {} messages", log.version, log.len())
}

/// Drive `channel` from `log` with the engine's fixed pacing. Returns the channel when done.
async fn replay_log<P, C>(log: ReplayLog, pacer: P, channel: C) -> Result<(ReplayOutcome, C)>
where
    P: Pacer + Clone,
    C: RendererChannel,
{
    let mut bridge = RendererBridge::with_channel(channel);
    let engine = ReplayEngine::new(pacer);
    let outcome = engine
        .replay(log.messages, |message| {
            bridge.send(message);
        })?
        .await;
    let channel = bridge
        .detach()
        .context("renderer channel lost during replay")?;
    Ok((outcome, channel))
}

/// Wire lines a full sync of `config` would post.
fn sync_lines(config: &Configuration) -> Vec<String> {
    let mut bridge = RendererBridge::with_channel(configurator_core::MemoryChannel::default());
    bridge.send_full_config(config);
    bridge.detach().map(|channel| channel.sent).unwrap_or_default()
}

fn load_catalog(path: Option<&Path>) -> Result<DesignCatalog> {
    match path {
        Some(path) => {
            let json = read(path)?;
            DesignCatalog::from_json(&json)
                .with_context(|| format!("loading catalog {}", path.display()))
        }
        None => Ok(DesignCatalog::default()),
    }
}

fn load_log(path: &Path) -> Result<ReplayLog> {
    parse_log(&read(path)?).with_context(|| format!("loading replay log {}", path.display()))
}

fn parse_log(json: &str) -> Result<ReplayLog> {
    Ok(ReplayLog::from_json(json)?)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Prints each message as a line on stdout.
struct StdoutChannel;

impl RendererChannel for StdoutChannel {
    fn post(&mut self, message: &str) -> std::result::Result<Ack, SendError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", message)
            .and_then(|_| stdout.flush())
            .map(|_| Ack)
            .map_err(|_| SendError::Closed)
    }
}

#[derive(Debug, Clone, Copy)]
struct TokioPacer;

impl Pacer for TokioPacer {
    fn pause(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Light configurator tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List design names and renderer asset ids.
    Catalog {
        /// Catalog JSON to use instead of the built-in one.
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
    /// Print the messages a full sync of a configuration would send.
    Sync {
        /// Configuration JSON. Defaults to the mount-time configuration.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Catalog JSON to use instead of the built-in one.
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
    /// Check a replay log's version and message grammar.
    Validate {
        /// Path to the replay log.
        log: PathBuf,
    },
    /// Replay a log to stdout with the renderer's fixed pacing.
    Replay {
        /// Path to the replay log.
        log: PathBuf,
    },
}
