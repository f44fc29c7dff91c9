use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::{App, Settings};
use seimoney_core::{
    sanitize, AgentClient, AgentRequest, Attachment, Config, Conversation, LinkExtractor,
    SendError, WalletAddress, WalletSession,
};

/// Log filter override, falls back to RUST_LOG
const LOG_ENV: &str = "SEIMONEY_LOG";

#[derive(Parser)]
#[command(name = "seimoney")]
#[command(version, about = "Chat with the SeiMoney payments agent from your terminal")]
struct Cli {
    /// Agent API base URL (overrides SEIMONEY_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Wallet address to use as the conversation thread
    #[arg(long, global = true)]
    address: Option<String>,

    /// Domain whose links are shown in the preview pane
    #[arg(long, global = true)]
    link_domain: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Send {
        /// Message for the agent
        message: String,
        /// File to attach
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print the payment link found in some text
    Extract {
        /// Text to scan
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("Logging disabled: {:#}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        Config::new()
    });
    let settings = resolve_settings(&cli, &config)?;

    match cli.command {
        None => run_tui(config, settings).await,
        Some(Commands::Send { message, file }) => send_once(settings, message, file).await,
        Some(Commands::Extract { text }) => {
            extract(&settings, &text);
            Ok(())
        }
    }
}

/// Write logs to a file so they never land on the terminal UI
fn init_logging() -> Result<()> {
    let log_dir = Config::config_dir()?;
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("seimoney.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .try_init()?;
    Ok(())
}

/// Command line flags win over the environment, which wins over the config file
fn resolve_settings(cli: &Cli, config: &Config) -> Result<Settings> {
    let address = cli
        .address
        .as_deref()
        .map(WalletAddress::parse)
        .transpose()
        .context("invalid --address")?;

    Ok(Settings {
        api_url: cli.api_url.clone().unwrap_or_else(|| config.resolved_api_url()),
        link_domain: cli
            .link_domain
            .clone()
            .unwrap_or_else(|| config.resolved_link_domain()),
        address,
    })
}

async fn run_tui(config: Config, settings: Settings) -> Result<()> {
    info!(api_url = %settings.api_url, "starting terminal UI");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(config, settings);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn send_once(settings: Settings, message: String, file: Option<PathBuf>) -> Result<()> {
    let config_address = Config::load()
        .ok()
        .and_then(|c| c.wallet_address)
        .and_then(|raw| WalletAddress::parse(&raw).ok());
    let Some(address) = settings.address.or(config_address) else {
        bail!("Connect your wallet: pass --address or connect one in the terminal UI");
    };
    let session = WalletSession::connected(address);

    let attachment = match file {
        Some(path) => Some(Attachment::from_path(&path).await?),
        None => None,
    };
    let request = AgentRequest::new(session.thread_id()?, message)
        .with_payload(session.payload()?.to_json())
        .with_file(attachment);

    let conversation = Conversation::with_extractor(
        AgentClient::new(&settings.api_url),
        LinkExtractor::new(&settings.link_domain),
    );

    match conversation.send_message(request).await {
        Ok(_) => {}
        Err(SendError::Agent(e)) => {
            let notice = conversation
                .notice()
                .map(|n| n.to_string())
                .unwrap_or_else(|| e.to_string());
            bail!(notice);
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(reply) = conversation.messages().last() {
        println!("{}", sanitize::to_plain_text(&reply.text));
    }
    if let Some(link) = conversation.preview() {
        println!("\nPayment link: {}", link);
    }
    Ok(())
}

fn extract(settings: &Settings, text: &str) {
    match LinkExtractor::new(&settings.link_domain).extract(text) {
        Some(link) => println!("{}", link),
        None => println!("No payment link found"),
    }
}
