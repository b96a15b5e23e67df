//! seqdump - show the events received at MIDI sequencer ports

use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seqdump::cancel::{spawn_signal_listener, Cancellation};
use seqdump::config::{AppConfig, Overrides};
use seqdump::drain::Drain;
use seqdump::event::ProtocolMode;
use seqdump::format;
use seqdump::source::replay::{self, ReplayInput};
use seqdump::source::EventSource;

/// Show the events received at MIDI sequencer ports
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// List input ports and exit
    #[arg(short, long)]
    list: bool,

    /// Source port(s): client:port or name fragment, comma separated
    #[arg(short, long, value_name = "PORTS")]
    port: Vec<String>,

    /// Client protocol: 0 = legacy, 1 = UMP MIDI 1.0, 2 = UMP MIDI 2.0
    #[arg(short, long, value_name = "VERSION", value_parser = clap::value_parser!(u8).range(0..=2))]
    ump: Option<u8>,

    /// Do not convert between legacy and UMP events
    #[arg(short, long)]
    raw: bool,

    /// Read a JSON-lines capture instead of live ports ("-" = stdin)
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Path to an optional YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = load_config(&args).await?;

    // stdout carries the dump; logs go to stderr
    init_logging(&config.log_level)?;
    colored::control::set_override(io::stdout().is_terminal());

    let mode = config.protocol_mode()?;

    if args.list {
        return list_ports(&config);
    }

    let cancel = Cancellation::new();
    spawn_signal_listener(cancel.clone());

    match &args.replay {
        Some(path) => {
            let input = ReplayInput::from_arg(path);
            let source = replay::open(input, mode)
                .await
                .with_context(|| format!("Cannot open capture {}", path.display()))?;
            print_banner(None, mode)?;
            run_drain(source, &cancel).await?;
        }
        None => run_live(&config, mode, &cancel).await?,
    }

    info!("seqdump stopped");
    Ok(())
}

async fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path).await?,
        None => AppConfig::default(),
    };
    config.apply(Overrides {
        ports: args.port.clone(),
        ump: args.ump,
        raw: args.raw,
        log_level: args.log_level.clone(),
    });
    Ok(config)
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level: {}", level))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

fn print_banner(virtual_port: Option<&str>, mode: ProtocolMode) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", format::banner(virtual_port).as_str().bold())?;
    writeln!(out, "{}", format::header(mode))?;
    out.flush()?;
    Ok(())
}

/// Drain `source` into stdout; the end of a capture is a normal exit
async fn run_drain<S: EventSource>(source: S, cancel: &Cancellation) -> Result<()> {
    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());

    match Drain::new(source, out).run(cancel).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_end_of_input() => {
            info!("End of input");
            Ok(())
        }
        Err(e) => Err(e).context("Event dump failed"),
    }
}

#[cfg(feature = "live")]
fn list_ports(config: &AppConfig) -> Result<()> {
    let ports = seqdump::ports::discover_input_ports(&config.client_name)
        .context("Cannot enumerate MIDI input ports")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    seqdump::ports::write_port_list(&mut out, &ports)?;
    Ok(())
}

#[cfg(not(feature = "live"))]
fn list_ports(_config: &AppConfig) -> Result<()> {
    anyhow::bail!("Built without live MIDI support")
}

#[cfg(feature = "live")]
async fn run_live(config: &AppConfig, mode: ProtocolMode, cancel: &Cancellation) -> Result<()> {
    use seqdump::source::live::{self, Listening, LiveOptions};

    let options = LiveOptions {
        client_name: config.client_name.clone(),
        ports: config.port_specs(),
        mode,
        raw: config.raw,
    };
    let (input, source) = live::open(&options).context("Cannot open MIDI input")?;

    match input.listening() {
        Listening::Ports(_) => print_banner(None, mode)?,
        Listening::Virtual(name) => print_banner(Some(name.as_str()), mode)?,
    }

    let result = run_drain(source, cancel).await;
    input.close();
    result
}

#[cfg(not(feature = "live"))]
async fn run_live(_config: &AppConfig, _mode: ProtocolMode, _cancel: &Cancellation) -> Result<()> {
    anyhow::bail!("Built without live MIDI support; use --replay")
}
