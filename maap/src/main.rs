//! `maapd`: the MAAP daemon.
//!
//! ```bash
//! # Run on eth0, initialize the default pool and accept commands on stdin and port 15364
//! sudo maapd -i eth0 --init 0x91E0F0000000 0xFE00
//!
//! # Talk to a running daemon
//! maapd --client
//! ```

use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use maap::{protocol::Command, run_client, Daemon, DaemonConfig, Ethernet};

/// MAAP daemon - dynamic multicast MAC address allocation (IEEE 1722-2016 Annex B)
#[derive(Parser, Debug)]
#[command(name = "maapd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Network interface to negotiate on
    #[arg(short, long, required_unless_present = "client")]
    interface: Option<String>,

    /// Control port on localhost
    #[arg(short, long, default_value_t = maap::constants::DEFAULT_CONTROL_PORT)]
    port: u16,

    /// Connect to a running daemon and forward stdin to it
    #[arg(short, long)]
    client: bool,

    /// Initialize with <BASE> <LEN> on startup
    #[arg(long, num_args = 2, value_names = ["BASE", "LEN"])]
    init: Option<Vec<String>>,

    /// Ignore stdin
    #[arg(long)]
    no_console: bool,

    /// Log level, overridden by RUST_LOG (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if args.client {
        run_client(SocketAddr::from((Ipv4Addr::LOCALHOST, args.port))).await?;
        return Ok(());
    }

    let Some(interface) = args.interface else {
        return Err("--interface is required".into());
    };

    let mut config = DaemonConfig::default().port(args.port);
    if let Some(init) = args.init {
        match format!("init {}", init.join(" ")).parse::<Command>()? {
            Command::Init { start, count } => config = config.init(start, count),
            _ => return Err("invalid --init range".into()),
        }
    }

    let transport = Ethernet::open(&interface)?;
    let mut daemon = Daemon::new(transport, config).await?;
    if !args.no_console {
        daemon = daemon.with_console();
    }

    tokio::select! {
        result = daemon.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    Ok(())
}
