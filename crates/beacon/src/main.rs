//! Beacon mDNS responder.
//!
//! Advertises NMOS and RAVENNA services over multicast DNS and watches
//! replies for a registration service to contact.

mod logging;

use anyhow::{Context, Result};
use beacon_config::Config;
use beacon_handlers::{
    NmosNodeHandler, NmosRegistry, RavennaHttpHandler, RavennaRtspHandler, VendorInfo,
};
use beacon_service::{MdnsService, NetworkAdapter, ServiceConfig};
use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Beacon - multicast DNS responder for media network nodes
#[derive(Parser, Debug)]
#[command(name = "beacon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the responder (default)
    Run,

    /// Validate configuration file
    Validate,

    /// Show version information
    Version,
}

/// Find the configuration file in standard locations
fn find_config_file(explicit_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path);
    }

    let search_paths = [
        PathBuf::from("./beacon.yaml"),
        PathBuf::from("./beacon.yml"),
        PathBuf::from("./config.yaml"),
        PathBuf::from("/etc/beacon/config.yaml"),
        dirs::config_dir()
            .map(|p| p.join("beacon/config.yaml"))
            .unwrap_or_default(),
    ];

    search_paths.into_iter().find(|path| path.exists())
}

fn load_config(explicit_path: Option<PathBuf>) -> Result<Config> {
    let config = match find_config_file(explicit_path) {
        Some(path) => {
            Config::from_file(&path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };

    config.validate().context("validating configuration")?;
    Ok(config)
}

/// Minimal registry for a standalone responder: advertises the node
/// itself and records registration intents in the log.
#[derive(Default)]
struct StandaloneRegistry;

impl NmosRegistry for StandaloneRegistry {
    fn start_registration(&self, server: IpAddr, port: Option<u16>) {
        info!(%server, port = ?port, "registration endpoint discovered");
    }

    fn num_self(&self) -> u8 {
        1
    }
    fn num_devices(&self) -> u8 {
        1
    }
    fn num_sources(&self) -> u8 {
        0
    }
    fn num_flows(&self) -> u8 {
        0
    }
    fn num_senders(&self) -> u8 {
        0
    }
    fn num_receivers(&self) -> u8 {
        0
    }
}

async fn run(config: Config) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting beacon");

    let adapter = Arc::new(NetworkAdapter::new(
        &config.interface.name,
        config.interface.ipv4,
    ));
    let vendor = VendorInfo {
        node_id: config.vendor.node_id.clone(),
        node_name: config.vendor.node_name.clone(),
    };
    let registry = Arc::new(StandaloneRegistry);

    let service_config = ServiceConfig {
        port: config.mdns.port,
        group: config.mdns.group,
        srv_port: config.mdns.srv_port,
    };

    let mut service = MdnsService::new(service_config, adapter.clone());
    service.add_handler(Arc::new(NmosNodeHandler::new(registry)));
    service.add_handler(Arc::new(
        RavennaHttpHandler::new(&vendor, adapter.clone())
            .context("building ravenna http handler")?,
    ));
    service.add_handler(Arc::new(RavennaRtspHandler));

    service.init().context("initializing mdns service")?;

    tokio::select! {
        result = service.run() => result.context("mdns service failed"),
        _ = signal::ctrl_c() => {
            info!("shutting down");
            service.finish();
            Ok(())
        }
    }
}

fn validate(explicit_path: Option<PathBuf>) -> Result<()> {
    match find_config_file(explicit_path) {
        Some(path) => {
            let config =
                Config::from_file(&path).with_context(|| format!("loading {}", path.display()))?;
            config.validate().context("validating configuration")?;
            println!("{}: OK", path.display());
        }
        None => {
            Config::default().validate()?;
            println!("no configuration file found; defaults OK");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = load_config(cli.config)?;
            logging::init(&config.logging, cli.log_level.as_deref());
            run(config).await
        }
        Commands::Validate => validate(cli.config),
        Commands::Version => {
            println!("beacon {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
