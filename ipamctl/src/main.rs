mod cmd;
mod config;
mod error;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use netbox_ipam::NetboxClient;
use tracing::debug;
use tracing_subscriber::fmt::time::FormatTime;

use crate::config::CtlConfig;
use crate::error::CliResult;

struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let secs = d.as_secs();
        let millis = d.subsec_millis();
        write!(w, "[{secs:>3}.{millis:03}]")
    }
}

#[derive(Parser)]
#[command(name = "ipamctl", version)]
struct Cli {
    /// Path to ipamctl.yaml config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    /// NetBox URL (overrides config)
    #[arg(long, global = true, env = "NETBOX_URL")]
    url: Option<String>,
    /// NetBox API token (overrides config)
    #[arg(long, global = true, env = "NETBOX_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that NetBox is reachable with the configured token
    Status,
    /// List prefixes with their declared gateways
    Prefixes(cmd::PrefixArgs),
    /// List IP addresses with their best-effort prefix gateway
    IpAddresses(cmd::AddressArgs),
    /// List VLANs
    Vlans(cmd::VlanArgs),
    /// List devices
    Devices(cmd::DeviceArgs),
    /// Allocate the next usable address in a prefix
    Allocate(cmd::AllocateArgs),
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => {
            let config = config::load(path).await?;
            debug!(path = %path.display(), "config loaded");
            config
        }
        None => CtlConfig::default(),
    };
    let client = NetboxClient::new(&config.client_config(cli.url, cli.token))?;

    match cli.command {
        Command::Status => cmd::run_status(&client).await,
        Command::Prefixes(args) => cmd::run_prefixes(&client, args).await,
        Command::IpAddresses(args) => cmd::run_addresses(&client, args).await,
        Command::Vlans(args) => cmd::run_vlans(&client, args).await,
        Command::Devices(args) => cmd::run_devices(&client, args).await,
        Command::Allocate(args) => cmd::run_allocate(&client, args).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_timer(Elapsed(Instant::now()))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}
