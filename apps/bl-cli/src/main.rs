mod gateway;

use std::path::PathBuf;
use std::sync::Arc;

use bl_app::{Service, ServiceConfig};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "undsim")]
#[command(about = "Simulated undulator service - keeps a lattice model in sync with undulator devices", long_about = None)]
struct Cli {
    /// Service configuration file (YAML); defaults apply when absent
    #[arg(short, long, env = "UNDSIM_CONFIG", default_value = "undsim.yaml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the model, build devices and serve the PV gateway
    Serve {
        /// Gateway bind address, overriding the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Connect to the model and print every device's current values
    Devices,
    /// Print the effective configuration
    Config,
}

fn setup_tracing(cli: &Cli) {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if cli.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_tracing(&cli);

    let config = ServiceConfig::load(Some(&cli.config))?;

    // Device triggers and model traffic share one thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => runtime.block_on(cmd_serve(config, bind)),
        Commands::Devices => runtime.block_on(cmd_devices(config)),
        Commands::Config => cmd_config(&config),
    }
}

async fn cmd_serve(
    config: ServiceConfig,
    bind: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = Arc::new(Service::connect(&config).await?);
    let bind = bind.unwrap_or_else(|| config.gateway.bind.clone());
    let listener = TcpListener::bind(&bind).await?;
    info!(%bind, devices = service.devices().len(), "Serving");
    gateway::serve(listener, service).await;
    Ok(())
}

async fn cmd_devices(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = Service::connect(&config).await?;
    println!("{:<20} {:<12} {:<14} {:>14} {:>14}", "DEVICE", "ELEMENT", "FAMILY", "DESIRED", "ACTUAL");
    for device in service.devices() {
        let snapshot = device.snapshot();
        println!(
            "{:<20} {:<12} {:<14} {:>14.6} {:>14.6}",
            snapshot.name.as_str(),
            snapshot.element.as_str(),
            snapshot.kind.family().to_string(),
            snapshot.desired,
            snapshot.actual
        );
    }
    Ok(())
}

fn cmd_config(config: &ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
