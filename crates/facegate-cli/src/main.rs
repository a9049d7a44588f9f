use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod client;
mod device_sim;

use client::GatewayClient;

#[derive(Parser)]
#[command(name = "facegate", about = "Facegate access-control gateway CLI")]
struct Cli {
    /// Base URL of facegated
    #[arg(long, global = true, env = "FACEGATE_SERVER", default_value = "http://127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run recognition on an image file
    Recognize {
        image: PathBuf,
    },
    /// Enroll the face in an image under a name
    Enroll {
        /// Identity name (e.g., "alice")
        #[arg(short, long)]
        name: String,
        image: PathBuf,
    },
    /// Remove every encoding stored under a name
    Remove {
        name: String,
    },
    /// List enrolled identity names
    List,
    /// Show gateway status
    Status,
    /// Run a simulated door controller
    DeviceSim {
        #[arg(long, default_value = "0.0.0.0:8081")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let client = GatewayClient::new(&cli.server)?;
    let body = match cli.command {
        Commands::DeviceSim { bind } => return device_sim::serve(&bind).await,
        Commands::Recognize { image } => client.recognize(&image).await?,
        Commands::Enroll { name, image } => client.enroll(&name, &image).await?,
        Commands::Remove { name } => client.remove(&name).await?,
        Commands::List => client.list().await?,
        Commands::Status => client.status().await?,
    };
    println!("{}", serde_json::to_string_pretty(&body)?);

    Ok(())
}
