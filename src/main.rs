use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jre_provisioner::config::Settings;
use jre_provisioner::services::java_opts::{java_options, render};
use jre_provisioner::services::provision;

#[derive(Parser)]
#[command(name = "jre-provision", version, about = "Install a JRE and size its heap from MEMORY_LIMIT")]
struct Cli {
    /// JSON config file (defaults to $JRE_CONFIG or ./jre.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the JVM options for the current environment
    Opts,
    /// Download, verify and install the JRE, then write the profile script
    Install,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Opts => {
            let opts = java_options(&settings).context("Failed to compute JVM options")?;
            println!("{}", render(&opts));
        }
        Commands::Install => {
            info!("☕ JRE provisioner v{}", env!("CARGO_PKG_VERSION"));
            let provisioned = provision(&settings).await.context("JRE installation failed")?;
            println!("JAVA_HOME={}", provisioned.installation.java_home.display());
            println!("JAVA_OPTS={}", render(&provisioned.java_opts));
        }
    }

    Ok(())
}
