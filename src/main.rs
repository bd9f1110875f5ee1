use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use county_choropleth::{config, data, render, server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the datasets and write the choropleth SVG and HTML page
    Generate {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Output directory (overrides [output] dir)
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
    /// Generate the map, then serve it with the county lookup API
    Serve {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Port to listen on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate { config, out } => {
            let mut app_config = config::AppConfig::load(config.as_deref())?;
            if let Some(out) = out {
                app_config.output.dir = out;
            }
            let classifier = app_config.classifier()?;

            // 1. Load Data (both sources, or nothing)
            let dataset = data::load_dataset(&app_config).await?;

            // 2. Render
            render::write_outputs(&app_config, &classifier, &dataset.counties, &dataset.stats)?;

            info!("Generation complete!");
        }
        Commands::Serve { config, port } => {
            let mut app_config = config::AppConfig::load(config.as_deref())?;
            if let Some(port) = port {
                app_config.server.port = port;
            }
            let classifier = app_config.classifier()?;

            let dataset = data::load_dataset(&app_config).await?;
            render::write_outputs(&app_config, &classifier, &dataset.counties, &dataset.stats)?;

            let state = server::AppState::new(dataset.counties, dataset.stats, classifier);
            server::start_server(app_config, state).await?;
        }
    }

    Ok(())
}
