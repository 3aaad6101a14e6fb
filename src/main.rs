use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use veritext::config::Config;
use veritext::logging;
use veritext::ontology::store::OntologyStore;
use veritext::server;

/// Compliance verification server for LLM output.
#[derive(Debug, Parser)]
#[command(name = "veritext", version)]
struct Cli {
    /// Port to bind (overrides config and PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Ontology directory (overrides config and ONTOLOGY_DIR)
    #[arg(long)]
    ontology_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(dir) = cli.ontology_dir {
        config.ontology_dir = dir;
    }

    logging::init_logging(&config);
    tracing::info!(
        port = config.port,
        ontology_dir = %config.ontology_dir,
        "veritext starting"
    );

    let store = Arc::new(OntologyStore::new(&config.ontology_dir));
    let app = server::router(store, server::cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
