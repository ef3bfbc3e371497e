use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cropboard::{
    config::{Rules, RulesLoader},
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Crop-circuit board game server")]
struct Cli {
    /// Rules YAML file (standard rules when omitted)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Base seed; makes every game of this run reproducible
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let rules = match &cli.rules {
        Some(path) => RulesLoader::new(".").load(path)?,
        None => Rules::default(),
    };
    tracing::info!(rules = %rules.name, seed = ?cli.seed, "loaded rules");

    web::run(WebServerConfig {
        rules,
        host: cli.host,
        port: cli.port,
        seed: cli.seed,
    })
    .await
}
