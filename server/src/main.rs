use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use shared::{DEFAULT_HOST, DEFAULT_PORT};

/// Multiplayer guess-the-number server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seed for the target number generator (reproducible games)
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        seed: args.seed,
    };

    info!("Starting server on {}", config.address());
    if let Some(seed) = config.seed {
        info!("Target generator seeded with {}", seed);
    }

    let server = Server::bind(&config).await?;
    server.run().await;

    Ok(())
}
