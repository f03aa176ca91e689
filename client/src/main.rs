use clap::Parser;
use client::network::Client;
use log::info;
use shared::{DEFAULT_HOST, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!("Connecting to: {}", address);
    let client = match Client::connect(&address).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Erro ao conectar ao servidor: {}", e);
            return Err(e.into());
        }
    };
    println!("Conectado ao servidor de adivinhação.");

    client.run().await?;
    println!("Conexão encerrada.");

    Ok(())
}
