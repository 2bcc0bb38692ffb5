use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::generator::GeneratedWorld;
use server::network::Server;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "7777")]
    port: u16,
    /// Password clients must send; empty disables the check
    #[clap(short = 'P', long, default_value = "")]
    password: String,
    /// Maximum number of connected clients
    #[clap(short, long, default_value = "16")]
    max_clients: usize,
    /// Seconds a client has to finish connecting; 0 disables the limit
    #[clap(short = 't', long, default_value = "30")]
    handshake_timeout: u64,
    /// World width in tiles
    #[clap(long, default_value = "4200")]
    width: i32,
    /// World height in tiles
    #[clap(long, default_value = "1200")]
    height: i32,
    /// Terrain seed
    #[clap(short, long, default_value = "0")]
    seed: u64,
    /// World name shown to clients
    #[clap(short, long, default_value = "World")]
    name: String,
}

/// Parses the command line, generates the world and serves until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        password: args.password,
        max_clients: args.max_clients,
        handshake_timeout: (args.handshake_timeout > 0)
            .then(|| Duration::from_secs(args.handshake_timeout)),
        world_width: args.width,
        world_height: args.height,
        world_seed: args.seed,
        world_name: args.name,
    };
    config.validate()?;

    let world = GeneratedWorld::generate(
        config.world_width,
        config.world_height,
        config.world_seed,
        &config.world_name,
    );

    let server = Server::bind(config, Arc::new(world)).await?;
    let server_handle = tokio::spawn(server.run());

    tokio::select! {
        result = server_handle => {
            if let Err(e) = result {
                error!("Server task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
