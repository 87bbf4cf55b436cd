use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use shared::{
    DEFAULT_DISCOVERY_PORT, DEFAULT_GAME_PORT, DEFAULT_HOST, DEFAULT_MAX_PLAYERS,
    DEFAULT_TICK_RATE,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Dedicated LAN shooter server", long_about = None)]
struct Args {
    /// IP address to bind both sockets to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// TCP port for game connections
    #[arg(short, long, env = "SHOOTER_GAME_PORT", default_value_t = DEFAULT_GAME_PORT)]
    port: u16,

    /// UDP port answering discovery probes
    #[arg(long, env = "SHOOTER_DISCOVERY_PORT", default_value_t = DEFAULT_DISCOVERY_PORT)]
    discovery_port: u16,

    /// Name advertised to LAN discovery
    #[arg(short, long, default_value = "Shooter Server")]
    name: String,

    /// Maximum number of concurrent players
    #[arg(short, long, default_value_t = DEFAULT_MAX_PLAYERS)]
    max_players: usize,

    /// World updates per second
    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            game_port: args.port,
            discovery_port: args.discovery_port,
            name: args.name,
            max_players: args.max_players,
            tick_rate: args.tick_rate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(Args::parse());

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return Err(e.into());
        }
    };

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await?;

    Ok(())
}
