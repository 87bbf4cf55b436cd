use clap::{Parser, Subcommand};
use client::discovery::DiscoveryClient;
use client::network::NetworkClient;
use log::{info, warn};
use shared::{ServerMessage, Vec3, DEFAULT_DISCOVERY_PORT, DEFAULT_PLAYER_NAME};
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless LAN shooter client", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List servers answering discovery on the local network
    Scan {
        /// UDP discovery port to probe
        #[arg(short, long, default_value_t = DEFAULT_DISCOVERY_PORT)]
        port: u16,

        /// How long to wait for replies
        #[arg(short, long, default_value = "1500")]
        timeout_ms: u64,
    },
    /// Join a server as a bot that strafes and fires
    Join {
        /// Game server address (host:port)
        #[arg(short, long, default_value = "127.0.0.1:50000")]
        server: String,

        /// Player name sent with the join request
        #[arg(short, long, default_value = DEFAULT_PLAYER_NAME)]
        name: String,

        /// Seconds to stay connected
        #[arg(long, default_value = "10")]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Args::parse().command {
        Command::Scan { port, timeout_ms } => {
            scan(DiscoveryClient::new(port, Duration::from_millis(timeout_ms))).await?
        }
        Command::Join {
            server,
            name,
            seconds,
        } => run_bot(&server, &name, Duration::from_secs(seconds)).await?,
    }

    Ok(())
}

async fn scan(discovery: DiscoveryClient) -> std::io::Result<()> {
    let servers = discovery.scan().await?;
    if servers.is_empty() {
        info!("No servers found");
    }
    for server in servers {
        info!(
            "{} at {} ({}/{} players)",
            server.name,
            server.game_addr(),
            server.players,
            server.max_players
        );
    }
    Ok(())
}

async fn run_bot(server: &str, name: &str, duration: Duration) -> std::io::Result<()> {
    info!("Connecting to {} as {}", server, name);
    let mut client = NetworkClient::connect(server, name).await?;

    let deadline = Instant::now() + duration;
    let mut state_ticker = interval(Duration::from_millis(100));
    state_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut shoot_ticker = interval(Duration::from_secs(1));
    shoot_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let started = Instant::now();
    let mut world_states = 0u64;

    loop {
        tokio::select! {
            _ = sleep_until(deadline) => break,
            _ = state_ticker.tick() => {
                let t = started.elapsed().as_secs_f32();
                let position = Vec3::new(t.sin() * 5.0, 1.0, t.cos() * 5.0);
                client.send_state(position, t, None).await?;
            }
            _ = shoot_ticker.tick() => {
                let t = started.elapsed().as_secs_f32();
                let origin = Vec3::new(t.sin() * 5.0, 1.5, t.cos() * 5.0);
                client.shoot(origin, Vec3::new(-t.sin(), 0.0, -t.cos())).await?;
            }
            message = client.next_message() => match message {
                Some(ServerMessage::Welcome { player_id }) => info!("Joined as {}", player_id),
                Some(ServerMessage::Damage { amount }) => info!("Took {} damage", amount),
                Some(ServerMessage::WorldState { players, projectiles }) => {
                    world_states += 1;
                    if world_states % 30 == 0 {
                        info!("{} players, {} projectiles", players.len(), projectiles.len());
                    }
                }
                Some(ServerMessage::Error { message }) => {
                    warn!("Server refused: {}", message);
                    break;
                }
                None => {
                    warn!("Server closed the connection");
                    break;
                }
            },
        }
    }

    info!("Received {} world updates", world_states);
    client.close().await
}
