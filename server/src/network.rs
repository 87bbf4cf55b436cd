//! Server wiring: TCP accept loop, fixed-rate world loop and discovery.

use crate::broadcast::{broadcast, deliver_damage};
use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::discovery::DiscoveryService;
use crate::error::{Result, ServerError};
use crate::game::{GameState, SharedState, TickReport};
use log::{debug, error, info};
use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};

/// Ticks between periodic status lines
const STATUS_LOG_INTERVAL: u64 = 300;

/// Dedicated server with both sockets bound and ready to run
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    discovery: DiscoveryService,
    state: SharedState,
}

impl Server {
    /// Validates the config and binds the game and discovery sockets.
    ///
    /// Any bind failure is fatal and returned before a task is spawned.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let game_addr = config.game_addr();
        let listener = TcpListener::bind(&game_addr)
            .await
            .map_err(|source| ServerError::Bind {
                role: "game",
                addr: game_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let state = GameState::shared(config.max_players);
        let discovery = DiscoveryService::bind(
            &config.discovery_addr(),
            &config.name,
            local_addr.port(),
            state.clone(),
        )
        .await?;

        Ok(Server {
            config,
            listener,
            discovery,
            state,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn discovery_addr(&self) -> Result<SocketAddr> {
        self.discovery.local_addr()
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Spawns the world loop and discovery service alongside, and cancels
    /// them and every connection task on the way out. Returns
    /// `WorldLoopStopped` if the world loop ends on its own.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Server {
            config,
            listener,
            discovery,
            state,
        } = self;

        let mut world_task = tokio::spawn(run_world_loop(state.clone(), config.tick_interval()));
        let discovery_task = tokio::spawn(discovery.run());
        let mut connections = JoinSet::new();

        info!(
            "Server '{}' started ({} Hz, up to {} players)",
            config.name, config.tick_rate, config.max_players
        );

        tokio::pin!(shutdown);
        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break Ok(());
                }
                finished = &mut world_task => {
                    let reason = match finished {
                        Ok(()) => "exited".to_string(),
                        Err(e) => e.to_string(),
                    };
                    error!("World loop stopped ({}), shutting down", reason);
                    break Err(ServerError::WorldLoopStopped(reason));
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            if let Err(e) = stream.set_nodelay(true) {
                                debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
                            }
                            connections.spawn(handle_connection(stream, peer, state.clone()));
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                }
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            error!("Connection task panicked: {}", e);
                        }
                    }
                }
            }
        };

        world_task.abort();
        discovery_task.abort();
        connections.shutdown().await;
        outcome
    }
}

/// Runs world ticks at a fixed rate until cancelled.
///
/// Projectiles advance by the nominal interval every tick. A tick that
/// overruns starts the next one immediately; missed ticks are not replayed.
pub async fn run_world_loop(state: SharedState, tick_interval: Duration) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let dt = tick_interval.as_secs_f32();

    loop {
        ticker.tick().await;
        world_tick(&state, dt).await;
    }
}

/// One tick: simulate under the lock, then deliver damage notices and the snapshot.
pub async fn world_tick(state: &SharedState, dt: f32) -> TickReport {
    let (report, snapshot, recipients) = {
        let mut state = state.write().await;
        let report = state.step(dt, Instant::now());

        if report.tick % STATUS_LOG_INTERVAL == 0 {
            let stalest = state
                .sessions
                .iter()
                .map(|session| session.since_last_update())
                .max()
                .unwrap_or_default();
            debug!(
                "Tick {}: {} players, {} projectiles, oldest state report {:?} ago",
                report.tick,
                state.sessions.len(),
                state.projectiles.len(),
                stalest
            );
        }

        (report, state.snapshot(), state.sessions.recipients())
    };

    deliver_damage(&report.hits, &recipients);
    if let Err(e) = broadcast(&recipients, &snapshot) {
        error!("Failed to encode world state: {}", e);
    }

    report
}
