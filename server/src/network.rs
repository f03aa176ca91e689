//! TCP accept loop spawning one player session per connection

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::game::{GameState, SharedGame};
use crate::session::PlayerSession;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Owns the listener and the shared game every session plays in
pub struct Server {
    listener: TcpListener,
    game: SharedGame,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let game = match config.seed {
            Some(seed) => GameState::with_seed(seed),
            None => GameState::new(),
        };

        Ok(Server {
            listener,
            game: game.into_shared(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the game state, mainly for inspection
    pub fn game(&self) -> SharedGame {
        Arc::clone(&self.game)
    }

    /// Accepts connections until the process is stopped.
    ///
    /// Accept errors are logged and retried; a failing session never stops
    /// the loop.
    pub async fn run(self) {
        info!("Waiting for connections...");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Connected with {}", addr);
                    let session = PlayerSession::new(stream, addr.to_string(), self.game());
                    tokio::spawn(async move {
                        log_session_end(addr, session.run().await);
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

fn log_session_end(addr: SocketAddr, result: Result<(), SessionError>) {
    match result {
        Ok(()) => info!("Connection with {} closed", addr),
        Err(e @ (SessionError::NameTaken(_) | SessionError::InvalidName(_))) => {
            warn!("Rejected {}: {}", addr, e)
        }
        Err(SessionError::ConnectionLost(e)) => info!("Client {} disconnected: {}", addr, e),
        Err(e) => error!("Error handling client {}: {}", addr, e),
    }
}
