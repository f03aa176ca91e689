//! # Guessing Game Server Library
//!
//! This library implements a text-line multiplayer "guess the number" server.
//! Clients connect over TCP, pick a unique name and then share a single round
//! of the game: one hidden target between 1 and 100 that every player is
//! trying to guess.
//!
//! ## Core Responsibilities
//!
//! ### Session Coordination
//! Every accepted connection becomes a [`session::PlayerSession`] running in
//! its own tokio task. Sessions are symmetric peers: there is no separate game
//! loop, and game-state changes happen inline in whichever session handles the
//! command.
//!
//! ### Single Coordination Point
//! The player registry, the round and every player's score live in one
//! [`game::GameState`] behind one mutex. All registrations, round transitions,
//! score changes and ranking snapshots acquire it, so acquisition order is the
//! order in which commands take effect.
//!
//! ### Broadcasting
//! Announcements are queued on each session's bounded outbox while the lock
//! is held, which keeps every player's view in mutation order. Socket writes
//! happen in per-session writer tasks, outside the lock, so a stalled client
//! cannot hold up the game. A client whose writes fail or whose outbox
//! overflows is disconnected and removed like any other leaving player.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Name-keyed players with their scores and outboxes:
//! - Atomic check-and-insert registration
//! - Idempotent removal
//! - Broadcast and unicast delivery
//! - Ranking snapshots with a stable tie-break
//!
//! ### Round Module (`round`)
//! The `Idle -> Active -> Idle` state machine and guess evaluation.
//!
//! ### Game Module (`game`)
//! The shared state object and the operations sessions run under its lock:
//! join, leave, start, end, ranking and guess resolution.
//!
//! ### Session Module (`session`)
//! Name negotiation, the per-client read loop, command dispatch and
//! guaranteed cleanup.
//!
//! ### Network Module (`network`)
//! The TCP accept loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(&ServerConfig::default()).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod network;
pub mod registry;
pub mod round;
pub mod session;
