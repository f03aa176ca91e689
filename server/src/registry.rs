//! Registry of named players currently connected to the server
//!
//! This module tracks every player that completed name negotiation:
//! - Unique-name registration and idempotent removal
//! - Per-player score bookkeeping
//! - Fan-out of announcements to every session's outbound queue
//! - Deterministic ranking snapshots
//!
//! The registry holds no lock of its own. It lives inside
//! [`GameState`](crate::game::GameState) and is only reached through the
//! single mutex guarding that state.

use log::{info, warn};
use shared::RankingEntry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

/// Messages a session may have waiting before it counts as stalled
pub const OUTBOX_CAPACITY: usize = 256;

/// Outbound message queue of one session, drained by its writer task.
///
/// The queue is bounded. Once a peer stops reading and the queue fills up,
/// the first message that does not fit marks the session as stalled, and
/// [`Outbox::closed`] tells the session to shut down.
#[derive(Debug, Clone)]
pub struct Outbox {
    queue: mpsc::Sender<String>,
    stalled: Arc<Notify>,
}

impl Outbox {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (queue, rx) = mpsc::channel(capacity);
        let outbox = Self {
            queue,
            stalled: Arc::new(Notify::new()),
        };
        (outbox, rx)
    }

    /// Queues a message without waiting for room.
    pub fn push(&self, message: &str) -> Result<(), TrySendError<String>> {
        let result = self.queue.try_send(message.to_string());
        if let Err(TrySendError::Full(_)) = result {
            self.stalled.notify_one();
        }
        result
    }

    /// Resolves once the writer is gone or the queue has overflowed
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.queue.closed() => {}
            _ = self.stalled.notified() => {}
        }
    }
}

/// A registered player and the handle used to reach its session
#[derive(Debug)]
pub struct Player {
    pub name: String,
    pub score: u32,
    /// Registration order, used to break ranking ties
    pub joined: u64,
    outbox: Outbox,
}

impl Player {
    fn new(name: String, joined: u64, outbox: Outbox) -> Self {
        Self {
            name,
            score: 0,
            joined,
            outbox,
        }
    }

    /// Queues a message for this player's session.
    ///
    /// Returns false if the session's writer has gone away or its queue is
    /// full; the failure stays local to this player.
    pub fn send(&self, message: &str) -> bool {
        match self.outbox.push(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Failed to deliver message to {}: outbox full", self.name);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Failed to deliver message to {}: session closed", self.name);
                false
            }
        }
    }
}

/// Name-keyed collection of connected players
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<String, Player>,
    next_join: u64,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` unless it is already taken.
    ///
    /// Returns false and leaves the registry untouched on conflict.
    pub fn try_register(&mut self, name: &str, outbox: Outbox) -> bool {
        if self.players.contains_key(name) {
            return false;
        }

        let joined = self.next_join;
        self.next_join += 1;
        self.players
            .insert(name.to_string(), Player::new(name.to_string(), joined, outbox));
        info!("Player {} registered ({} online)", name, self.players.len());
        true
    }

    /// Removes a player. Removing an absent name is a no-op returning false.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.players.remove(name).is_some() {
            info!("Player {} removed ({} online)", name, self.players.len());
            true
        } else {
            false
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    pub fn score_of(&self, name: &str) -> Option<u32> {
        self.players.get(name).map(|player| player.score)
    }

    /// Queues `message` for every registered player.
    ///
    /// Returns how many sessions accepted it. A closed session does not stop
    /// delivery to the others.
    pub fn broadcast(&self, message: &str) -> usize {
        self.in_join_order()
            .into_iter()
            .filter(|player| player.send(message))
            .count()
    }

    /// Queues `message` for a single player, if registered
    pub fn send_to(&self, name: &str, message: &str) -> bool {
        self.players
            .get(name)
            .map(|player| player.send(message))
            .unwrap_or(false)
    }

    /// Adds one point to `name`. Returns the new score.
    pub fn award_point(&mut self, name: &str) -> Option<u32> {
        let player = self.players.get_mut(name)?;
        player.score += 1;
        Some(player.score)
    }

    pub fn reset_scores(&mut self) {
        for player in self.players.values_mut() {
            player.score = 0;
        }
    }

    /// Players sorted by descending score; ties keep registration order
    pub fn ranking_snapshot(&self) -> Vec<RankingEntry> {
        let mut players = self.in_join_order();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
            .into_iter()
            .map(|player| RankingEntry {
                name: player.name.clone(),
                score: player.score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn in_join_order(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|player| player.joined);
        players
    }
}
