//! Shared game state and the atomic operations sessions perform on it
//!
//! [`GameState`] bundles the player registry, the round and the target
//! generator into one object guarded by one mutex ([`SharedGame`]). Every
//! method here runs entirely inside that critical section, so the order in
//! which sessions acquire the lock is the order in which their commands take
//! effect. Replies and broadcasts are only queued on session outboxes while
//! the lock is held; the actual socket writes happen in each session's
//! writer task.

use crate::error::SessionError;
use crate::registry::{Outbox, PlayerRegistry};
use crate::round::{EndOutcome, GuessOutcome, Round, StartOutcome};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::messages;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handle to the single coordination point, cloned into every session
pub type SharedGame = Arc<Mutex<GameState>>;

#[derive(Debug)]
pub struct GameState {
    registry: PlayerRegistry,
    round: Round,
    rng: StdRng,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a game whose targets are reproducible from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            registry: PlayerRegistry::new(),
            round: Round::new(),
            rng,
        }
    }

    pub fn into_shared(self) -> SharedGame {
        Arc::new(Mutex::new(self))
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    /// Registers a player, announces the arrival and welcomes the newcomer.
    ///
    /// The announcement is queued before the newcomer is welcomed, so the
    /// joining player sees its own arrival first.
    pub fn join(&mut self, name: &str, outbox: Outbox) -> Result<(), SessionError> {
        if !self.registry.try_register(name, outbox) {
            return Err(SessionError::NameTaken(name.to_string()));
        }

        self.registry.broadcast(&messages::joined(name));
        self.registry.send_to(name, &messages::welcome(name));
        Ok(())
    }

    /// Removes a player and announces the departure to those remaining.
    ///
    /// Returns false if the player was already gone.
    pub fn leave(&mut self, name: &str) -> bool {
        if !self.registry.remove(name) {
            return false;
        }
        self.registry.broadcast(&messages::left(name));
        true
    }

    pub fn start_round(&mut self, initiator: &str) -> StartOutcome {
        let outcome = self.round.start(&mut self.rng);
        match outcome {
            StartOutcome::Started => {
                info!("Round started by {}", initiator);
                self.registry.broadcast(messages::ROUND_STARTED);
            }
            StartOutcome::AlreadyStarted => {
                self.registry.send_to(initiator, messages::ALREADY_STARTED);
            }
        }
        outcome
    }

    /// Ends the active round, announcing who ended it and the ranking
    pub fn end_round(&mut self, initiator: &str) -> EndOutcome {
        let outcome = self.round.end();
        match outcome {
            EndOutcome::Ended => {
                info!("Round ended by {}", initiator);
                self.registry.broadcast(&messages::round_ended_by(initiator));
                let ranking = messages::ranking(&self.registry.ranking_snapshot());
                self.registry.broadcast(&ranking);
            }
            EndOutcome::NothingToEnd => {
                self.registry.send_to(initiator, messages::NOTHING_TO_END);
            }
        }
        outcome
    }

    /// The `/END` command: ends the round if any, then zeroes every score.
    ///
    /// Scores are reset even when no round was active.
    pub fn end_and_reset(&mut self, initiator: &str) -> EndOutcome {
        let outcome = self.end_round(initiator);
        self.registry.reset_scores();
        self.registry.send_to(initiator, messages::HELP);
        outcome
    }

    pub fn send_ranking(&self, name: &str) {
        let ranking = messages::ranking(&self.registry.ranking_snapshot());
        self.registry.send_to(name, &ranking);
    }

    /// Evaluates a guess and replies to the guesser.
    ///
    /// A correct guess is resolved on the spot: the win is announced, the
    /// guesser scores, the round ends and a new one starts.
    pub fn submit_guess(&mut self, name: &str, guess: i64) -> GuessOutcome {
        let outcome = self.round.evaluate_guess(guess);
        match outcome {
            GuessOutcome::TooLow => {
                self.registry.send_to(name, messages::TARGET_IS_BIGGER);
            }
            GuessOutcome::TooHigh => {
                self.registry.send_to(name, messages::TARGET_IS_SMALLER);
            }
            GuessOutcome::NoActiveRound => {
                self.registry.send_to(name, messages::NO_ACTIVE_ROUND);
            }
            GuessOutcome::Correct => self.resolve_correct_guess(name),
        }
        outcome
    }

    fn resolve_correct_guess(&mut self, name: &str) {
        let Some(target) = self.round.target() else {
            return;
        };

        self.registry.broadcast(&messages::guessed(name, target));
        if let Some(score) = self.registry.award_point(name) {
            info!("{} guessed {} (score {})", name, target, score);
        }
        self.end_round(name);
        self.start_round(name);
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
