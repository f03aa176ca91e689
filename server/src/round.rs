//! The single shared round of the guessing game

use log::debug;
use rand::Rng;
use shared::{TARGET_MAX, TARGET_MIN};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    Active { target: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    Ended,
    NothingToEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    TooLow,
    TooHigh,
    Correct,
    NoActiveRound,
}

/// Round state machine: `Idle -> Active -> Idle`.
///
/// The target only exists while the round is active.
#[derive(Debug)]
pub struct Round {
    state: RoundState,
}

impl Round {
    pub fn new() -> Self {
        Self {
            state: RoundState::Idle,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RoundState::Active { .. })
    }

    pub fn target(&self) -> Option<u8> {
        match self.state {
            RoundState::Active { target } => Some(target),
            RoundState::Idle => None,
        }
    }

    /// Draws a fresh target in `[TARGET_MIN, TARGET_MAX]` if idle.
    ///
    /// An active round keeps its target untouched.
    pub fn start<R: Rng>(&mut self, rng: &mut R) -> StartOutcome {
        if self.is_active() {
            return StartOutcome::AlreadyStarted;
        }

        let target = rng.gen_range(TARGET_MIN..=TARGET_MAX);
        debug!("New target drawn: {}", target);
        self.state = RoundState::Active { target };
        StartOutcome::Started
    }

    pub fn end(&mut self) -> EndOutcome {
        if !self.is_active() {
            return EndOutcome::NothingToEnd;
        }
        self.state = RoundState::Idle;
        EndOutcome::Ended
    }

    pub fn evaluate_guess(&self, guess: i64) -> GuessOutcome {
        let target = match self.state {
            RoundState::Active { target } => i64::from(target),
            RoundState::Idle => return GuessOutcome::NoActiveRound,
        };

        match guess.cmp(&target) {
            Ordering::Less => GuessOutcome::TooLow,
            Ordering::Greater => GuessOutcome::TooHigh,
            Ordering::Equal => GuessOutcome::Correct,
        }
    }
}

impl Default for Round {
    fn default() -> Self {
        Self::new()
    }
}
