//! Protocol vocabulary shared by the guessing-game server and client.
//!
//! The wire protocol is plain text, one logical message per `\n`-terminated
//! line. Everything both sides must agree on lives here: the default
//! endpoint, the disconnect sentinel, the command set, how a client line is
//! classified, and the exact wording of every server reply.

use std::num::IntErrorKind;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 12345;

/// Sentinel line: sent by a client to leave, echoed back by the server.
pub const DISCONNECT: &str = "/DESCONECTAR";

pub const TARGET_MIN: u8 = 1;
pub const TARGET_MAX: u8 = 100;

pub const MAX_NAME_LEN: usize = 32;

/// Server reply texts. Functions build the messages that carry a name,
/// a number or the ranking.
pub mod messages {
    use crate::RankingEntry;

    pub const NAME_PROMPT: &str = "Digite seu nome de usuário: ";
    pub const NAME_TAKEN: &str = "Nome de usuário já em uso.";
    pub const NAME_INVALID: &str = "Nome de usuário inválido.";
    pub const HELP: &str = "Comandos: /START, /SCORE, /END ou /DESCONECTAR";
    pub const ROUND_STARTED: &str = "Novo jogo iniciado! Tente adivinhar o número entre 1 e 100.";
    pub const ALREADY_STARTED: &str = "Jogo já iniciado!";
    pub const NOTHING_TO_END: &str = "Nenhum jogo em andamento para finalizar.";
    pub const TARGET_IS_BIGGER: &str = "O número é maior.";
    pub const TARGET_IS_SMALLER: &str = "O número é menor.";
    pub const NO_ACTIVE_ROUND: &str =
        "Nenhum jogo em andamento. Utilize /START ou aguarde alguém iniciar o jogo.";
    pub const INVALID_GUESS: &str = "Por favor, envie uma entrada válida (número inteiro).";

    pub fn joined(name: &str) -> String {
        format!("{} entrou no jogo!", name)
    }

    pub fn left(name: &str) -> String {
        format!("{} saiu do jogo.", name)
    }

    pub fn welcome(name: &str) -> String {
        format!("Bem-vindo, {}!\n{}", name, HELP)
    }

    pub fn invalid_command() -> String {
        format!("Comando inválido!\n{}", HELP)
    }

    pub fn round_ended_by(name: &str) -> String {
        format!("Jogo finalizado por: {}!", name)
    }

    pub fn guessed(name: &str, target: u8) -> String {
        format!("{} acertou o número: {}!", name, target)
    }

    /// Renders a ranking as `Ranking:` followed by one 1-indexed line per player.
    pub fn ranking(entries: &[RankingEntry]) -> String {
        let mut text = String::from("Ranking:");
        for (position, entry) in entries.iter().enumerate() {
            text.push_str(&format!("\n{}. {}: {}", position + 1, entry.name, entry.score));
        }
        text
    }
}

/// Commands a client may issue with a leading `/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Score,
    End,
}

/// A classified client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Disconnect,
    Command(Command),
    Guess(i64),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("not an integer guess: {0:?}")]
    InvalidGuessFormat(String),
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
    #[error("unacceptable player name: {0:?}")]
    InvalidName(String),
}

impl Request {
    /// Classifies one client line.
    ///
    /// Surrounding whitespace is ignored. Command tokens match
    /// case-insensitively on the whole line; anything else that starts with
    /// `/` is an unknown command. Remaining lines must be integers; values
    /// beyond the `i64` range saturate, since they still compare as too high
    /// or too low against any target.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();

        if line.eq_ignore_ascii_case(DISCONNECT) {
            return Ok(Request::Disconnect);
        }

        if line.starts_with('/') {
            let command = match line.to_ascii_uppercase().as_str() {
                "/START" => Command::Start,
                "/SCORE" => Command::Score,
                "/END" => Command::End,
                _ => return Err(ProtocolError::UnknownCommand(line.to_string())),
            };
            return Ok(Request::Command(command));
        }

        match line.parse::<i64>() {
            Ok(guess) => Ok(Request::Guess(guess)),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Ok(Request::Guess(i64::MAX)),
                IntErrorKind::NegOverflow => Ok(Request::Guess(i64::MIN)),
                _ => Err(ProtocolError::InvalidGuessFormat(line.to_string())),
            },
        }
    }
}

/// Returns true if a line received from the server is the disconnect sentinel
pub fn is_disconnect(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(DISCONNECT)
}

/// Applies the player-name policy and returns the accepted, trimmed name.
///
/// Empty names, names over [`MAX_NAME_LEN`] characters, names holding
/// control characters and names starting with `/` are refused.
pub fn validate_name(raw: &str) -> Result<String, ProtocolError> {
    let name = raw.trim();
    let acceptable = !name.is_empty()
        && name.chars().count() <= MAX_NAME_LEN
        && !name.chars().any(char::is_control)
        && !name.starts_with('/');

    if acceptable {
        Ok(name.to_string())
    } else {
        Err(ProtocolError::InvalidName(raw.to_string()))
    }
}

/// One line of a ranking snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry {
    pub name: String,
    pub score: u32,
}
