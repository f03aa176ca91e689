//! Helpers shared by the end-to-end test suites

#![allow(dead_code)]

use server::config::ServerConfig;
use server::game::SharedGame;
use server::network::Server;
use shared::messages;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Starts a seeded server on an ephemeral loopback port
pub async fn start_server() -> (SocketAddr, SharedGame) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        seed: Some(12345),
    };
    let server = Server::bind(&config).await.expect("failed to bind server");
    let addr = server.local_addr().expect("no local address");
    let game = server.game();
    tokio::spawn(server.run());
    (addr, game)
}

pub struct Player {
    pub name: String,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Player {
    /// Connects and consumes the name prompt, without sending a name yet
    pub async fn connect(addr: SocketAddr, name: &str) -> Self {
        let stream = TcpStream::connect(addr).await.expect("failed to connect");
        let (reader, writer) = stream.into_split();
        let mut player = Player {
            name: name.to_string(),
            lines: BufReader::new(reader).lines(),
            writer,
        };
        player.expect(messages::NAME_PROMPT).await;
        player
    }

    /// Connects, registers and consumes the join announcement and welcome
    pub async fn join(addr: SocketAddr, name: &str) -> Self {
        let mut player = Self::connect(addr, name).await;
        player.send(name).await;
        player.expect(&messages::joined(name)).await;
        player.expect(&messages::welcome(name)).await;
        player
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("failed to send line");
    }

    /// Next server line, or `None` once the server closed the connection
    pub async fn recv(&mut self) -> Option<String> {
        timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .unwrap_or_else(|_| panic!("{} timed out waiting for a line", self.name))
            .expect("failed to read line")
    }

    /// Asserts the next lines spell out `expected`, which may span lines
    pub async fn expect(&mut self, expected: &str) {
        for line in expected.lines() {
            assert_eq!(self.recv().await.as_deref(), Some(line), "player {}", self.name);
        }
    }

    pub async fn expect_closed(&mut self) {
        assert_eq!(self.recv().await, None, "player {}", self.name);
    }

    /// Binary-searches the active target using the server's hints.
    ///
    /// Returns the target once the win announcement arrives.
    pub async fn guess_until_correct(&mut self) -> u8 {
        let (mut low, mut high) = (1i64, 100i64);
        let win_prefix = format!("{} acertou o número: ", self.name);

        loop {
            let guess = (low + high) / 2;
            self.send(&guess.to_string()).await;
            let reply = self.recv().await.expect("connection closed while guessing");

            if reply == messages::TARGET_IS_BIGGER {
                low = guess + 1;
            } else if reply == messages::TARGET_IS_SMALLER {
                high = guess - 1;
            } else if reply.starts_with(&win_prefix) {
                return guess as u8;
            } else {
                panic!("unexpected reply while guessing: {:?}", reply);
            }
        }
    }
}

/// Polls the registry until `name` is gone
pub async fn wait_until_absent(game: &SharedGame, name: &str) {
    for _ in 0..200 {
        if !game.lock().await.registry().contains(name) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} was never removed from the registry", name);
}
