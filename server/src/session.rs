//! Per-connection player session
//!
//! A [`PlayerSession`] owns one client stream from the name prompt until the
//! connection closes. The stream is split in two:
//! - the read half stays with the session, which reads one line at a time and
//!   dispatches it against the shared game state
//! - the write half moves into a writer task that drains the session's
//!   outbox, so nothing ever writes to a socket while holding the game lock
//!
//! A failed write or an overflowing outbox closes the outbox, which ends the
//! session just like a closed connection does. Whatever way the session ends,
//! the player is removed from the registry exactly once and the write half is
//! shut down (or abandoned after [`WRITER_DRAIN_TIMEOUT`]) before the stream
//! drops.

use crate::error::SessionError;
use crate::game::SharedGame;
use crate::registry::{Outbox, OUTBOX_CAPACITY};
use log::{debug, info, warn};
use shared::{messages, validate_name, Command, ProtocolError, Request, DISCONNECT};
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, ReadHalf,
};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// How long a finished session waits for its writer to flush
pub const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

type LineReader<S> = Lines<BufReader<ReadHalf<S>>>;

pub struct PlayerSession<S> {
    stream: S,
    peer: String,
    game: SharedGame,
    outbox_capacity: usize,
}

impl<S> PlayerSession<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S, peer: impl Into<String>, game: SharedGame) -> Self {
        Self {
            stream,
            peer: peer.into(),
            game,
            outbox_capacity: OUTBOX_CAPACITY,
        }
    }

    /// Drives the session to completion.
    ///
    /// Returns `Ok` when the peer leaves normally (sentinel or end of
    /// stream) and the reason otherwise. Cleanup has already run either way.
    pub async fn run(self) -> Result<(), SessionError> {
        let (reader, writer) = tokio::io::split(self.stream);
        let (outbox, outbox_rx) = Outbox::new(self.outbox_capacity);
        let mut writer_task = tokio::spawn(write_loop(writer, outbox_rx, self.peer.clone()));
        let mut lines = BufReader::new(reader).lines();

        let mut name = None;
        let result = serve(&self.game, &self.peer, &mut lines, &outbox, &mut name).await;

        if let Some(name) = name {
            if self.game.lock().await.leave(&name) {
                info!("{} ({}) left the game", name, self.peer);
            }
        }

        // The registry no longer holds a clone, so dropping ours lets the
        // writer drain what is queued and shut the connection down.
        drop(outbox);
        match timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Writer task for {} failed: {}", self.peer, e),
            Err(_) => {
                warn!("Gave up flushing pending messages to {}", self.peer);
                writer_task.abort();
            }
        }

        result
    }
}

/// Negotiates the name, then handles lines until the peer leaves.
///
/// `name` is filled in as soon as registration succeeds so the caller can
/// deregister on every exit path.
async fn serve<S>(
    game: &SharedGame,
    peer: &str,
    lines: &mut LineReader<S>,
    outbox: &Outbox,
    name: &mut Option<String>,
) -> Result<(), SessionError>
where
    S: AsyncRead,
{
    send(outbox, peer, messages::NAME_PROMPT)?;

    let Some(raw) = next_line(lines, outbox, peer).await? else {
        debug!("{} disconnected before choosing a name", peer);
        return Ok(());
    };

    let candidate = match validate_name(&raw) {
        Ok(candidate) => candidate,
        Err(_) => {
            send(outbox, peer, messages::NAME_INVALID)?;
            return Err(SessionError::InvalidName(raw));
        }
    };

    if let Err(e) = game.lock().await.join(&candidate, outbox.clone()) {
        send(outbox, peer, messages::NAME_TAKEN)?;
        return Err(e);
    }
    info!("Player {} connected from {}", candidate, peer);
    let player: &str = name.insert(candidate);

    while let Some(line) = next_line(lines, outbox, player).await? {
        match Request::parse(&line) {
            Ok(Request::Disconnect) => {
                send(outbox, player, DISCONNECT)?;
                return Ok(());
            }
            Ok(Request::Command(Command::Start)) => {
                game.lock().await.start_round(player);
            }
            Ok(Request::Command(Command::Score)) => {
                game.lock().await.send_ranking(player);
            }
            Ok(Request::Command(Command::End)) => {
                game.lock().await.end_and_reset(player);
            }
            Ok(Request::Guess(guess)) => {
                game.lock().await.submit_guess(player, guess);
            }
            Err(ProtocolError::UnknownCommand(command)) => {
                debug!("{} sent unknown command {:?}", player, command);
                send(outbox, player, &messages::invalid_command())?;
            }
            Err(e) => {
                debug!("{}: {}", player, e);
                send(outbox, player, messages::INVALID_GUESS)?;
            }
        }
    }

    info!("{} closed the connection", player);
    Ok(())
}

/// Reads the next line, or fails as soon as the outbox can no longer deliver
async fn next_line<S>(
    lines: &mut LineReader<S>,
    outbox: &Outbox,
    recipient: &str,
) -> Result<Option<String>, SessionError>
where
    S: AsyncRead,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = outbox.closed() => Err(SessionError::SendFailure(recipient.to_string())),
    }
}

fn send(outbox: &Outbox, recipient: &str, message: &str) -> Result<(), SessionError> {
    outbox
        .push(message)
        .map_err(|_| SessionError::SendFailure(recipient.to_string()))
}

/// Writes queued messages as `\n`-terminated lines until every sender is
/// gone or a write fails, then shuts the write half down.
async fn write_loop<W>(mut writer: W, mut outbox_rx: mpsc::Receiver<String>, peer: String)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbox_rx.recv().await {
        if let Err(e) = write_line(&mut writer, &message).await {
            warn!("Failed to send to {}: {}", peer, e);
            break;
        }
    }
    outbox_rx.close();

    if let Err(e) = writer.shutdown().await {
        debug!("Error shutting down connection with {}: {}", peer, e);
    }
}

async fn write_line<W>(writer: &mut W, message: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(message.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameState;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::{DuplexStream, ReadBuf, WriteHalf};
    use tokio::task::JoinHandle;
    use tokio_test::{assert_err, assert_ok};

    /// Yields `input` once, then never produces more data. Writes are
    /// swallowed until `broken` is set, and fail with a broken pipe after.
    struct FlakyStream {
        input: Option<&'static [u8]>,
        broken: Arc<AtomicBool>,
    }

    impl AsyncRead for FlakyStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.input.take() {
                Some(data) => {
                    buf.put_slice(data);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Pending,
            }
        }
    }

    impl AsyncWrite for FlakyStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.broken.load(Ordering::SeqCst) {
                Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
            } else {
                Poll::Ready(Ok(buf.len()))
            }
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct TestClient {
        lines: LineReader<DuplexStream>,
        writer: WriteHalf<DuplexStream>,
    }

    impl TestClient {
        async fn send(&mut self, line: &str) {
            self.writer.write_all(format!("{}\n", line).as_bytes()).await.unwrap();
        }

        async fn recv(&mut self) -> Option<String> {
            timeout(Duration::from_secs(5), self.lines.next_line())
                .await
                .expect("timed out waiting for server line")
                .unwrap()
        }

        async fn expect(&mut self, expected: &str) {
            for line in expected.lines() {
                assert_eq!(self.recv().await.as_deref(), Some(line));
            }
        }
    }

    fn spawn_session(game: &SharedGame) -> (TestClient, JoinHandle<Result<(), SessionError>>) {
        let (client, server) = tokio::io::duplex(4096);
        let session = PlayerSession::new(server, "test-peer", Arc::clone(game));
        let handle = tokio::spawn(session.run());
        let (reader, writer) = tokio::io::split(client);
        let client = TestClient {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        (client, handle)
    }

    async fn join(game: &SharedGame, name: &str) -> (TestClient, JoinHandle<Result<(), SessionError>>) {
        let (mut client, handle) = spawn_session(game);
        client.expect(messages::NAME_PROMPT).await;
        client.send(name).await;
        client.expect(&messages::joined(name)).await;
        client.expect(&messages::welcome(name)).await;
        (client, handle)
    }

    async fn wait_until_absent(game: &SharedGame, name: &str) {
        for _ in 0..100 {
            if !game.lock().await.registry().contains(name) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("{} was never removed", name);
    }

    #[tokio::test]
    async fn test_disconnect_sentinel_is_echoed() {
        let game = GameState::with_seed(1).into_shared();
        let (mut alice, handle) = join(&game, "Alice").await;

        alice.send("/desconectar").await;
        alice.expect(DISCONNECT).await;
        assert_eq!(alice.recv().await, None);

        assert_ok!(handle.await.unwrap());
        assert!(!game.lock().await.registry().contains("Alice"));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let game = GameState::with_seed(1).into_shared();
        let (mut alice, _alice_handle) = join(&game, "Alice").await;

        let (mut impostor, handle) = spawn_session(&game);
        impostor.expect(messages::NAME_PROMPT).await;
        impostor.send("Alice").await;
        impostor.expect(messages::NAME_TAKEN).await;
        assert_eq!(impostor.recv().await, None);

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::NameTaken(_))));

        alice.send("/SCORE").await;
        alice.expect("Ranking:\n1. Alice: 0").await;
    }

    #[tokio::test]
    async fn test_invalid_name_rejected() {
        let game = GameState::with_seed(1).into_shared();
        let (mut client, handle) = spawn_session(&game);

        client.expect(messages::NAME_PROMPT).await;
        client.send("   ").await;
        client.expect(messages::NAME_INVALID).await;
        assert_eq!(client.recv().await, None);

        assert_err!(handle.await.unwrap());
        assert!(game.lock().await.registry().is_empty());
    }

    #[tokio::test]
    async fn test_name_is_trimmed() {
        let game = GameState::with_seed(1).into_shared();
        let (mut client, _handle) = spawn_session(&game);

        client.expect(messages::NAME_PROMPT).await;
        client.send("  Bob \r").await;
        client.expect(&messages::joined("Bob")).await;
        assert!(game.lock().await.registry().contains("Bob"));
    }

    #[tokio::test]
    async fn test_local_error_replies() {
        let game = GameState::with_seed(1).into_shared();
        let (mut alice, _handle) = join(&game, "Alice").await;

        alice.send("banana").await;
        alice.expect(messages::INVALID_GUESS).await;
        alice.send("/JUMP").await;
        alice.expect(&messages::invalid_command()).await;
        alice.send("42").await;
        alice.expect(messages::NO_ACTIVE_ROUND).await;
        alice.send("/END").await;
        alice.expect(messages::NOTHING_TO_END).await;
        alice.expect(messages::HELP).await;
    }

    #[tokio::test]
    async fn test_guessing_round() {
        let game = GameState::with_seed(9).into_shared();
        let (mut alice, _a) = join(&game, "Alice").await;
        let (mut bob, _b) = join(&game, "Bob").await;
        alice.expect(&messages::joined("Bob")).await;

        alice.send("/START").await;
        alice.expect(messages::ROUND_STARTED).await;
        bob.expect(messages::ROUND_STARTED).await;

        let target = game.lock().await.round().target().unwrap();
        bob.send(&(i64::from(target) - 1).to_string()).await;
        bob.expect(messages::TARGET_IS_BIGGER).await;
        bob.send(&target.to_string()).await;

        for client in [&mut alice, &mut bob] {
            client.expect(&messages::guessed("Bob", target)).await;
            client.expect(&messages::round_ended_by("Bob")).await;
            client.expect("Ranking:\n1. Bob: 1\n2. Alice: 0").await;
            client.expect(messages::ROUND_STARTED).await;
        }
        assert_eq!(game.lock().await.registry().score_of("Bob"), Some(1));
    }

    #[tokio::test]
    async fn test_abrupt_disconnect_cleans_up() {
        let game = GameState::with_seed(1).into_shared();
        let (mut alice, _a) = join(&game, "Alice").await;
        let (bob, bob_handle) = join(&game, "Bob").await;
        alice.expect(&messages::joined("Bob")).await;

        drop(bob);

        assert_ok!(bob_handle.await.unwrap());
        wait_until_absent(&game, "Bob").await;
        alice.expect(&messages::left("Bob")).await;
        assert_eq!(game.lock().await.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_eof_before_name() {
        let game = GameState::with_seed(1).into_shared();
        let (mut client, handle) = spawn_session(&game);
        client.expect(messages::NAME_PROMPT).await;
        client.writer.shutdown().await.unwrap();

        assert_ok!(handle.await.unwrap());
        assert!(game.lock().await.registry().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_ends_session() {
        let game = GameState::with_seed(1).into_shared();
        let (mut bob, _b) = join(&game, "Bob").await;

        let broken = Arc::new(AtomicBool::new(false));
        let stream = FlakyStream {
            input: Some(b"Alice\n"),
            broken: Arc::clone(&broken),
        };
        let handle = tokio::spawn(PlayerSession::new(stream, "flaky-peer", Arc::clone(&game)).run());
        bob.expect(&messages::joined("Alice")).await;

        broken.store(true, Ordering::SeqCst);
        bob.send("/START").await;

        // Alice may fail on her welcome or on the round announcement
        let seen = [bob.recv().await.unwrap(), bob.recv().await.unwrap()];
        assert!(seen.contains(&messages::ROUND_STARTED.to_string()));
        assert!(seen.contains(&messages::left("Alice")));

        let result = timeout(Duration::from_secs(5), handle)
            .await
            .expect("session should end after a failed write")
            .unwrap();
        assert!(matches!(result, Err(SessionError::SendFailure(name)) if name == "Alice"));
        assert!(!game.lock().await.registry().contains("Alice"));

        bob.send("/SCORE").await;
        bob.expect("Ranking:\n1. Bob: 0").await;
    }

    #[tokio::test]
    async fn test_stalled_reader_is_dropped() {
        let game = GameState::with_seed(1).into_shared();
        let (mut bob, _b) = join(&game, "Bob").await;

        // Alice's side never reads, so her writer blocks once the pipe fills
        let (mut alice, server) = tokio::io::duplex(64);
        let session = PlayerSession {
            outbox_capacity: 4,
            ..PlayerSession::new(server, "slow-peer", Arc::clone(&game))
        };
        let handle = tokio::spawn(session.run());
        alice.write_all(b"Alice\n").await.unwrap();
        bob.expect(&messages::joined("Alice")).await;

        let mut alice_left = false;
        for _ in 0..20 {
            bob.send("/START").await;
            bob.send("/END").await;
            loop {
                let line = bob.recv().await.expect("Bob's connection closed");
                if line == messages::left("Alice") {
                    alice_left = true;
                }
                if line == messages::HELP {
                    break;
                }
            }
            if alice_left {
                break;
            }
        }
        assert!(alice_left, "a stalled player should be removed");

        let result = timeout(Duration::from_secs(5), handle)
            .await
            .expect("session should end once its outbox overflows")
            .unwrap();
        assert!(matches!(result, Err(SessionError::SendFailure(_))));
        assert_eq!(game.lock().await.registry().len(), 1);
        drop(alice);
    }
}
