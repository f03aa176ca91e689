//! Connection handling for the terminal client

use log::{debug, info, warn};
use shared::{is_disconnect, DISCONNECT};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;

const SERVER_DISCONNECTED: &str = "Servidor solicitou desconexão.";
const CONNECTION_CLOSED: &str = "Conexão com o servidor encerrada.";

pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(server_addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(server_addr).await?;
        info!("Connected to {}", server_addr);
        Ok(Client { stream })
    }

    /// Plays from the terminal: stdin lines go to the server, server lines
    /// are printed to stdout.
    pub async fn run(self) -> io::Result<()> {
        self.run_with(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Forwards `input` lines to the server and writes server lines to
    /// `output` until either side disconnects.
    ///
    /// Typing the disconnect sentinel sends it and waits for the server's
    /// echo. When `input` runs out the sentinel is sent on the user's behalf.
    pub async fn run_with<I, O>(self, input: I, output: O) -> io::Result<()>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, mut writer) = self.stream.into_split();
        let mut receiver = tokio::spawn(receive_loop(reader, output));
        let mut input_lines = input.lines();
        let mut receiver_done = false;

        loop {
            tokio::select! {
                result = &mut receiver => {
                    receiver_done = true;
                    log_receiver_end(result);
                    break;
                }
                line = input_lines.next_line() => {
                    let line = line?.unwrap_or_else(|| DISCONNECT.to_string());
                    writer.write_all(format!("{}\n", line).as_bytes()).await?;
                    if is_disconnect(&line) {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }
        }

        if !receiver_done {
            log_receiver_end(receiver.await);
        }

        if let Err(e) = writer.shutdown().await {
            debug!("Error shutting down socket: {}", e);
        }
        Ok(())
    }
}

/// Prints server lines until the sentinel arrives or the stream ends
async fn receive_loop<O>(reader: OwnedReadHalf, mut output: O) -> io::Result<()>
where
    O: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if is_disconnect(&line) {
            output
                .write_all(format!("{}\n", SERVER_DISCONNECTED).as_bytes())
                .await?;
            return output.flush().await;
        }
        output
            .write_all(format!("Servidor: {}\n", line).as_bytes())
            .await?;
        output.flush().await?;
    }

    output
        .write_all(format!("{}\n", CONNECTION_CLOSED).as_bytes())
        .await?;
    output.flush().await
}

fn log_receiver_end(result: Result<io::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => debug!("Receiver finished"),
        Ok(Err(e)) => warn!("Error receiving message: {}", e),
        Err(e) => warn!("Receiver task failed: {}", e),
    }
}
