//! Serving control clients: TCP connections and the console.

use std::{io, net::SocketAddr};

use futures::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::mpsc,
};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};

use maap_engine::SenderId;
use maap_wire::control::{Codec, Command, Response};

use crate::DaemonError;

/// Responses buffered per client before new ones get dropped.
pub(crate) const CLIENT_BUFFER: usize = 64;

/// What client tasks tell the driver.
#[derive(Debug)]
pub(crate) enum ClientEvent {
    Command(SenderId, Command),
    Disconnected(SenderId),
}

/// Spawns a task serving one TCP control connection.
pub(crate) fn spawn_client(
    stream: TcpStream,
    id: SenderId,
    to_driver: mpsc::Sender<ClientEvent>,
    responses: mpsc::Receiver<Response>,
) {
    let (reader, writer) = stream.into_split();
    tokio::spawn(serve(
        Some(FramedRead::new(reader, Codec::new())),
        FramedWrite::new(writer, Codec::new()),
        id,
        to_driver,
        responses,
    ));
}

/// Spawns the console task: commands from `input`, responses to `output`.
pub(crate) fn spawn_console<R, W>(
    input: R,
    output: W,
    to_driver: mpsc::Sender<ClientEvent>,
    responses: mpsc::Receiver<Response>,
) where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(serve(
        Some(FramedRead::new(input, Codec::new())),
        FramedWrite::new(output, Codec::new()),
        SenderId::CONSOLE,
        to_driver,
        responses,
    ));
}

/// Forwards commands read from `reader` to the driver and writes responses to `writer` until
/// either side goes away. The console keeps receiving responses after its input closes.
async fn serve<R, W>(
    mut reader: Option<FramedRead<R, Codec>>,
    mut writer: FramedWrite<W, Codec>,
    id: SenderId,
    to_driver: mpsc::Sender<ClientEvent>,
    mut responses: mpsc::Receiver<Response>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let console = id == SenderId::CONSOLE;

    loop {
        let next_command = async {
            match reader.as_mut() {
                Some(reader) => reader.next().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            command = next_command => match command {
                Some(Ok(Ok(command))) => {
                    debug!(%id, ?command, "Received command");
                    if to_driver.send(ClientEvent::Command(id, command)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Err(e))) => {
                    debug!(%id, "Invalid command: {e}");
                    let text = format!("{e}\n{}", Command::usage());
                    if writer.send(Response::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(%id, "Error reading from control client: {e}");
                    break;
                }
                None if console => {
                    debug!("Console input closed");
                    reader = None;
                }
                None => break,
            },
            response = responses.recv() => match response {
                Some(response) => {
                    if let Err(e) = writer.send(response).await {
                        warn!(%id, "Error writing to control client: {e}");
                        break;
                    }
                }
                // The driver is gone.
                None => return,
            },
        }
    }

    let _ = to_driver.send(ClientEvent::Disconnected(id)).await;
}

/// Line-mode client of a running daemon: stdin goes to the daemon, its responses to stdout.
pub async fn run_client(addr: SocketAddr) -> Result<(), DaemonError> {
    let stream = TcpStream::connect(addr).await?;
    let (reader, writer) = stream.into_split();

    let mut from_daemon = FramedRead::new(reader, LinesCodec::new());
    let mut to_daemon = FramedWrite::new(writer, LinesCodec::new());
    let mut stdin = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let mut stdout = FramedWrite::new(tokio::io::stdout(), LinesCodec::new());

    loop {
        tokio::select! {
            line = stdin.next() => match line {
                Some(line) => to_daemon.send(line.map_err(lines_error)?).await.map_err(lines_error)?,
                None => return Ok(()),
            },
            line = from_daemon.next() => match line {
                Some(line) => stdout.send(line.map_err(lines_error)?).await.map_err(lines_error)?,
                None => {
                    debug!(%addr, "Daemon closed the connection");
                    return Ok(());
                }
            },
        }
    }
}

fn lines_error(e: tokio_util::codec::LinesCodecError) -> DaemonError {
    match e {
        tokio_util::codec::LinesCodecError::Io(e) => DaemonError::Io(e),
        tokio_util::codec::LinesCodecError::MaxLineLengthExceeded => {
            DaemonError::Io(io::Error::new(io::ErrorKind::InvalidData, "line too long"))
        }
    }
}
