use std::{io, net::SocketAddr};

use rustc_hash::FxHashMap;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tracing::{debug, error, info, trace, warn};

use maap_common::{Clock, MonotonicClock};
use maap_engine::{Engine, EngineConfig, SenderId};
use maap_transport::Transport;
use maap_wire::control::{Command, Response};

use crate::{
    control::{self, ClientEvent, CLIENT_BUFFER},
    DaemonConfig, DaemonError,
};

/// Buffered commands from all clients.
const COMMAND_BUFFER: usize = 256;

/// Runs one [`Engine`] against a [`Transport`] and any number of control clients.
///
/// The engine lives on the driver task only. Between events the driver puts every queued frame on
/// the wire and hands every pending notification to the client it belongs to.
#[derive(Debug)]
pub struct Daemon<T: Transport, C: Clock = MonotonicClock> {
    engine: Engine<C>,
    transport: T,
    config: DaemonConfig,
    listener: Option<TcpListener>,
    /// Response channels of the connected clients, console included.
    clients: FxHashMap<SenderId, mpsc::Sender<Response>>,
    from_clients: mpsc::Receiver<ClientEvent>,
    /// Cloned into every client task.
    to_driver: mpsc::Sender<ClientEvent>,
    next_client: u64,
}

impl<T: Transport> Daemon<T, MonotonicClock> {
    /// Binds the control server, if configured.
    pub async fn new(transport: T, config: DaemonConfig) -> Result<Self, DaemonError> {
        Self::with_clock(transport, config, MonotonicClock).await
    }
}

impl<T: Transport, C: Clock> Daemon<T, C> {
    pub async fn with_clock(
        transport: T,
        config: DaemonConfig,
        clock: C,
    ) -> Result<Self, DaemonError> {
        let mut engine_config =
            EngineConfig::new(transport.local_mac()).with_dest_mac(config.dest_mac);
        if let Some(seed) = config.seed {
            engine_config = engine_config.with_seed(seed);
        }

        let listener = match config.control_addr {
            Some(addr) => {
                let listener = TcpListener::bind(addr).await?;
                info!(addr = %listener.local_addr()?, "Control server listening");
                Some(listener)
            }
            None => None,
        };

        let (to_driver, from_clients) = mpsc::channel(COMMAND_BUFFER);

        Ok(Self {
            engine: Engine::with_clock(engine_config, clock),
            transport,
            config,
            listener,
            clients: FxHashMap::default(),
            from_clients,
            to_driver,
            // 0 is the console
            next_client: 1,
        })
    }

    /// The address the control server is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Reads commands from stdin and prints their results to stdout.
    pub fn with_console(self) -> Self {
        self.with_console_io(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Registers the console before [`Daemon::run`], so it also hears about the startup `init`.
    fn with_console_io<R, W>(mut self, input: R, output: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.insert(SenderId::CONSOLE, tx);
        control::spawn_console(input, output, self.to_driver.clone(), rx);
        self
    }

    /// Runs until an `exit` command arrives or the transport fails.
    pub async fn run(mut self) -> Result<(), DaemonError> {
        info!(mac = %self.transport.local_mac(), "MAAP daemon running");

        if let Some((base, len)) = self.config.init {
            if let Err(e) = self.engine.init(SenderId::CONSOLE, base, len) {
                warn!("Startup initialization failed: {e}");
            }
        }

        let result = loop {
            if let Err(e) = self.flush().await {
                break Err(e);
            }
            self.dispatch();

            let deadline = self.engine.next_timer_deadline();

            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    let now = self.engine.clock().now();
                    self.engine.handle_timer(now);
                }
                frame = self.transport.recv() => match frame {
                    Ok(frame) => {
                        if !self.engine.handle_packet(&frame) {
                            trace!(len = frame.len(), "Ignored frame");
                        }
                    }
                    Err(e) => {
                        error!("Transport failed: {e}");
                        break Err(DaemonError::Transport(Box::new(e)));
                    }
                },
                Some(event) = self.from_clients.recv() => {
                    if !self.on_client_event(event) {
                        break Ok(());
                    }
                }
                conn = accept(&self.listener) => match conn {
                    Ok((stream, addr)) => self.on_connection(stream, addr),
                    Err(e) => warn!("Error accepting control connection: {e}"),
                },
            }
        };

        info!("MAAP daemon shutting down");
        self.engine.deinit();
        self.dispatch();

        result
    }

    /// Sends every queued frame.
    async fn flush(&mut self) -> Result<(), DaemonError> {
        while let Some(frame) = self.engine.pop_packet() {
            if let Err(e) = self.transport.send(&frame).await {
                error!("Failed to send MAAP frame: {e}");
                return Err(DaemonError::Transport(Box::new(e)));
            }
        }

        Ok(())
    }

    /// Hands every pending notification to its recipient.
    fn dispatch(&mut self) {
        while let Some((recipient, notification)) = self.engine.pop_notification() {
            info!(%recipient, "{notification}");

            let Some(client) = self.clients.get(&recipient) else {
                debug!(%recipient, "Dropping notification for disconnected client");
                continue;
            };

            if client.try_send(notification.into()).is_err() {
                warn!(%recipient, "Client not keeping up, dropping notification");
            }
        }
    }

    /// Returns `false` when the daemon should stop.
    fn on_client_event(&mut self, event: ClientEvent) -> bool {
        match event {
            ClientEvent::Disconnected(id) => {
                debug!(%id, "Control client disconnected");
                self.clients.remove(&id);
            }
            ClientEvent::Command(id, command) => return self.on_command(id, command),
        }

        true
    }

    fn on_command(&mut self, sender: SenderId, command: Command) -> bool {
        let result = match command {
            Command::Init { start, count } => self.engine.init(sender, start, count),
            Command::Reserve { count, preferred } => {
                self.engine.reserve(sender, preferred, count).map(|_| ())
            }
            Command::Release { id } => self.engine.release(sender, id),
            Command::Status { id } => self.engine.status(sender, id),
            Command::Yield { id } => self.engine.yield_(sender, id),
            Command::Help => {
                match self.clients.get(&sender) {
                    Some(client) => {
                        if client.try_send(Response::Text(Command::usage())).is_err() {
                            warn!(%sender, "Client not keeping up, dropping usage text");
                        }
                    }
                    None => debug!(%sender, "Dropping usage text for disconnected client"),
                }
                Ok(())
            }
            Command::Exit => {
                info!(%sender, "Exit requested");
                return false;
            }
        };

        if let Err(e) = result {
            debug!(%sender, ?command, "Command failed: {e}");
        }

        true
    }

    fn on_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let connected = self.clients.keys().filter(|id| **id != SenderId::CONSOLE).count();
        if connected >= self.config.max_clients {
            warn!(
                %addr,
                "Max control clients reached ({}), rejecting connection", self.config.max_clients
            );
            return;
        }

        let id = SenderId(self.next_client);
        self.next_client += 1;
        info!(%id, %addr, "Control client connected");

        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.insert(id, tx);
        control::spawn_client(stream, id, self.to_driver.clone(), rx);
    }
}

async fn accept(listener: &Option<TcpListener>) -> io::Result<(TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => std::future::pending().await,
    }
}
