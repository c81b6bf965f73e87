use std::{io, thread, time::Duration};

use bytes::Bytes;
use pnet::datalink::{self, Channel, DataLinkSender};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use maap_common::{constants, MacAddr};

use crate::{pad, Transport};

/// How long the reader thread blocks before checking whether it should stop.
const READ_TIMEOUT: Duration = Duration::from_millis(250);
/// Frames buffered between the reader thread and the daemon.
const RX_BUFFER: usize = 256;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0:?}")]
    Io(#[from] io::Error),
    #[error("No network interface named {0:?}")]
    InterfaceNotFound(String),
    #[error("Network interface {0:?} has no MAC address")]
    NoMacAddress(String),
    #[error("Unsupported datalink channel type")]
    UnsupportedChannel,
    #[error("Frame could not be sent")]
    SendFailed,
    #[error("Receive thread stopped")]
    Closed,
}

/// A raw Ethernet port bound to one interface.
///
/// Reading is done on a dedicated thread that forwards every MAAP frame not sent by us.
pub struct Ethernet {
    interface: String,
    mac: MacAddr,
    tx: Box<dyn DataLinkSender>,
    rx: mpsc::Receiver<io::Result<Bytes>>,
}

impl std::fmt::Debug for Ethernet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ethernet")
            .field("interface", &self.interface)
            .field("mac", &self.mac)
            .finish_non_exhaustive()
    }
}

impl Ethernet {
    /// Opens a raw socket on the interface called `name`. Usually needs elevated privileges.
    pub fn open(name: &str) -> Result<Self, Error> {
        let interface = datalink::interfaces()
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?;

        let mac = interface
            .mac
            .map(|m| MacAddr::from_octets([m.0, m.1, m.2, m.3, m.4, m.5]))
            .ok_or_else(|| Error::NoMacAddress(name.to_string()))?;

        let config =
            datalink::Config { read_timeout: Some(READ_TIMEOUT), ..datalink::Config::default() };

        let (tx, mut raw_rx) = match datalink::channel(&interface, config)? {
            Channel::Ethernet(tx, rx) => (tx, rx),
            _ => return Err(Error::UnsupportedChannel),
        };

        let (frames_tx, rx) = mpsc::channel(RX_BUFFER);
        let reader_name = name.to_string();

        thread::Builder::new().name(format!("maap-rx-{name}")).spawn(move || loop {
            match raw_rx.next() {
                Ok(frame) => {
                    if !is_maap_from_peer(frame, mac) {
                        continue;
                    }

                    if frames_tx.blocking_send(Ok(Bytes::copy_from_slice(frame))).is_err() {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    if frames_tx.is_closed() {
                        break;
                    }
                }
                Err(e) => {
                    error!(interface = %reader_name, "Error reading from interface: {e}");
                    let _ = frames_tx.blocking_send(Err(e));
                    break;
                }
            }
        })?;

        info!(interface = name, %mac, "Opened raw Ethernet port");

        Ok(Self { interface: name.to_string(), mac, tx, rx })
    }
}

/// Returns `true` for MAAP frames with a source other than `own`.
fn is_maap_from_peer(frame: &[u8], own: MacAddr) -> bool {
    if frame.len() < 14 {
        return false;
    }

    let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    let mut src = [0u8; 6];
    src.copy_from_slice(&frame[6..12]);

    ethertype == constants::ETHERTYPE && MacAddr::from_octets(src) != own
}

#[async_trait::async_trait]
impl Transport for Ethernet {
    type Error = Error;

    fn local_mac(&self) -> MacAddr {
        self.mac
    }

    async fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        let frame = pad(frame);
        match self.tx.send_to(&frame, None) {
            Some(result) => Ok(result?),
            None => Err(Error::SendFailed),
        }
    }

    async fn recv(&mut self) -> Result<Bytes, Self::Error> {
        match self.rx.recv().await {
            Some(frame) => {
                let frame = frame?;
                debug!(interface = %self.interface, len = frame.len(), "Received frame");
                Ok(frame)
            }
            None => Err(Error::Closed),
        }
    }
}
