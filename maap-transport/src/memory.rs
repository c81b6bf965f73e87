//! An in-process Ethernet segment, for running several daemons against each other in tests.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::warn;

use maap_common::MacAddr;

use crate::{pad, Transport};

const SEGMENT_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Segment closed")]
    Closed,
}

/// A broadcast domain. Every frame sent by one port is seen by all the others.
#[derive(Debug, Clone)]
pub struct Segment {
    tx: broadcast::Sender<(MacAddr, Bytes)>,
}

impl Default for Segment {
    fn default() -> Self {
        Self::new()
    }
}

impl Segment {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SEGMENT_CAPACITY);
        Self { tx }
    }

    /// Plugs a new station into the segment.
    pub fn attach(&self, mac: MacAddr) -> Port {
        Port { mac, tx: self.tx.clone(), rx: self.tx.subscribe() }
    }

    /// Returns a tap that sees every frame on the segment, including its sender.
    pub fn tap(&self) -> broadcast::Receiver<(MacAddr, Bytes)> {
        self.tx.subscribe()
    }
}

/// One station on a [`Segment`].
#[derive(Debug)]
pub struct Port {
    mac: MacAddr,
    tx: broadcast::Sender<(MacAddr, Bytes)>,
    rx: broadcast::Receiver<(MacAddr, Bytes)>,
}

#[async_trait::async_trait]
impl Transport for Port {
    type Error = Error;

    fn local_mac(&self) -> MacAddr {
        self.mac
    }

    async fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        // Nobody listening is not an error on a shared medium.
        let _ = self.tx.send((self.mac, Bytes::from(pad(frame))));
        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes, Self::Error> {
        loop {
            match self.rx.recv().await {
                Ok((src, _)) if src == self.mac => continue,
                Ok((_, frame)) => return Ok(frame),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(mac = %self.mac, "Dropped {n} frames");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(Error::Closed),
            }
        }
    }
}
