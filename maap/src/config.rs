use std::net::{Ipv4Addr, SocketAddr};

use maap_common::{constants, MacAddr};

/// Settings of a running daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Where the control server listens. `None` disables it.
    pub control_addr: Option<SocketAddr>,
    /// Destination of probes and announces.
    pub dest_mac: MacAddr,
    /// The maximum number of concurrent control clients.
    pub max_clients: usize,
    /// Range to initialize with at startup, before any command arrives.
    pub init: Option<(u64, u32)>,
    /// Fixed RNG seed, for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            control_addr: Some(SocketAddr::from((
                Ipv4Addr::LOCALHOST,
                constants::DEFAULT_CONTROL_PORT,
            ))),
            dest_mac: constants::DEST_MAC,
            max_clients: 32,
            init: None,
            seed: None,
        }
    }
}

impl DaemonConfig {
    /// Listens for control clients on localhost at `port`. Port 0 picks a free one.
    pub fn port(mut self, port: u16) -> Self {
        self.control_addr = Some(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
        self
    }

    /// Runs without a control server.
    pub fn no_control(mut self) -> Self {
        self.control_addr = None;
        self
    }

    pub fn dest_mac(mut self, dest_mac: MacAddr) -> Self {
        self.dest_mac = dest_mac;
        self
    }

    /// Sets the number of maximum concurrent clients.
    pub fn max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// Initializes with `base`/`len` on startup.
    pub fn init(mut self, base: u64, len: u32) -> Self {
        self.init = Some((base, len));
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
