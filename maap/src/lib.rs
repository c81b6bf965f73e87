//! A MAAP (IEEE 1722-2016 Annex B) daemon: negotiates blocks of multicast MAC addresses on a LAN
//! on behalf of local clients.

use thiserror::Error;

mod config;
pub use config::DaemonConfig;

mod control;
pub use control::run_client;

mod driver;
pub use driver::Daemon;

pub use maap_common::{compare_mac, constants, Clock, MacAddr, ManualClock, MonotonicClock};
pub use maap_engine::{
    intervals, AddressPool, Engine, EngineConfig, Error as EngineError, ReservationInfo, SenderId,
    State,
};
pub use maap_transport::{memory, Ethernet, Transport};
pub use maap_wire::{control as protocol, packet, MaapPacket, MessageType};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),
    #[error("Transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}
