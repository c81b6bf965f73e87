//! The MAAP (IEEE 1722-2016 Annex B) negotiation engine.
//!
//! [`Engine`] is a synchronous state machine. It never touches the network or sleeps: it turns
//! commands, received frames and timer ticks into frames to send and notifications to deliver.

mod engine;
pub use engine::{AddressPool, Engine, EngineConfig, Error, ReservationInfo, State};

pub mod intervals;

mod notify;
pub use notify::{NotificationSink, SenderId};

mod timer;
