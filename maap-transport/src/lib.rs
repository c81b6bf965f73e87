use bytes::Bytes;

use maap_common::MacAddr;

mod ethernet;
pub use ethernet::{Error, Ethernet};

pub mod memory;

/// A link layer port that MAAP frames are sent and received on.
///
/// `recv` must be cancel safe: the daemon polls it inside `tokio::select!`.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The station address frames are sent from.
    fn local_mac(&self) -> MacAddr;

    /// Puts one complete Ethernet frame on the wire.
    async fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Waits for the next MAAP frame sent by someone else.
    async fn recv(&mut self) -> Result<Bytes, Self::Error>;
}

/// Minimum Ethernet frame length, excluding the FCS. Shorter frames are zero padded.
pub const MIN_FRAME_LEN: usize = 60;

/// Returns `frame` zero padded to [`MIN_FRAME_LEN`].
pub(crate) fn pad(frame: &[u8]) -> Vec<u8> {
    let mut out = frame.to_vec();
    if out.len() < MIN_FRAME_LEN {
        out.resize(MIN_FRAME_LEN, 0);
    }
    out
}
