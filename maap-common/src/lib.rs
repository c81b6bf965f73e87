use std::time::SystemTime;

mod clock;
mod mac;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use mac::{compare_mac, MacAddr, ParseMacError};

/// Returns the current UNIX timestamp in nanoseconds.
#[inline]
pub fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Protocol constants from IEEE 1722-2016 Annex B.
pub mod constants {
    use std::time::Duration;

    use crate::MacAddr;

    /// The MAAP EtherType.
    pub const ETHERTYPE: u16 = 0x22F0;
    /// The AVTP subtype byte of a MAAP PDU, with the CD bit set.
    pub const SUBTYPE: u8 = 0xFE;
    /// MAAP version carried in every PDU.
    pub const MAAP_VERSION: u8 = 1;
    /// Control data length of a MAAP PDU.
    pub const CONTROL_DATA_LENGTH: u16 = 16;

    /// The multicast destination of MAAP traffic.
    pub const DEST_MAC: MacAddr = MacAddr::new(0x91E0_F000_FF00);
    /// First address of the dynamic allocation pool (B.5).
    pub const DYNAMIC_POOL_BASE: u64 = 0x91E0_F000_0000;
    /// Number of addresses in the dynamic allocation pool.
    pub const DYNAMIC_POOL_SIZE: u32 = 0xFE00;

    /// Probes sent after the first one before a range is considered acquired.
    pub const PROBE_RETRANSMITS: u32 = 3;
    pub const PROBE_INTERVAL_BASE: Duration = Duration::from_millis(500);
    pub const PROBE_INTERVAL_VARIATION_MS: u64 = 100;
    pub const ANNOUNCE_INTERVAL_BASE: Duration = Duration::from_millis(30_000);
    pub const ANNOUNCE_INTERVAL_VARIATION_MS: u64 = 2_000;

    /// The default TCP port of the control interface.
    pub const DEFAULT_CONTROL_PORT: u16 = 15364;
}
