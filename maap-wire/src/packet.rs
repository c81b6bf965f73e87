use bytes::{Buf, BufMut};
use thiserror::Error;

use maap_common::{constants, MacAddr};

/// Size of a MAAP frame on the wire, Ethernet header included.
pub const PACKET_LEN: usize = 42;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Truncated MAAP packet: {0} bytes, need {PACKET_LEN}")]
    Truncated(usize),
}

/// MAAP message types (IEEE 1722-2016 B.2.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Probe = 1,
    Defend = 2,
    Announce = 3,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Probe),
            2 => Ok(Self::Defend),
            3 => Ok(Self::Announce),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Probe => f.write_str("PROBE"),
            Self::Defend => f.write_str("DEFEND"),
            Self::Announce => f.write_str("ANNOUNCE"),
        }
    }
}

/// A MAAP frame, Ethernet header included.
///
/// Fields are kept raw so that any 42 bytes can be decoded; it is up to the receiver to check
/// that the frame is actually MAAP (see [`MaapPacket::is_maap`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaapPacket {
    pub dest: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
    /// The CD bit and AVTP subtype, as a single byte.
    pub subtype: u8,
    pub sv: bool,
    pub version: u8,
    pub message_type: u8,
    pub maap_version: u8,
    pub control_data_length: u16,
    pub stream_id: u64,
    pub requested_start_address: u64,
    pub requested_count: u16,
    pub conflict_start_address: u64,
    pub conflict_count: u16,
}

impl MaapPacket {
    /// Creates a packet of the given type with every protocol constant filled in and all
    /// address fields zeroed.
    pub fn new(message_type: MessageType, dest: MacAddr, src: MacAddr) -> Self {
        Self {
            dest,
            src,
            ethertype: constants::ETHERTYPE,
            subtype: constants::SUBTYPE,
            sv: false,
            version: 0,
            message_type: message_type as u8,
            maap_version: constants::MAAP_VERSION,
            control_data_length: constants::CONTROL_DATA_LENGTH,
            stream_id: 0,
            requested_start_address: 0,
            requested_count: 0,
            conflict_start_address: 0,
            conflict_count: 0,
        }
    }

    /// Sets the requested range.
    pub fn with_request(mut self, start: u64, count: u16) -> Self {
        self.requested_start_address = start;
        self.requested_count = count;
        self
    }

    /// Sets the conflicting range, only meaningful for a defend.
    pub fn with_conflict(mut self, start: u64, count: u16) -> Self {
        self.conflict_start_address = start;
        self.conflict_count = count;
        self
    }

    /// Returns the message type, if it is one MAAP knows about.
    #[inline]
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::try_from(self.message_type).ok()
    }

    /// Returns `true` if the header fields identify this as a MAAP PDU we understand.
    pub fn is_maap(&self) -> bool {
        self.ethertype == constants::ETHERTYPE &&
            self.subtype == constants::SUBTYPE &&
            self.version == 0 &&
            self.control_data_length == constants::CONTROL_DATA_LENGTH &&
            self.kind().is_some()
    }

    /// Serializes the packet into its 42 byte wire form.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        let mut buf = &mut out[..];

        buf.put_uint(self.dest.as_u64(), 6);
        buf.put_uint(self.src.as_u64(), 6);
        buf.put_u16(self.ethertype);
        buf.put_u8(self.subtype);
        buf.put_u8(
            ((self.sv as u8) << 7) | ((self.version & 0x07) << 4) | (self.message_type & 0x0F),
        );
        buf.put_u16(
            ((self.maap_version as u16 & 0x1F) << 11) | (self.control_data_length & 0x07FF),
        );
        buf.put_u64(self.stream_id);
        buf.put_uint(self.requested_start_address & 0xFFFF_FFFF_FFFF, 6);
        buf.put_u16(self.requested_count);
        buf.put_uint(self.conflict_start_address & 0xFFFF_FFFF_FFFF, 6);
        buf.put_u16(self.conflict_count);

        out
    }

    /// Parses a packet from the first 42 bytes of `src`. Anything past that (Ethernet padding)
    /// is ignored.
    pub fn decode(src: &[u8]) -> Result<Self, Error> {
        if src.len() < PACKET_LEN {
            return Err(Error::Truncated(src.len()));
        }

        let mut buf = &src[..PACKET_LEN];

        let dest = MacAddr::new(buf.get_uint(6));
        let src = MacAddr::new(buf.get_uint(6));
        let ethertype = buf.get_u16();
        let subtype = buf.get_u8();
        let flags = buf.get_u8();
        let lengths = buf.get_u16();

        Ok(Self {
            dest,
            src,
            ethertype,
            subtype,
            sv: flags & 0x80 != 0,
            version: (flags & 0x70) >> 4,
            message_type: flags & 0x0F,
            maap_version: (lengths >> 11) as u8,
            control_data_length: lengths & 0x07FF,
            stream_id: buf.get_u64(),
            requested_start_address: buf.get_uint(6),
            requested_count: buf.get_u16(),
            conflict_start_address: buf.get_uint(6),
            conflict_count: buf.get_u16(),
        })
    }
}
