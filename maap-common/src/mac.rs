use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid MAC address: {0:?}")]
pub struct ParseMacError(String);

/// A 48-bit MAC address, stored in the low bits of a `u64`.
///
/// MAAP treats both station addresses and multicast allocations as plain 48-bit integers, so
/// arithmetic on the inner value (`start + count - 1`) is how ranges are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddr(u64);

impl MacAddr {
    const MASK: u64 = 0xFFFF_FFFF_FFFF;

    /// The all-zero address.
    pub const ZERO: Self = Self(0);

    /// Creates a new address from the low 48 bits of `value`.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value & Self::MASK)
    }

    #[inline]
    pub const fn from_octets(octets: [u8; 6]) -> Self {
        Self(u64::from_be_bytes([
            0, 0, octets[0], octets[1], octets[2], octets[3], octets[4], octets[5],
        ]))
    }

    #[inline]
    pub const fn octets(&self) -> [u8; 6] {
        let b = self.0.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }

    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for MacAddr {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self::from_octets(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.octets();
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", o[0], o[1], o[2], o[3], o[4], o[5])
    }
}

impl FromStr for MacAddr {
    type Err = ParseMacError;

    /// Accepts either colon/dash separated octets (`91:e0:f0:00:ff:00`) or a plain hex number
    /// with an optional `0x` prefix (`0x91E0F000FF00`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMacError(s.to_string());

        if s.contains([':', '-']) {
            let mut octets = [0u8; 6];
            let mut parts = s.split([':', '-']);
            for octet in octets.iter_mut() {
                let part = parts.next().ok_or_else(err)?;
                *octet = u8::from_str_radix(part, 16).map_err(|_| err())?;
            }
            if parts.next().is_some() {
                return Err(err());
            }
            return Ok(Self::from_octets(octets));
        }

        let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let value = u64::from_str_radix(hex, 16).map_err(|_| err())?;
        if value > Self::MASK {
            return Err(err());
        }

        Ok(Self(value))
    }
}

/// MAAP tie-break between two stations claiming the same addresses.
///
/// The addresses are compared one byte at a time starting from the least significant byte. Returns
/// `true` if `local` wins, i.e. its first differing byte is the smaller one. Identical addresses
/// count as a local win, since that can only be our own frame reflected back at us.
pub fn compare_mac(local: MacAddr, remote: MacAddr) -> bool {
    let (mut local, mut remote) = (local.as_u64(), remote.as_u64());

    for _ in 0..6 {
        let (l, r) = (local as u8, remote as u8);
        if l != r {
            return l < r;
        }

        local >>= 8;
        remote >>= 8;
    }

    true
}
