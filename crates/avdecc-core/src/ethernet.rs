//! Ethernet-level framing shared by the three PDU families.

use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};
use core::fmt;

/// EtherType carrying every AVTP/AVDECC control PDU.
pub const ETHERTYPE_AVTP: u16 = 0x22F0;

/// AVTP subtype octets as they appear on the wire (control bit set).
pub const SUBTYPE_ADP: u8 = 0xFA;
pub const SUBTYPE_AECP: u8 = 0xFB;
pub const SUBTYPE_ACMP: u8 = 0xFC;

/// A 48-bit IEEE MAC address. The all-zero value is reserved as "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const UNSET: Self = Self([0; 6]);

    /// The AVDECC multicast group all ADP and targeted-discovery traffic, and
    /// every ACMP message, is addressed to.
    pub const AVDECC_MULTICAST: Self = Self([0x91, 0xE0, 0xF0, 0x01, 0x00, 0x00]);

    /// Identify-notification multicast group (IEEE 1722.1 annex B).
    pub const IDENTIFY_MULTICAST: Self = Self([0x91, 0xE0, 0xF0, 0x01, 0x00, 0x01]);

    pub const fn raw(self) -> [u8; 6] {
        self.0
    }

    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }

    pub const fn is_multicast(self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(raw: [u8; 6]) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// The 14-byte Ethernet II header in front of every AVDECC PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dest: MacAddress,
    pub source: MacAddress,
    pub ethertype: u16,
}

impl EthernetHeader {
    pub const LEN: usize = 14;

    pub const fn avtp(dest: MacAddress, source: MacAddress) -> Self {
        Self {
            dest,
            source,
            ethertype: ETHERTYPE_AVTP,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_all(&self.dest.0)?;
        w.write_all(&self.source.0)?;
        w.write_be_u16(self.ethertype)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let dest = MacAddress(r.read_sextet()?);
        let source = MacAddress(r.read_sextet()?);
        let ethertype = r.read_be_u16()?;
        Ok(Self {
            dest,
            source,
            ethertype,
        })
    }

    /// Decodes the header and rejects anything that is not an AVTP frame.
    pub fn decode_avtp(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let header = Self::decode(r)?;
        if header.ethertype != ETHERTYPE_AVTP {
            return Err(DecodeError::InvalidEtherType);
        }
        Ok(header)
    }
}
