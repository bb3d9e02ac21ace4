//! Milan Vendor Unique (AECP MVU) payloads.
//!
//! A vendor-unique AECPDU starts with a 6-byte protocol identifier. Only the
//! Milan identifier selects MVU decoding here; payloads under other
//! identifiers are opaque to this crate and surface as raw bytes.

use crate::encoding::{Reader, Writer};
use crate::types::ConfigurationIndex;
use crate::{DecodeError, EncodeError};

/// The Milan association's vendor-unique protocol identifier.
pub const MILAN_PROTOCOL_ID: [u8; 6] = [0x00, 0x1B, 0xC5, 0x0A, 0xC1, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MvuCommandType {
    GetMilanInfo,
    Other(u16),
}

impl MvuCommandType {
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::GetMilanInfo => 0x0000,
            Self::Other(raw) => raw & 0x7FFF,
        }
    }

    pub const fn from_u16(raw: u16) -> Self {
        match raw {
            0x0000 => Self::GetMilanInfo,
            other => Self::Other(other & 0x7FFF),
        }
    }
}

/// The protocol id plus the 15-bit command type that starts every MVU
/// payload (the top bit mirrors the AEM unsolicited bit and is reserved).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MvuEnvelope {
    pub command_type: MvuCommandType,
}

impl MvuEnvelope {
    pub const LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_all(&MILAN_PROTOCOL_ID)?;
        w.write_be_u16(self.command_type.to_u16() & 0x7FFF)
    }

    /// Returns `None` when the payload belongs to some other vendor.
    pub fn decode(r: &mut Reader<'_>) -> Result<Option<Self>, DecodeError> {
        let protocol_id = r.read_sextet()?;
        if protocol_id != MILAN_PROTOCOL_ID {
            return Ok(None);
        }
        let word = r.read_be_u16()?;
        Ok(Some(Self {
            command_type: MvuCommandType::from_u16(word & 0x7FFF),
        }))
    }
}

/// GET_MILAN_INFO command body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetMilanInfoCommand {
    pub configuration_index: ConfigurationIndex,
}

impl GetMilanInfoCommand {
    pub const LEN: usize = 4;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u16(self.configuration_index)?;
        w.write_be_u16(0)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let configuration_index = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        Ok(Self {
            configuration_index,
        })
    }
}

/// GET_MILAN_INFO response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MilanInfo {
    pub configuration_index: ConfigurationIndex,
    pub protocol_version: u32,
    pub features_flags: u32,
    pub certification_version: u32,
}

impl MilanInfo {
    pub const LEN: usize = 16;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u16(self.configuration_index)?;
        w.write_be_u16(0)?;
        w.write_be_u32(self.protocol_version)?;
        w.write_be_u32(self.features_flags)?;
        w.write_be_u32(self.certification_version)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let configuration_index = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        Ok(Self {
            configuration_index,
            protocol_version: r.read_be_u32()?,
            features_flags: r.read_be_u32()?,
            certification_version: r.read_be_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{GetMilanInfoCommand, MilanInfo, MvuCommandType, MvuEnvelope, MILAN_PROTOCOL_ID};
    use crate::encoding::{Reader, Writer};

    #[test]
    fn milan_envelope_round_trips() {
        let env = MvuEnvelope {
            command_type: MvuCommandType::GetMilanInfo,
        };
        let mut buf = [0u8; MvuEnvelope::LEN];
        let mut w = Writer::new(&mut buf);
        env.encode(&mut w).unwrap();
        assert_eq!(&buf[..6], &MILAN_PROTOCOL_ID);

        let mut r = Reader::new(&buf);
        assert_eq!(MvuEnvelope::decode(&mut r).unwrap(), Some(env));
    }

    #[test]
    fn foreign_protocol_id_is_not_milan() {
        let buf = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x00];
        let mut r = Reader::new(&buf);
        assert_eq!(MvuEnvelope::decode(&mut r).unwrap(), None);
    }

    #[test]
    fn milan_info_round_trips() {
        let info = MilanInfo {
            configuration_index: 1,
            protocol_version: 1,
            features_flags: 0x0000_0001,
            certification_version: 0x0100_0000,
        };
        let mut buf = [0u8; MilanInfo::LEN];
        let mut w = Writer::new(&mut buf);
        info.encode(&mut w).unwrap();

        let mut r = Reader::new(&buf);
        assert_eq!(MilanInfo::decode(&mut r).unwrap(), info);

        let cmd = GetMilanInfoCommand {
            configuration_index: 1,
        };
        let mut buf = [0u8; GetMilanInfoCommand::LEN];
        let mut w = Writer::new(&mut buf);
        cmd.encode(&mut w).unwrap();
        let mut r = Reader::new(&buf);
        assert_eq!(GetMilanInfoCommand::decode(&mut r).unwrap(), cmd);
    }
}
