//! ACMPDU (connection management) encoding and decoding.

use crate::encoding::{Reader, Writer};
use crate::ethernet::{MacAddress, SUBTYPE_ACMP};
use crate::types::{ConnectionFlags, StreamIdentification, UniqueIdentifier};
use crate::{DecodeError, EncodeError};

/// Octets following the stream_id field, fixed by the standard.
pub const ACMP_CONTROL_DATA_LENGTH: u16 = 44;
/// Full ACMPDU size without the Ethernet header.
pub const ACMPDU_LEN: usize = 4 + 8 + ACMP_CONTROL_DATA_LENGTH as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AcmpMessageType {
    ConnectTxCommand,
    ConnectTxResponse,
    DisconnectTxCommand,
    DisconnectTxResponse,
    GetTxStateCommand,
    GetTxStateResponse,
    ConnectRxCommand,
    ConnectRxResponse,
    DisconnectRxCommand,
    DisconnectRxResponse,
    GetRxStateCommand,
    GetRxStateResponse,
    GetTxConnectionCommand,
    GetTxConnectionResponse,
    Unknown(u8),
}

impl AcmpMessageType {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::ConnectTxCommand => 0,
            Self::ConnectTxResponse => 1,
            Self::DisconnectTxCommand => 2,
            Self::DisconnectTxResponse => 3,
            Self::GetTxStateCommand => 4,
            Self::GetTxStateResponse => 5,
            Self::ConnectRxCommand => 6,
            Self::ConnectRxResponse => 7,
            Self::DisconnectRxCommand => 8,
            Self::DisconnectRxResponse => 9,
            Self::GetRxStateCommand => 10,
            Self::GetRxStateResponse => 11,
            Self::GetTxConnectionCommand => 12,
            Self::GetTxConnectionResponse => 13,
            Self::Unknown(raw) => raw,
        }
    }

    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::ConnectTxCommand,
            1 => Self::ConnectTxResponse,
            2 => Self::DisconnectTxCommand,
            3 => Self::DisconnectTxResponse,
            4 => Self::GetTxStateCommand,
            5 => Self::GetTxStateResponse,
            6 => Self::ConnectRxCommand,
            7 => Self::ConnectRxResponse,
            8 => Self::DisconnectRxCommand,
            9 => Self::DisconnectRxResponse,
            10 => Self::GetRxStateCommand,
            11 => Self::GetRxStateResponse,
            12 => Self::GetTxConnectionCommand,
            13 => Self::GetTxConnectionResponse,
            other => Self::Unknown(other),
        }
    }

    /// Responses have the low bit set; commands do not.
    pub const fn is_response(self) -> bool {
        self.to_u8() & 0x01 != 0
    }

    pub const fn response_type(self) -> Self {
        Self::from_u8(self.to_u8() | 0x01)
    }
}

/// A decoded ACMPDU. Every field of the fixed 44-octet body is kept,
/// including the reserved trailer, so re-encoding reproduces the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Acmpdu {
    pub message_type: AcmpMessageType,
    /// Raw 5-bit wire status; see [`crate::status::AcmpStatus`].
    pub status: u8,
    pub stream_id: UniqueIdentifier,
    pub controller_entity_id: UniqueIdentifier,
    pub talker_entity_id: UniqueIdentifier,
    pub listener_entity_id: UniqueIdentifier,
    pub talker_unique_id: u16,
    pub listener_unique_id: u16,
    pub stream_dest_mac: MacAddress,
    pub connection_count: u16,
    pub sequence_id: u16,
    pub flags: ConnectionFlags,
    pub stream_vlan_id: u16,
    pub reserved: u16,
}

impl Acmpdu {
    /// A command skeleton with every identification field cleared.
    pub fn command(
        message_type: AcmpMessageType,
        controller_entity_id: UniqueIdentifier,
        sequence_id: u16,
    ) -> Self {
        Self {
            message_type,
            status: 0,
            stream_id: UniqueIdentifier::NULL,
            controller_entity_id,
            talker_entity_id: UniqueIdentifier::NULL,
            listener_entity_id: UniqueIdentifier::NULL,
            talker_unique_id: 0,
            listener_unique_id: 0,
            stream_dest_mac: MacAddress::UNSET,
            connection_count: 0,
            sequence_id,
            flags: ConnectionFlags::NONE,
            stream_vlan_id: 0,
            reserved: 0,
        }
    }

    pub fn talker_stream(&self) -> StreamIdentification {
        StreamIdentification::new(self.talker_entity_id, self.talker_unique_id)
    }

    pub fn listener_stream(&self) -> StreamIdentification {
        StreamIdentification::new(self.listener_entity_id, self.listener_unique_id)
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(SUBTYPE_ACMP)?;
        w.write_u8(self.message_type.to_u8() & 0x0F)?;
        w.write_be_u16((((self.status & 0x1F) as u16) << 11) | ACMP_CONTROL_DATA_LENGTH)?;
        w.write_be_u64(self.stream_id.raw())?;
        w.write_be_u64(self.controller_entity_id.raw())?;
        w.write_be_u64(self.talker_entity_id.raw())?;
        w.write_be_u64(self.listener_entity_id.raw())?;
        w.write_be_u16(self.talker_unique_id)?;
        w.write_be_u16(self.listener_unique_id)?;
        w.write_all(&self.stream_dest_mac.0)?;
        w.write_be_u16(self.connection_count)?;
        w.write_be_u16(self.sequence_id)?;
        w.write_be_u16(self.flags.raw())?;
        w.write_be_u16(self.stream_vlan_id)?;
        w.write_be_u16(self.reserved)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != SUBTYPE_ACMP {
            return Err(DecodeError::InvalidSubtype);
        }
        let message_type = AcmpMessageType::from_u8(r.read_u8()? & 0x0F);
        let word = r.read_be_u16()?;
        let status = (word >> 11) as u8;
        if word & 0x07FF != ACMP_CONTROL_DATA_LENGTH {
            return Err(DecodeError::InvalidLength);
        }
        Ok(Self {
            message_type,
            status,
            stream_id: UniqueIdentifier::new(r.read_be_u64()?),
            controller_entity_id: UniqueIdentifier::new(r.read_be_u64()?),
            talker_entity_id: UniqueIdentifier::new(r.read_be_u64()?),
            listener_entity_id: UniqueIdentifier::new(r.read_be_u64()?),
            talker_unique_id: r.read_be_u16()?,
            listener_unique_id: r.read_be_u16()?,
            stream_dest_mac: MacAddress(r.read_sextet()?),
            connection_count: r.read_be_u16()?,
            sequence_id: r.read_be_u16()?,
            flags: ConnectionFlags(r.read_be_u16()?),
            stream_vlan_id: r.read_be_u16()?,
            reserved: r.read_be_u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AcmpMessageType, Acmpdu, ACMPDU_LEN};
    use crate::encoding::{Reader, Writer};
    use crate::ethernet::MacAddress;
    use crate::types::{ConnectionFlags, UniqueIdentifier};

    #[test]
    fn round_trips_exactly() {
        let mut acmp = Acmpdu::command(
            AcmpMessageType::ConnectRxCommand,
            UniqueIdentifier::new(0xC0),
            9,
        );
        acmp.talker_entity_id = UniqueIdentifier::new(0x7A);
        acmp.listener_entity_id = UniqueIdentifier::new(0x15);
        acmp.stream_dest_mac = MacAddress([0x91, 0xE0, 0xF0, 0x00, 0x12, 0x34]);
        acmp.flags = ConnectionFlags::CLASS_B;
        acmp.reserved = 0xFFEE;

        let mut buf = [0u8; ACMPDU_LEN];
        let mut w = Writer::new(&mut buf);
        acmp.encode(&mut w).unwrap();
        assert_eq!(w.as_written().len(), ACMPDU_LEN);

        let mut r = Reader::new(w.as_written());
        let decoded = Acmpdu::decode(&mut r).unwrap();
        assert_eq!(decoded, acmp);
        assert_eq!(decoded.stream_dest_mac, acmp.stream_dest_mac);
    }

    #[test]
    fn response_bit() {
        assert!(AcmpMessageType::ConnectRxResponse.is_response());
        assert!(!AcmpMessageType::ConnectRxCommand.is_response());
        assert_eq!(
            AcmpMessageType::GetTxStateCommand.response_type(),
            AcmpMessageType::GetTxStateResponse
        );
    }

    #[test]
    fn unknown_message_type_decodes() {
        let acmp = Acmpdu::command(AcmpMessageType::Unknown(14), UniqueIdentifier::new(1), 0);
        let mut buf = [0u8; ACMPDU_LEN];
        let mut w = Writer::new(&mut buf);
        acmp.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        let decoded = Acmpdu::decode(&mut r).unwrap();
        assert_eq!(decoded.message_type, AcmpMessageType::Unknown(14));
    }
}
