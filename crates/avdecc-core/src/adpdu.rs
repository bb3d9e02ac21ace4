//! ADPDU (discovery protocol) encoding and decoding.
//!
//! The ADPDU is a fixed-size PDU: a 4-byte control header, the 8-byte
//! entity_id, then 56 octets of advertisement data. Reserved fields are kept
//! in the struct so a decode/encode cycle reproduces the input exactly.

use crate::encoding::{Reader, Writer};
use crate::ethernet::SUBTYPE_ADP;
use crate::types::{
    ControllerCapabilities, EntityCapabilities, ListenerCapabilities, TalkerCapabilities,
    UniqueIdentifier,
};
use crate::{DecodeError, EncodeError};

/// Octets following the entity_id field, fixed by the standard.
pub const ADP_CONTROL_DATA_LENGTH: u16 = 56;
/// Full ADPDU size without the Ethernet header.
pub const ADPDU_LEN: usize = 4 + 8 + ADP_CONTROL_DATA_LENGTH as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdpMessageType {
    EntityAvailable,
    EntityDeparting,
    EntityDiscover,
    /// Message types this implementation does not know. Decoded structurally
    /// so observers still see the traffic.
    Unknown(u8),
}

impl AdpMessageType {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::EntityAvailable => 0,
            Self::EntityDeparting => 1,
            Self::EntityDiscover => 2,
            Self::Unknown(raw) => raw,
        }
    }

    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::EntityAvailable,
            1 => Self::EntityDeparting,
            2 => Self::EntityDiscover,
            other => Self::Unknown(other),
        }
    }
}

/// A decoded ADPDU.
///
/// `valid_time_seconds` is carried on the wire in two-second units; the
/// constructor and the codec convert, so the struct always holds seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Adpdu {
    pub message_type: AdpMessageType,
    pub valid_time_seconds: u8,
    pub entity_id: UniqueIdentifier,
    pub entity_model_id: UniqueIdentifier,
    pub entity_capabilities: EntityCapabilities,
    pub talker_stream_sources: u16,
    pub talker_capabilities: TalkerCapabilities,
    pub listener_stream_sinks: u16,
    pub listener_capabilities: ListenerCapabilities,
    pub controller_capabilities: ControllerCapabilities,
    pub available_index: u32,
    pub gptp_grandmaster_id: UniqueIdentifier,
    pub gptp_domain_number: u8,
    pub reserved0: [u8; 3],
    pub identify_control_index: u16,
    pub interface_index: u16,
    pub association_id: UniqueIdentifier,
    pub reserved1: u32,
}

impl Adpdu {
    /// A DISCOVER request. `entity_id` of [`UniqueIdentifier::NULL`] asks
    /// every entity on the network to advertise.
    pub fn discover(entity_id: UniqueIdentifier) -> Self {
        Self {
            message_type: AdpMessageType::EntityDiscover,
            valid_time_seconds: 0,
            entity_id,
            entity_model_id: UniqueIdentifier::NULL,
            entity_capabilities: EntityCapabilities::NONE,
            talker_stream_sources: 0,
            talker_capabilities: TalkerCapabilities::NONE,
            listener_stream_sinks: 0,
            listener_capabilities: ListenerCapabilities::NONE,
            controller_capabilities: ControllerCapabilities::NONE,
            available_index: 0,
            gptp_grandmaster_id: UniqueIdentifier::NULL,
            gptp_domain_number: 0,
            reserved0: [0; 3],
            identify_control_index: 0,
            interface_index: 0,
            association_id: UniqueIdentifier::NULL,
            reserved1: 0,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let valid_time = self.valid_time_seconds / 2;
        if valid_time > 0x1F {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_u8(SUBTYPE_ADP)?;
        w.write_u8(self.message_type.to_u8() & 0x0F)?;
        w.write_be_u16(((valid_time as u16) << 11) | ADP_CONTROL_DATA_LENGTH)?;
        w.write_be_u64(self.entity_id.raw())?;
        w.write_be_u64(self.entity_model_id.raw())?;
        w.write_be_u32(self.entity_capabilities.raw())?;
        w.write_be_u16(self.talker_stream_sources)?;
        w.write_be_u16(self.talker_capabilities.raw())?;
        w.write_be_u16(self.listener_stream_sinks)?;
        w.write_be_u16(self.listener_capabilities.raw())?;
        w.write_be_u32(self.controller_capabilities.raw())?;
        w.write_be_u32(self.available_index)?;
        w.write_be_u64(self.gptp_grandmaster_id.raw())?;
        w.write_u8(self.gptp_domain_number)?;
        w.write_all(&self.reserved0)?;
        w.write_be_u16(self.identify_control_index)?;
        w.write_be_u16(self.interface_index)?;
        w.write_be_u64(self.association_id.raw())?;
        w.write_be_u32(self.reserved1)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != SUBTYPE_ADP {
            return Err(DecodeError::InvalidSubtype);
        }
        let message_type = AdpMessageType::from_u8(r.read_u8()? & 0x0F);
        let word = r.read_be_u16()?;
        let valid_time = (word >> 11) as u8;
        if word & 0x07FF != ADP_CONTROL_DATA_LENGTH {
            return Err(DecodeError::InvalidLength);
        }
        let entity_id = UniqueIdentifier::new(r.read_be_u64()?);
        let entity_model_id = UniqueIdentifier::new(r.read_be_u64()?);
        let entity_capabilities = EntityCapabilities(r.read_be_u32()?);
        let talker_stream_sources = r.read_be_u16()?;
        let talker_capabilities = TalkerCapabilities(r.read_be_u16()?);
        let listener_stream_sinks = r.read_be_u16()?;
        let listener_capabilities = ListenerCapabilities(r.read_be_u16()?);
        let controller_capabilities = ControllerCapabilities(r.read_be_u32()?);
        let available_index = r.read_be_u32()?;
        let gptp_grandmaster_id = UniqueIdentifier::new(r.read_be_u64()?);
        let gptp_domain_number = r.read_u8()?;
        let mut reserved0 = [0u8; 3];
        reserved0.copy_from_slice(r.read_exact(3)?);
        let identify_control_index = r.read_be_u16()?;
        let interface_index = r.read_be_u16()?;
        let association_id = UniqueIdentifier::new(r.read_be_u64()?);
        let reserved1 = r.read_be_u32()?;

        Ok(Self {
            message_type,
            valid_time_seconds: valid_time * 2,
            entity_id,
            entity_model_id,
            entity_capabilities,
            talker_stream_sources,
            talker_capabilities,
            listener_stream_sinks,
            listener_capabilities,
            controller_capabilities,
            available_index,
            gptp_grandmaster_id,
            gptp_domain_number,
            reserved0,
            identify_control_index,
            interface_index,
            association_id,
            reserved1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AdpMessageType, Adpdu, ADPDU_LEN};
    use crate::encoding::{Reader, Writer};
    use crate::types::{EntityCapabilities, UniqueIdentifier};
    use crate::DecodeError;

    fn sample() -> Adpdu {
        let mut adp = Adpdu::discover(UniqueIdentifier::NULL);
        adp.message_type = AdpMessageType::EntityAvailable;
        adp.valid_time_seconds = 62;
        adp.entity_id = UniqueIdentifier::new(0x0011_2233_4455_6677);
        adp.entity_model_id = UniqueIdentifier::new(0x0011_2233_0000_0001);
        adp.entity_capabilities = EntityCapabilities::AEM_SUPPORTED;
        adp.talker_stream_sources = 8;
        adp.listener_stream_sinks = 8;
        adp.available_index = 42;
        adp.gptp_grandmaster_id = UniqueIdentifier::new(0x0011_2233_4455_0000);
        adp.association_id = UniqueIdentifier::UNINITIALIZED;
        adp
    }

    #[test]
    fn round_trips_exactly() {
        let adp = sample();
        let mut buf = [0u8; ADPDU_LEN];
        let mut w = Writer::new(&mut buf);
        adp.encode(&mut w).unwrap();
        assert_eq!(w.as_written().len(), ADPDU_LEN);

        let mut r = Reader::new(w.as_written());
        assert_eq!(Adpdu::decode(&mut r).unwrap(), adp);
    }

    #[test]
    fn reserved_bytes_survive_a_round_trip() {
        let mut adp = sample();
        adp.reserved0 = [0xDE, 0xAD, 0xBE];
        adp.reserved1 = 0xCAFE_BABE;

        let mut buf = [0u8; ADPDU_LEN];
        let mut w = Writer::new(&mut buf);
        adp.encode(&mut w).unwrap();
        let mut r = Reader::new(w.as_written());
        let decoded = Adpdu::decode(&mut r).unwrap();
        assert_eq!(decoded.reserved0, [0xDE, 0xAD, 0xBE]);
        assert_eq!(decoded.reserved1, 0xCAFE_BABE);
    }

    #[test]
    fn unknown_message_type_decodes() {
        let mut buf = [0u8; ADPDU_LEN];
        let mut w = Writer::new(&mut buf);
        sample().encode(&mut w).unwrap();
        buf[1] = 0x0D;

        let mut r = Reader::new(&buf);
        let decoded = Adpdu::decode(&mut r).unwrap();
        assert_eq!(decoded.message_type, AdpMessageType::Unknown(0x0D));
    }

    #[test]
    fn rejects_bad_control_data_length() {
        let mut buf = [0u8; ADPDU_LEN];
        let mut w = Writer::new(&mut buf);
        sample().encode(&mut w).unwrap();
        buf[3] = 55;

        let mut r = Reader::new(&buf);
        assert_eq!(Adpdu::decode(&mut r).unwrap_err(), DecodeError::InvalidLength);
    }
}
