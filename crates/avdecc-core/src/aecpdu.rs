//! AECPDU common header and the AEM payload envelope.
//!
//! An AECPDU is the common header (subtype, message type, 5-bit status,
//! control_data_length, target and controller entity ids, sequence id)
//! followed by a dialect payload: AEM (unsolicited bit + 15-bit command
//! type), Address Access (TLVs, see [`crate::aa`]) or Vendor Unique (6-byte
//! protocol id, see [`crate::mvu`]).

use crate::encoding::{Reader, Writer};
use crate::ethernet::SUBTYPE_AECP;
use crate::types::UniqueIdentifier;
use crate::{DecodeError, EncodeError};

/// Octets of the common header that `control_data_length` does not count
/// (it counts from just after `target_entity_id`).
pub const AECP_HEADER_LEN: usize = 12;
/// controller_entity_id + sequence_id, always present after the target id.
const AECP_FIXED_TRAILER: u16 = 10;
/// Largest value representable in the 11-bit control_data_length field.
const MAX_CONTROL_DATA_LENGTH: u16 = 0x07FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AecpMessageType {
    AemCommand,
    AemResponse,
    AaCommand,
    AaResponse,
    VendorUniqueCommand,
    VendorUniqueResponse,
    Unknown(u8),
}

impl AecpMessageType {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::AemCommand => 0,
            Self::AemResponse => 1,
            Self::AaCommand => 2,
            Self::AaResponse => 3,
            Self::VendorUniqueCommand => 6,
            Self::VendorUniqueResponse => 7,
            Self::Unknown(raw) => raw,
        }
    }

    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::AemCommand,
            1 => Self::AemResponse,
            2 => Self::AaCommand,
            3 => Self::AaResponse,
            6 => Self::VendorUniqueCommand,
            7 => Self::VendorUniqueResponse,
            other => Self::Unknown(other),
        }
    }

    pub const fn is_response(self) -> bool {
        matches!(
            self,
            Self::AemResponse | Self::AaResponse | Self::VendorUniqueResponse
        )
    }

    /// The response type a responder would use for this command type.
    pub const fn response_type(self) -> Self {
        match self {
            Self::AemCommand => Self::AemResponse,
            Self::AaCommand => Self::AaResponse,
            Self::VendorUniqueCommand => Self::VendorUniqueResponse,
            other => other,
        }
    }
}

/// The common AECP header.
///
/// `status` is the raw 5-bit wire status; its interpretation depends on the
/// dialect (see [`crate::status`]). `control_data_length` is computed on
/// encode from the payload length and is used on decode to bound the payload
/// (inbound Ethernet frames may carry padding past the PDU).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AecpHeader {
    pub message_type: AecpMessageType,
    pub status: u8,
    pub target_entity_id: UniqueIdentifier,
    pub controller_entity_id: UniqueIdentifier,
    pub sequence_id: u16,
    control_data_length: u16,
}

impl AecpHeader {
    pub fn command(
        message_type: AecpMessageType,
        target_entity_id: UniqueIdentifier,
        controller_entity_id: UniqueIdentifier,
        sequence_id: u16,
    ) -> Self {
        Self {
            message_type,
            status: 0,
            target_entity_id,
            controller_entity_id,
            sequence_id,
            control_data_length: 0,
        }
    }

    /// Octets of dialect payload following the sequence id.
    pub fn payload_len(&self) -> Result<usize, DecodeError> {
        self.control_data_length
            .checked_sub(AECP_FIXED_TRAILER)
            .map(usize::from)
            .ok_or(DecodeError::InvalidLength)
    }

    pub fn encode(&self, w: &mut Writer<'_>, payload_len: usize) -> Result<(), EncodeError> {
        let cdl = AECP_FIXED_TRAILER as usize + payload_len;
        if cdl > MAX_CONTROL_DATA_LENGTH as usize {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_u8(SUBTYPE_AECP)?;
        w.write_u8(self.message_type.to_u8() & 0x0F)?;
        w.write_be_u16((((self.status & 0x1F) as u16) << 11) | cdl as u16)?;
        w.write_be_u64(self.target_entity_id.raw())?;
        w.write_be_u64(self.controller_entity_id.raw())?;
        w.write_be_u16(self.sequence_id)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != SUBTYPE_AECP {
            return Err(DecodeError::InvalidSubtype);
        }
        let message_type = AecpMessageType::from_u8(r.read_u8()? & 0x0F);
        let word = r.read_be_u16()?;
        let status = (word >> 11) as u8;
        let control_data_length = word & MAX_CONTROL_DATA_LENGTH;
        if control_data_length < AECP_FIXED_TRAILER {
            return Err(DecodeError::InvalidLength);
        }
        let target_entity_id = UniqueIdentifier::new(r.read_be_u64()?);
        let controller_entity_id = UniqueIdentifier::new(r.read_be_u64()?);
        let sequence_id = r.read_be_u16()?;
        Ok(Self {
            message_type,
            status,
            target_entity_id,
            controller_entity_id,
            sequence_id,
            control_data_length,
        })
    }
}

/// AEM command types (IEEE 1722.1 table 7.126), the 15-bit value after the
/// unsolicited bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AemCommandType {
    AcquireEntity,
    LockEntity,
    EntityAvailable,
    ControllerAvailable,
    ReadDescriptor,
    WriteDescriptor,
    SetConfiguration,
    GetConfiguration,
    SetStreamFormat,
    GetStreamFormat,
    SetStreamInfo,
    GetStreamInfo,
    SetName,
    GetName,
    SetSamplingRate,
    GetSamplingRate,
    SetClockSource,
    GetClockSource,
    StartStreaming,
    StopStreaming,
    RegisterUnsolicitedNotification,
    DeregisterUnsolicitedNotification,
    IdentifyNotification,
    GetAvbInfo,
    GetCounters,
    GetAudioMap,
    AddAudioMappings,
    RemoveAudioMappings,
    StartOperation,
    AbortOperation,
    OperationStatus,
    Other(u16),
}

impl AemCommandType {
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::AcquireEntity => 0x0000,
            Self::LockEntity => 0x0001,
            Self::EntityAvailable => 0x0002,
            Self::ControllerAvailable => 0x0003,
            Self::ReadDescriptor => 0x0004,
            Self::WriteDescriptor => 0x0005,
            Self::SetConfiguration => 0x0006,
            Self::GetConfiguration => 0x0007,
            Self::SetStreamFormat => 0x0008,
            Self::GetStreamFormat => 0x0009,
            Self::SetStreamInfo => 0x000E,
            Self::GetStreamInfo => 0x000F,
            Self::SetName => 0x0010,
            Self::GetName => 0x0011,
            Self::SetSamplingRate => 0x0014,
            Self::GetSamplingRate => 0x0015,
            Self::SetClockSource => 0x0016,
            Self::GetClockSource => 0x0017,
            Self::StartStreaming => 0x0022,
            Self::StopStreaming => 0x0023,
            Self::RegisterUnsolicitedNotification => 0x0024,
            Self::DeregisterUnsolicitedNotification => 0x0025,
            Self::IdentifyNotification => 0x0026,
            Self::GetAvbInfo => 0x0027,
            Self::GetCounters => 0x0029,
            Self::GetAudioMap => 0x002B,
            Self::AddAudioMappings => 0x002C,
            Self::RemoveAudioMappings => 0x002D,
            Self::StartOperation => 0x002E,
            Self::AbortOperation => 0x002F,
            Self::OperationStatus => 0x0030,
            Self::Other(raw) => raw & 0x7FFF,
        }
    }

    pub const fn from_u16(raw: u16) -> Self {
        match raw {
            0x0000 => Self::AcquireEntity,
            0x0001 => Self::LockEntity,
            0x0002 => Self::EntityAvailable,
            0x0003 => Self::ControllerAvailable,
            0x0004 => Self::ReadDescriptor,
            0x0005 => Self::WriteDescriptor,
            0x0006 => Self::SetConfiguration,
            0x0007 => Self::GetConfiguration,
            0x0008 => Self::SetStreamFormat,
            0x0009 => Self::GetStreamFormat,
            0x000E => Self::SetStreamInfo,
            0x000F => Self::GetStreamInfo,
            0x0010 => Self::SetName,
            0x0011 => Self::GetName,
            0x0014 => Self::SetSamplingRate,
            0x0015 => Self::GetSamplingRate,
            0x0016 => Self::SetClockSource,
            0x0017 => Self::GetClockSource,
            0x0022 => Self::StartStreaming,
            0x0023 => Self::StopStreaming,
            0x0024 => Self::RegisterUnsolicitedNotification,
            0x0025 => Self::DeregisterUnsolicitedNotification,
            0x0026 => Self::IdentifyNotification,
            0x0027 => Self::GetAvbInfo,
            0x0029 => Self::GetCounters,
            0x002B => Self::GetAudioMap,
            0x002C => Self::AddAudioMappings,
            0x002D => Self::RemoveAudioMappings,
            0x002E => Self::StartOperation,
            0x002F => Self::AbortOperation,
            0x0030 => Self::OperationStatus,
            other => Self::Other(other & 0x7FFF),
        }
    }
}

/// The two-byte AEM envelope in front of every AEM command payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AemEnvelope {
    /// The `u` bit: set on responses an entity sends to registered
    /// controllers for state changes they did not request.
    pub unsolicited: bool,
    pub command_type: AemCommandType,
}

impl AemEnvelope {
    pub const LEN: usize = 2;

    pub const fn command(command_type: AemCommandType) -> Self {
        Self {
            unsolicited: false,
            command_type,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut word = self.command_type.to_u16() & 0x7FFF;
        if self.unsolicited {
            word |= 0x8000;
        }
        w.write_be_u16(word)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let word = r.read_be_u16()?;
        Ok(Self {
            unsolicited: word & 0x8000 != 0,
            command_type: AemCommandType::from_u16(word & 0x7FFF),
        })
    }
}
