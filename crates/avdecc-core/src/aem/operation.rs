//! START_OPERATION / ABORT_OPERATION / OPERATION_STATUS payloads, used for
//! long-running memory-object work (firmware upload, erase) that cannot
//! complete within a command timeout.

#![cfg(feature = "alloc")]

use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

pub const OPERATION_TYPE_STORE: u16 = 0x0001;
pub const OPERATION_TYPE_STORE_AND_REBOOT: u16 = 0x0002;
pub const OPERATION_TYPE_READ: u16 = 0x0003;
pub const OPERATION_TYPE_ERASE: u16 = 0x0004;
pub const OPERATION_TYPE_UPLOAD: u16 = 0x0005;

/// START_OPERATION command and response body. The target assigns
/// `operation_id` when the command's value is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOperationPayload {
    pub descriptor: DescriptorRef,
    pub operation_id: u16,
    pub operation_type: u16,
    pub data: Vec<u8>,
}

impl StartOperationPayload {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u16(self.operation_id)?;
        w.write_be_u16(self.operation_type)?;
        w.write_all(&self.data)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let operation_id = r.read_be_u16()?;
        let operation_type = r.read_be_u16()?;
        let data = r.read_exact(r.remaining())?.to_vec();
        Ok(Self {
            descriptor,
            operation_id,
            operation_type,
            data,
        })
    }
}

/// ABORT_OPERATION command and response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortOperationPayload {
    pub descriptor: DescriptorRef,
    pub operation_id: u16,
}

impl AbortOperationPayload {
    pub const LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u16(self.operation_id)?;
        w.write_be_u16(0)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let operation_id = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        Ok(Self {
            descriptor,
            operation_id,
        })
    }
}

/// OPERATION_STATUS unsolicited response body; `percent_complete` is in
/// thousandths (0–1000).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationStatusPayload {
    pub descriptor: DescriptorRef,
    pub operation_id: u16,
    pub percent_complete: u16,
}

impl OperationStatusPayload {
    pub const LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u16(self.operation_id)?;
        w.write_be_u16(self.percent_complete)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            descriptor: DescriptorRef::decode(r)?,
            operation_id: r.read_be_u16()?,
            percent_complete: r.read_be_u16()?,
        })
    }
}
