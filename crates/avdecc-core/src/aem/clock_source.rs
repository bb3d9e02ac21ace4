use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::types::DescriptorIndex;
use crate::{DecodeError, EncodeError};

/// SET_CLOCK_SOURCE command/response and GET_CLOCK_SOURCE response body; the
/// descriptor is the clock domain being retargeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSourcePayload {
    pub descriptor: DescriptorRef,
    pub clock_source_index: DescriptorIndex,
}

impl ClockSourcePayload {
    pub const LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u16(self.clock_source_index)?;
        w.write_be_u16(0)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let clock_source_index = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        Ok(Self {
            descriptor,
            clock_source_index,
        })
    }
}
