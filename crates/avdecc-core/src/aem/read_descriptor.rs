use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::types::ConfigurationIndex;
use crate::{DecodeError, EncodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadDescriptorCommand {
    pub configuration_index: ConfigurationIndex,
    pub descriptor: DescriptorRef,
}

impl ReadDescriptorCommand {
    pub const LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u16(self.configuration_index)?;
        w.write_be_u16(0)?;
        self.descriptor.encode(w)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let configuration_index = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        Ok(Self {
            configuration_index,
            descriptor: DescriptorRef::decode(r)?,
        })
    }
}

/// READ_DESCRIPTOR response: the addressed descriptor's raw payload.
///
/// Descriptor models are outside this crate; `data` is the descriptor body
/// exactly as it appeared on the wire, starting right after the leading
/// descriptor_type/descriptor_index pair that every descriptor repeats.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDescriptorResponse {
    pub configuration_index: ConfigurationIndex,
    pub descriptor: DescriptorRef,
    pub data: alloc::vec::Vec<u8>,
}

#[cfg(feature = "alloc")]
impl ReadDescriptorResponse {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u16(self.configuration_index)?;
        w.write_be_u16(0)?;
        self.descriptor.encode(w)?;
        w.write_all(&self.data)
    }

    /// Decodes from a payload slice; everything after the descriptor header
    /// is the descriptor body.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let configuration_index = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        let descriptor = DescriptorRef::decode(r)?;
        let data = r.read_exact(r.remaining())?.to_vec();
        Ok(Self {
            configuration_index,
            descriptor,
            data,
        })
    }
}
