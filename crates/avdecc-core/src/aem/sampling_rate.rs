use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};

/// SET_SAMPLING_RATE command/response and GET_SAMPLING_RATE response body.
/// The rate is the packed pull/base-frequency word, opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingRatePayload {
    pub descriptor: DescriptorRef,
    pub sampling_rate: u32,
}

impl SamplingRatePayload {
    pub const LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u32(self.sampling_rate)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            descriptor: DescriptorRef::decode(r)?,
            sampling_rate: r.read_be_u32()?,
        })
    }
}
