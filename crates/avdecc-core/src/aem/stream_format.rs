use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};

/// SET_STREAM_FORMAT command/response and GET_STREAM_FORMAT response body.
/// The 64-bit stream format word is opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormatPayload {
    pub descriptor: DescriptorRef,
    pub stream_format: u64,
}

impl StreamFormatPayload {
    pub const LEN: usize = 12;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u64(self.stream_format)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            descriptor: DescriptorRef::decode(r)?,
            stream_format: r.read_be_u64()?,
        })
    }
}
