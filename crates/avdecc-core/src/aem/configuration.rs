use crate::encoding::{Reader, Writer};
use crate::types::ConfigurationIndex;
use crate::{DecodeError, EncodeError};

/// SET_CONFIGURATION command/response and GET_CONFIGURATION response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationPayload {
    pub configuration_index: ConfigurationIndex,
}

impl ConfigurationPayload {
    pub const LEN: usize = 4;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u16(0)?;
        w.write_be_u16(self.configuration_index)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let _reserved = r.read_be_u16()?;
        Ok(Self {
            configuration_index: r.read_be_u16()?,
        })
    }
}
