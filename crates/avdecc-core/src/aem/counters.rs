use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};

/// Number of counter slots in a GET_COUNTERS response block.
pub const COUNTER_SLOTS: usize = 32;

/// GET_COUNTERS response body. Which slots are meaningful depends on the
/// descriptor type; `counters_valid` has one bit per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersPayload {
    pub descriptor: DescriptorRef,
    pub counters_valid: u32,
    pub counters: [u32; COUNTER_SLOTS],
}

impl CountersPayload {
    pub const LEN: usize = DescriptorRef::LEN + 4 + COUNTER_SLOTS * 4;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u32(self.counters_valid)?;
        for counter in &self.counters {
            w.write_be_u32(*counter)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let counters_valid = r.read_be_u32()?;
        let mut counters = [0u32; COUNTER_SLOTS];
        for counter in &mut counters {
            *counter = r.read_be_u32()?;
        }
        Ok(Self {
            descriptor,
            counters_valid,
            counters,
        })
    }
}
