//! AEM command and response payload codecs.
//!
//! One module per command family, each defining the payload structs with
//! `encode`/`decode` over the shared [`Reader`]/[`Writer`] cursors. The
//! payloads here are the bytes following the AEM envelope (unsolicited bit +
//! command type); the envelope and AECP header live in [`crate::aecpdu`].

use crate::encoding::{Reader, Writer};
use crate::types::{DescriptorIndex, DescriptorType};
use crate::{DecodeError, EncodeError};

pub mod acquire_entity;
pub mod audio_map;
pub mod avb_info;
pub mod clock_source;
pub mod configuration;
pub mod counters;
pub mod lock_entity;
pub mod name;
pub mod operation;
pub mod read_descriptor;
pub mod sampling_rate;
pub mod stream_format;
pub mod stream_info;

/// The `descriptor_type` + `descriptor_index` pair that addresses most AEM
/// commands. Also the full payload of GET_STREAM_FORMAT, GET_STREAM_INFO,
/// GET_AVB_INFO, GET_COUNTERS, START_STREAMING and STOP_STREAMING commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorRef {
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
}

impl DescriptorRef {
    pub const LEN: usize = 4;

    pub const fn new(descriptor_type: DescriptorType, descriptor_index: DescriptorIndex) -> Self {
        Self {
            descriptor_type,
            descriptor_index,
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u16(self.descriptor_type.to_u16())?;
        w.write_be_u16(self.descriptor_index)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            descriptor_type: DescriptorType::from_u16(r.read_be_u16()?),
            descriptor_index: r.read_be_u16()?,
        })
    }
}
