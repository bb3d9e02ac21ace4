#![cfg(feature = "alloc")]

use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

/// One channel mapping between a stream and an audio cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioMapping {
    pub stream_index: u16,
    pub stream_channel: u16,
    pub cluster_offset: u16,
    pub cluster_channel: u16,
}

impl AudioMapping {
    const LEN: usize = 8;

    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u16(self.stream_index)?;
        w.write_be_u16(self.stream_channel)?;
        w.write_be_u16(self.cluster_offset)?;
        w.write_be_u16(self.cluster_channel)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            stream_index: r.read_be_u16()?,
            stream_channel: r.read_be_u16()?,
            cluster_offset: r.read_be_u16()?,
            cluster_channel: r.read_be_u16()?,
        })
    }
}

/// GET_AUDIO_MAP command body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetAudioMapCommand {
    pub descriptor: DescriptorRef,
    pub map_index: u16,
}

impl GetAudioMapCommand {
    pub const LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u16(self.map_index)?;
        w.write_be_u16(0)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let map_index = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        Ok(Self {
            descriptor,
            map_index,
        })
    }
}

/// GET_AUDIO_MAP response body. Large maps are windowed: `number_of_maps`
/// tells the caller how many windows exist, `map_index` which one this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAudioMapResponse {
    pub descriptor: DescriptorRef,
    pub map_index: u16,
    pub number_of_maps: u16,
    pub mappings: Vec<AudioMapping>,
}

impl GetAudioMapResponse {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.mappings.len() > usize::from(u16::MAX) {
            return Err(EncodeError::ValueOutOfRange);
        }
        self.descriptor.encode(w)?;
        w.write_be_u16(self.map_index)?;
        w.write_be_u16(self.number_of_maps)?;
        w.write_be_u16(self.mappings.len() as u16)?;
        w.write_be_u16(0)?;
        for mapping in &self.mappings {
            mapping.encode(w)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let map_index = r.read_be_u16()?;
        let number_of_maps = r.read_be_u16()?;
        let count = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        let mut mappings = Vec::with_capacity(count.min(64) as usize);
        for _ in 0..count {
            mappings.push(AudioMapping::decode(r)?);
        }
        Ok(Self {
            descriptor,
            map_index,
            number_of_maps,
            mappings,
        })
    }
}

/// ADD_AUDIO_MAPPINGS / REMOVE_AUDIO_MAPPINGS command and response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMappingsPayload {
    pub descriptor: DescriptorRef,
    pub mappings: Vec<AudioMapping>,
}

impl AudioMappingsPayload {
    /// The standard caps one command at 62 mappings so the PDU fits a frame.
    pub const MAX_MAPPINGS: usize = 62;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.mappings.len() > Self::MAX_MAPPINGS {
            return Err(EncodeError::ValueOutOfRange);
        }
        self.descriptor.encode(w)?;
        w.write_be_u16(self.mappings.len() as u16)?;
        w.write_be_u16(0)?;
        for mapping in &self.mappings {
            mapping.encode(w)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let count = r.read_be_u16()?;
        let _reserved = r.read_be_u16()?;
        let mut mappings = Vec::with_capacity(count.min(64) as usize);
        for _ in 0..count {
            mappings.push(AudioMapping::decode(r)?);
        }
        Ok(Self {
            descriptor,
            mappings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AudioMapping, AudioMappingsPayload, GetAudioMapResponse};
    use crate::aem::DescriptorRef;
    use crate::encoding::{Reader, Writer};
    use crate::types::DescriptorType;
    use crate::EncodeError;
    use alloc::vec::Vec;

    fn mapping(n: u16) -> AudioMapping {
        AudioMapping {
            stream_index: 0,
            stream_channel: n,
            cluster_offset: n,
            cluster_channel: 0,
        }
    }

    #[test]
    fn map_window_round_trips() {
        let response = GetAudioMapResponse {
            descriptor: DescriptorRef::new(DescriptorType::StreamPortInput, 0),
            map_index: 0,
            number_of_maps: 1,
            mappings: (0..8).map(mapping).collect(),
        };
        let mut buf = [0u8; 128];
        let mut w = Writer::new(&mut buf);
        response.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        assert_eq!(GetAudioMapResponse::decode(&mut r).unwrap(), response);
    }

    #[test]
    fn oversized_add_is_rejected() {
        let payload = AudioMappingsPayload {
            descriptor: DescriptorRef::new(DescriptorType::StreamPortInput, 0),
            mappings: (0..63).map(mapping).collect::<Vec<_>>(),
        };
        let mut buf = [0u8; 1024];
        let mut w = Writer::new(&mut buf);
        assert_eq!(
            payload.encode(&mut w).unwrap_err(),
            EncodeError::ValueOutOfRange
        );
    }
}
