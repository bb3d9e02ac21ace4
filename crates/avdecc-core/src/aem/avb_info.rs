#![cfg(feature = "alloc")]

use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::types::UniqueIdentifier;
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

pub const AVB_INFO_FLAG_AS_CAPABLE: u8 = 0x01;
pub const AVB_INFO_FLAG_GPTP_ENABLED: u8 = 0x02;
pub const AVB_INFO_FLAG_SRP_ENABLED: u8 = 0x04;

/// One SR-class mapping advertised by an AVB interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MsrpMapping {
    pub traffic_class: u8,
    pub priority: u8,
    pub vlan_id: u16,
}

/// GET_AVB_INFO response body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AvbInfoPayload {
    pub descriptor: DescriptorRef,
    pub gptp_grandmaster_id: UniqueIdentifier,
    pub propagation_delay: u32,
    pub gptp_domain_number: u8,
    pub flags: u8,
    pub msrp_mappings: Vec<MsrpMapping>,
}

impl AvbInfoPayload {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.msrp_mappings.len() > usize::from(u16::MAX) {
            return Err(EncodeError::ValueOutOfRange);
        }
        self.descriptor.encode(w)?;
        w.write_be_u64(self.gptp_grandmaster_id.raw())?;
        w.write_be_u32(self.propagation_delay)?;
        w.write_u8(self.gptp_domain_number)?;
        w.write_u8(self.flags)?;
        w.write_be_u16(self.msrp_mappings.len() as u16)?;
        for mapping in &self.msrp_mappings {
            w.write_u8(mapping.traffic_class)?;
            w.write_u8(mapping.priority)?;
            w.write_be_u16(mapping.vlan_id)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let gptp_grandmaster_id = UniqueIdentifier::new(r.read_be_u64()?);
        let propagation_delay = r.read_be_u32()?;
        let gptp_domain_number = r.read_u8()?;
        let flags = r.read_u8()?;
        let count = r.read_be_u16()?;
        let mut msrp_mappings = Vec::with_capacity(count.min(8) as usize);
        for _ in 0..count {
            msrp_mappings.push(MsrpMapping {
                traffic_class: r.read_u8()?,
                priority: r.read_u8()?,
                vlan_id: r.read_be_u16()?,
            });
        }
        Ok(Self {
            descriptor,
            gptp_grandmaster_id,
            propagation_delay,
            gptp_domain_number,
            flags,
            msrp_mappings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AvbInfoPayload, MsrpMapping, AVB_INFO_FLAG_AS_CAPABLE};
    use crate::aem::DescriptorRef;
    use crate::encoding::{Reader, Writer};
    use crate::types::{DescriptorType, UniqueIdentifier};

    #[test]
    fn mappings_round_trip() {
        let payload = AvbInfoPayload {
            descriptor: DescriptorRef::new(DescriptorType::AvbInterface, 0),
            gptp_grandmaster_id: UniqueIdentifier::new(0x0011_2233_4455_0000),
            propagation_delay: 350,
            gptp_domain_number: 0,
            flags: AVB_INFO_FLAG_AS_CAPABLE,
            msrp_mappings: alloc::vec![
                MsrpMapping {
                    traffic_class: 0,
                    priority: 3,
                    vlan_id: 2,
                },
                MsrpMapping {
                    traffic_class: 1,
                    priority: 2,
                    vlan_id: 2,
                },
            ],
        };
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        payload.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        assert_eq!(AvbInfoPayload::decode(&mut r).unwrap(), payload);
    }
}
