use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::ethernet::MacAddress;
use crate::types::UniqueIdentifier;
use crate::{DecodeError, EncodeError};

/// Validity flags within [`StreamInfo::flags`].
pub const STREAM_INFO_STREAM_FORMAT_VALID: u32 = 0x0000_0008;
pub const STREAM_INFO_STREAM_ID_VALID: u32 = 0x0000_0010;
pub const STREAM_INFO_MSRP_ACC_LAT_VALID: u32 = 0x0000_0020;
pub const STREAM_INFO_STREAM_DEST_MAC_VALID: u32 = 0x0000_0040;
pub const STREAM_INFO_STREAM_VLAN_ID_VALID: u32 = 0x0000_0200;

/// The dynamic stream state block carried by SET_STREAM_INFO and
/// GET_STREAM_INFO. Fields are only meaningful when the matching validity
/// bit in `flags` is set; all of them round-trip regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamInfo {
    pub flags: u32,
    pub stream_format: u64,
    pub stream_id: UniqueIdentifier,
    pub msrp_accumulated_latency: u32,
    pub stream_dest_mac: MacAddress,
    pub msrp_failure_code: u8,
    pub reserved0: u8,
    pub msrp_failure_bridge_id: u64,
    pub stream_vlan_id: u16,
    pub reserved1: u16,
}

impl StreamInfo {
    pub const LEN: usize = 44;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u32(self.flags)?;
        w.write_be_u64(self.stream_format)?;
        w.write_be_u64(self.stream_id.raw())?;
        w.write_be_u32(self.msrp_accumulated_latency)?;
        w.write_all(&self.stream_dest_mac.0)?;
        w.write_u8(self.msrp_failure_code)?;
        w.write_u8(self.reserved0)?;
        w.write_be_u64(self.msrp_failure_bridge_id)?;
        w.write_be_u16(self.stream_vlan_id)?;
        w.write_be_u16(self.reserved1)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            flags: r.read_be_u32()?,
            stream_format: r.read_be_u64()?,
            stream_id: UniqueIdentifier::new(r.read_be_u64()?),
            msrp_accumulated_latency: r.read_be_u32()?,
            stream_dest_mac: MacAddress(r.read_sextet()?),
            msrp_failure_code: r.read_u8()?,
            reserved0: r.read_u8()?,
            msrp_failure_bridge_id: r.read_be_u64()?,
            stream_vlan_id: r.read_be_u16()?,
            reserved1: r.read_be_u16()?,
        })
    }
}

/// SET_STREAM_INFO command/response and GET_STREAM_INFO response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfoPayload {
    pub descriptor: DescriptorRef,
    pub info: StreamInfo,
}

impl StreamInfoPayload {
    pub const LEN: usize = DescriptorRef::LEN + StreamInfo::LEN;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        self.info.encode(w)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            descriptor: DescriptorRef::decode(r)?,
            info: StreamInfo::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{StreamInfo, StreamInfoPayload, STREAM_INFO_STREAM_DEST_MAC_VALID};
    use crate::aem::DescriptorRef;
    use crate::encoding::{Reader, Writer};
    use crate::ethernet::MacAddress;
    use crate::types::{DescriptorType, UniqueIdentifier};

    #[test]
    fn dest_mac_is_preserved_byte_for_byte() {
        let payload = StreamInfoPayload {
            descriptor: DescriptorRef::new(DescriptorType::StreamOutput, 1),
            info: StreamInfo {
                flags: STREAM_INFO_STREAM_DEST_MAC_VALID,
                stream_format: 0x00A0_0204_6000_0800,
                stream_id: UniqueIdentifier::new(0x0011_2233_4455_0001),
                msrp_accumulated_latency: 125_000,
                stream_dest_mac: MacAddress([0x91, 0xE0, 0xF0, 0x00, 0xAB, 0xCD]),
                msrp_failure_code: 0,
                reserved0: 0,
                msrp_failure_bridge_id: 0,
                stream_vlan_id: 2,
                reserved1: 0,
            },
        };
        let mut buf = [0u8; StreamInfoPayload::LEN];
        let mut w = Writer::new(&mut buf);
        payload.encode(&mut w).unwrap();
        assert_eq!(w.as_written().len(), StreamInfoPayload::LEN);

        let mut r = Reader::new(&buf);
        let decoded = StreamInfoPayload::decode(&mut r).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(
            decoded.info.stream_dest_mac.raw(),
            [0x91, 0xE0, 0xF0, 0x00, 0xAB, 0xCD]
        );
    }
}
