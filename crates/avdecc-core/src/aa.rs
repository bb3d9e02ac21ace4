//! Address Access (AECP AA) TLV encoding and decoding.
//!
//! The AA payload is a count followed by TLVs, each addressing a 64-bit
//! location in the target's address space: a 4-bit mode, a 12-bit length,
//! the address, then `length` octets of data (present on write commands and
//! on read responses).

#![cfg(feature = "alloc")]

use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

const MAX_TLV_DATA_LEN: usize = 0x0FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AaMode {
    Read,
    Write,
    Execute,
    Unknown(u8),
}

impl AaMode {
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::Execute => 2,
            Self::Unknown(raw) => raw,
        }
    }

    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Read,
            1 => Self::Write,
            2 => Self::Execute,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AaTlv {
    pub mode: AaMode,
    pub address: u64,
    pub data: Vec<u8>,
}

impl AaTlv {
    pub fn read(address: u64, length: usize) -> Self {
        // A read command carries a zeroed data area sized for the response.
        Self {
            mode: AaMode::Read,
            address,
            data: alloc::vec![0; length],
        }
    }

    pub fn write(address: u64, data: Vec<u8>) -> Self {
        Self {
            mode: AaMode::Write,
            address,
            data,
        }
    }
}

pub fn encode_tlvs(w: &mut Writer<'_>, tlvs: &[AaTlv]) -> Result<(), EncodeError> {
    if tlvs.len() > usize::from(u16::MAX) {
        return Err(EncodeError::ValueOutOfRange);
    }
    w.write_be_u16(tlvs.len() as u16)?;
    for tlv in tlvs {
        if tlv.data.len() > MAX_TLV_DATA_LEN {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_be_u16((((tlv.mode.to_u8() & 0x0F) as u16) << 12) | tlv.data.len() as u16)?;
        w.write_be_u64(tlv.address)?;
        w.write_all(&tlv.data)?;
    }
    Ok(())
}

pub fn decode_tlvs(r: &mut Reader<'_>) -> Result<Vec<AaTlv>, DecodeError> {
    let count = r.read_be_u16()?;
    let mut tlvs = Vec::with_capacity(count.min(64) as usize);
    for _ in 0..count {
        let word = r.read_be_u16()?;
        let mode = AaMode::from_u8((word >> 12) as u8);
        let length = (word & 0x0FFF) as usize;
        let address = r.read_be_u64()?;
        let data = r.read_exact(length)?.to_vec();
        tlvs.push(AaTlv {
            mode,
            address,
            data,
        });
    }
    Ok(tlvs)
}

#[cfg(test)]
mod tests {
    use super::{decode_tlvs, encode_tlvs, AaMode, AaTlv};
    use crate::encoding::{Reader, Writer};
    use crate::DecodeError;

    #[test]
    fn tlvs_round_trip() {
        let tlvs = [
            AaTlv::read(0x0000_0000_0010_0000, 4),
            AaTlv::write(0x0000_0000_0010_0004, alloc::vec![1, 2, 3]),
        ];
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        encode_tlvs(&mut w, &tlvs).unwrap();

        let mut r = Reader::new(w.as_written());
        let decoded = decode_tlvs(&mut r).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].mode, AaMode::Read);
        assert_eq!(decoded[0].data.len(), 4);
        assert_eq!(decoded[1], tlvs[1]);
    }

    #[test]
    fn truncated_tlv_fails() {
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        encode_tlvs(&mut w, &[AaTlv::write(0, alloc::vec![9; 4])]).unwrap();
        let written = w.as_written().len();

        let mut r = Reader::new(&buf[..written - 2]);
        assert_eq!(decode_tlvs(&mut r).unwrap_err(), DecodeError::UnexpectedEof);
    }
}
