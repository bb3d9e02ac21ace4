use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::types::{AvdeccString, ConfigurationIndex};
use crate::{DecodeError, EncodeError};

/// SET_NAME command/response and GET_NAME response body. `name_index` selects
/// among a descriptor's name fields (entities have two: name and group name).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamePayload {
    pub descriptor: DescriptorRef,
    pub name_index: u16,
    pub configuration_index: ConfigurationIndex,
    pub name: AvdeccString,
}

impl NamePayload {
    pub const LEN: usize = 8 + AvdeccString::LEN;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u16(self.name_index)?;
        w.write_be_u16(self.configuration_index)?;
        w.write_all(self.name.raw())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let descriptor = DescriptorRef::decode(r)?;
        let name_index = r.read_be_u16()?;
        let configuration_index = r.read_be_u16()?;
        let mut raw = [0u8; AvdeccString::LEN];
        raw.copy_from_slice(r.read_exact(AvdeccString::LEN)?);
        Ok(Self {
            descriptor,
            name_index,
            configuration_index,
            name: AvdeccString::from_raw(raw),
        })
    }
}

/// GET_NAME command body: the name payload without the name itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetNameCommand {
    pub descriptor: DescriptorRef,
    pub name_index: u16,
    pub configuration_index: ConfigurationIndex,
}

impl GetNameCommand {
    pub const LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.descriptor.encode(w)?;
        w.write_be_u16(self.name_index)?;
        w.write_be_u16(self.configuration_index)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            descriptor: DescriptorRef::decode(r)?,
            name_index: r.read_be_u16()?,
            configuration_index: r.read_be_u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::NamePayload;
    use crate::aem::DescriptorRef;
    use crate::encoding::{Reader, Writer};
    use crate::types::{AvdeccString, DescriptorType};

    #[test]
    fn short_names_are_nul_padded_on_the_wire() {
        let payload = NamePayload {
            descriptor: DescriptorRef::new(DescriptorType::Entity, 0),
            name_index: 0,
            configuration_index: 0,
            name: AvdeccString::from_str_lossy("Stage box"),
        };
        let mut buf = [0u8; NamePayload::LEN];
        let mut w = Writer::new(&mut buf);
        payload.encode(&mut w).unwrap();
        assert_eq!(w.as_written().len(), NamePayload::LEN);
        assert_eq!(&buf[8..17], b"Stage box");
        assert!(buf[17..].iter().all(|&b| b == 0));

        let mut r = Reader::new(&buf);
        let decoded = NamePayload::decode(&mut r).unwrap();
        assert_eq!(decoded.name.as_str(), Some("Stage box"));
    }
}
