use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::types::UniqueIdentifier;
use crate::{DecodeError, EncodeError};

/// Request persistent ownership, surviving controller restarts.
pub const ACQUIRE_FLAG_PERSISTENT: u32 = 0x0000_0001;
/// Release a previously acquired entity instead of acquiring it.
pub const ACQUIRE_FLAG_RELEASE: u32 = 0x8000_0000;

/// ACQUIRE_ENTITY command and response share one layout; the response fills
/// `owner_entity_id` with the current owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireEntityPayload {
    pub flags: u32,
    pub owner_entity_id: UniqueIdentifier,
    pub descriptor: DescriptorRef,
}

impl AcquireEntityPayload {
    pub const LEN: usize = 16;

    pub fn acquire(persistent: bool, descriptor: DescriptorRef) -> Self {
        Self {
            flags: if persistent { ACQUIRE_FLAG_PERSISTENT } else { 0 },
            owner_entity_id: UniqueIdentifier::NULL,
            descriptor,
        }
    }

    pub fn release(descriptor: DescriptorRef) -> Self {
        Self {
            flags: ACQUIRE_FLAG_RELEASE,
            owner_entity_id: UniqueIdentifier::NULL,
            descriptor,
        }
    }

    pub const fn is_release(&self) -> bool {
        self.flags & ACQUIRE_FLAG_RELEASE != 0
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u32(self.flags)?;
        w.write_be_u64(self.owner_entity_id.raw())?;
        self.descriptor.encode(w)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            flags: r.read_be_u32()?,
            owner_entity_id: UniqueIdentifier::new(r.read_be_u64()?),
            descriptor: DescriptorRef::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AcquireEntityPayload, ACQUIRE_FLAG_PERSISTENT, ACQUIRE_FLAG_RELEASE};
    use crate::aem::DescriptorRef;
    use crate::encoding::{Reader, Writer};
    use crate::types::DescriptorType;

    #[test]
    fn acquire_and_release_flags() {
        let entity = DescriptorRef::new(DescriptorType::Entity, 0);
        assert_eq!(
            AcquireEntityPayload::acquire(true, entity).flags,
            ACQUIRE_FLAG_PERSISTENT
        );
        assert_eq!(
            AcquireEntityPayload::acquire(false, entity).flags,
            0
        );
        assert!(AcquireEntityPayload::release(entity).is_release());
        assert_eq!(AcquireEntityPayload::release(entity).flags, ACQUIRE_FLAG_RELEASE);
    }

    #[test]
    fn payload_round_trips() {
        let payload = AcquireEntityPayload::acquire(
            false,
            DescriptorRef::new(DescriptorType::Entity, 0),
        );
        let mut buf = [0u8; AcquireEntityPayload::LEN];
        let mut w = Writer::new(&mut buf);
        payload.encode(&mut w).unwrap();
        assert_eq!(w.as_written().len(), AcquireEntityPayload::LEN);

        let mut r = Reader::new(&buf);
        assert_eq!(AcquireEntityPayload::decode(&mut r).unwrap(), payload);
    }
}
