use crate::aem::DescriptorRef;
use crate::encoding::{Reader, Writer};
use crate::types::{DescriptorType, UniqueIdentifier};
use crate::{DecodeError, EncodeError};

/// Release a held lock instead of taking it.
pub const LOCK_FLAG_UNLOCK: u32 = 0x0000_0001;

/// LOCK_ENTITY command and response layout; the response fills
/// `locked_entity_id` with the lock holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEntityPayload {
    pub flags: u32,
    pub locked_entity_id: UniqueIdentifier,
    pub descriptor: DescriptorRef,
}

impl LockEntityPayload {
    pub const LEN: usize = 16;

    pub fn lock() -> Self {
        Self {
            flags: 0,
            locked_entity_id: UniqueIdentifier::NULL,
            descriptor: DescriptorRef::new(DescriptorType::Entity, 0),
        }
    }

    pub fn unlock() -> Self {
        Self {
            flags: LOCK_FLAG_UNLOCK,
            ..Self::lock()
        }
    }

    pub const fn is_unlock(&self) -> bool {
        self.flags & LOCK_FLAG_UNLOCK != 0
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_be_u32(self.flags)?;
        w.write_be_u64(self.locked_entity_id.raw())?;
        self.descriptor.encode(w)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            flags: r.read_be_u32()?,
            locked_entity_id: UniqueIdentifier::new(r.read_be_u64()?),
            descriptor: DescriptorRef::decode(r)?,
        })
    }
}
