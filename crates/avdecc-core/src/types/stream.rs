use crate::types::{StreamIndex, UniqueIdentifier};
use core::fmt;

/// Identifies one stream endpoint: an entity plus the index of one of its
/// stream input or output descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamIdentification {
    pub entity_id: UniqueIdentifier,
    pub stream_index: StreamIndex,
}

impl StreamIdentification {
    pub const fn new(entity_id: UniqueIdentifier, stream_index: StreamIndex) -> Self {
        Self {
            entity_id,
            stream_index,
        }
    }
}

impl fmt::Display for StreamIdentification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_id, self.stream_index)
    }
}
