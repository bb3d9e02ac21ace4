mod descriptor;
mod eui64;
mod flags;
mod stream;
mod string;

pub use descriptor::{ConfigurationIndex, DescriptorIndex, DescriptorType, StreamIndex};
pub use eui64::UniqueIdentifier;
pub use flags::{
    ConnectionFlags, ControllerCapabilities, EntityCapabilities, ListenerCapabilities,
    TalkerCapabilities,
};
pub use stream::StreamIdentification;
pub use string::AvdeccString;
