/// Index of a descriptor within its type, as carried on the wire.
pub type DescriptorIndex = u16;
/// Index of a configuration descriptor.
pub type ConfigurationIndex = u16;
/// Index of a stream input or output descriptor.
pub type StreamIndex = u16;

/// AEM descriptor types (IEEE 1722.1 table 7.1).
///
/// Descriptor payloads themselves are opaque to this crate; the type is
/// needed for READ_DESCRIPTOR addressing and acquire/lock scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorType {
    Entity,
    Configuration,
    AudioUnit,
    VideoUnit,
    SensorUnit,
    StreamInput,
    StreamOutput,
    JackInput,
    JackOutput,
    AvbInterface,
    ClockSource,
    MemoryObject,
    Locale,
    Strings,
    StreamPortInput,
    StreamPortOutput,
    ExternalPortInput,
    ExternalPortOutput,
    InternalPortInput,
    InternalPortOutput,
    AudioCluster,
    VideoCluster,
    SensorCluster,
    AudioMap,
    VideoMap,
    SensorMap,
    Control,
    SignalSelector,
    Mixer,
    Matrix,
    MatrixSignal,
    SignalSplitter,
    SignalCombiner,
    SignalDemultiplexer,
    SignalMultiplexer,
    SignalTranscoder,
    ClockDomain,
    Other(u16),
}

impl DescriptorType {
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::Entity => 0x0000,
            Self::Configuration => 0x0001,
            Self::AudioUnit => 0x0002,
            Self::VideoUnit => 0x0003,
            Self::SensorUnit => 0x0004,
            Self::StreamInput => 0x0005,
            Self::StreamOutput => 0x0006,
            Self::JackInput => 0x0007,
            Self::JackOutput => 0x0008,
            Self::AvbInterface => 0x0009,
            Self::ClockSource => 0x000A,
            Self::MemoryObject => 0x000B,
            Self::Locale => 0x000C,
            Self::Strings => 0x000D,
            Self::StreamPortInput => 0x000E,
            Self::StreamPortOutput => 0x000F,
            Self::ExternalPortInput => 0x0010,
            Self::ExternalPortOutput => 0x0011,
            Self::InternalPortInput => 0x0012,
            Self::InternalPortOutput => 0x0013,
            Self::AudioCluster => 0x0014,
            Self::VideoCluster => 0x0015,
            Self::SensorCluster => 0x0016,
            Self::AudioMap => 0x0017,
            Self::VideoMap => 0x0018,
            Self::SensorMap => 0x0019,
            Self::Control => 0x001A,
            Self::SignalSelector => 0x001B,
            Self::Mixer => 0x001C,
            Self::Matrix => 0x001D,
            Self::MatrixSignal => 0x001E,
            Self::SignalSplitter => 0x001F,
            Self::SignalCombiner => 0x0020,
            Self::SignalDemultiplexer => 0x0021,
            Self::SignalMultiplexer => 0x0022,
            Self::SignalTranscoder => 0x0023,
            Self::ClockDomain => 0x0024,
            Self::Other(raw) => raw,
        }
    }

    pub const fn from_u16(raw: u16) -> Self {
        match raw {
            0x0000 => Self::Entity,
            0x0001 => Self::Configuration,
            0x0002 => Self::AudioUnit,
            0x0003 => Self::VideoUnit,
            0x0004 => Self::SensorUnit,
            0x0005 => Self::StreamInput,
            0x0006 => Self::StreamOutput,
            0x0007 => Self::JackInput,
            0x0008 => Self::JackOutput,
            0x0009 => Self::AvbInterface,
            0x000A => Self::ClockSource,
            0x000B => Self::MemoryObject,
            0x000C => Self::Locale,
            0x000D => Self::Strings,
            0x000E => Self::StreamPortInput,
            0x000F => Self::StreamPortOutput,
            0x0010 => Self::ExternalPortInput,
            0x0011 => Self::ExternalPortOutput,
            0x0012 => Self::InternalPortInput,
            0x0013 => Self::InternalPortOutput,
            0x0014 => Self::AudioCluster,
            0x0015 => Self::VideoCluster,
            0x0016 => Self::SensorCluster,
            0x0017 => Self::AudioMap,
            0x0018 => Self::VideoMap,
            0x0019 => Self::SensorMap,
            0x001A => Self::Control,
            0x001B => Self::SignalSelector,
            0x001C => Self::Mixer,
            0x001D => Self::Matrix,
            0x001E => Self::MatrixSignal,
            0x001F => Self::SignalSplitter,
            0x0020 => Self::SignalCombiner,
            0x0021 => Self::SignalDemultiplexer,
            0x0022 => Self::SignalMultiplexer,
            0x0023 => Self::SignalTranscoder,
            0x0024 => Self::ClockDomain,
            other => Self::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DescriptorType;

    #[test]
    fn round_trips_known_and_unknown() {
        for raw in 0u16..0x30 {
            assert_eq!(DescriptorType::from_u16(raw).to_u16(), raw);
        }
        assert_eq!(DescriptorType::from_u16(0x7FFF), DescriptorType::Other(0x7FFF));
    }
}
