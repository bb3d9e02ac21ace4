//! Capability and flag words carried by ADPDUs and ACMPDUs.
//!
//! These are kept as raw wire words wrapped in newtypes: the engine never
//! interprets most bits, it only passes them through to callers, so a full
//! bitflags mirror would add surface without adding meaning. Named constants
//! cover the bits the controller itself consults.

macro_rules! flag_word {
    ($(#[$doc:meta])* $name:ident, $repr:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $repr);

        impl $name {
            pub const NONE: Self = Self(0);

            pub const fn raw(self) -> $repr {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn with(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }
        }
    };
}

flag_word!(
    /// ADP `entity_capabilities` (32 bits).
    EntityCapabilities,
    u32
);

impl EntityCapabilities {
    pub const EFU_MODE: Self = Self(0x0000_0001);
    pub const ADDRESS_ACCESS_SUPPORTED: Self = Self(0x0000_0002);
    pub const GPTP_SUPPORTED: Self = Self(0x0000_0004);
    pub const AEM_SUPPORTED: Self = Self(0x0000_0008);
    pub const LEGACY_AVC: Self = Self(0x0000_0010);
    pub const ASSOCIATION_ID_SUPPORTED: Self = Self(0x0000_0020);
    pub const ASSOCIATION_ID_VALID: Self = Self(0x0000_0040);
    pub const VENDOR_UNIQUE_SUPPORTED: Self = Self(0x0000_0080);
    pub const CLASS_A_SUPPORTED: Self = Self(0x0000_0100);
    pub const CLASS_B_SUPPORTED: Self = Self(0x0000_0200);
    pub const GPTP_GRANDMASTER_SUPPORTED: Self = Self(0x0000_0400);
    pub const AEM_AUTHENTICATION_SUPPORTED: Self = Self(0x0000_0800);
    pub const AEM_AUTHENTICATION_REQUIRED: Self = Self(0x0000_1000);
    pub const AEM_PERSISTENT_ACQUIRE_SUPPORTED: Self = Self(0x0000_2000);
    pub const AEM_IDENTIFY_CONTROL_INDEX_VALID: Self = Self(0x0000_4000);
    pub const AEM_INTERFACE_INDEX_VALID: Self = Self(0x0000_8000);
    pub const GENERAL_CONTROLLER_IGNORE: Self = Self(0x0001_0000);
    pub const ENTITY_NOT_READY: Self = Self(0x0002_0000);
}

flag_word!(
    /// ADP `talker_capabilities` (16 bits).
    TalkerCapabilities,
    u16
);

impl TalkerCapabilities {
    pub const IMPLEMENTED: Self = Self(0x0001);
    pub const OTHER_SOURCE: Self = Self(0x0200);
    pub const CONTROL_SOURCE: Self = Self(0x0400);
    pub const MEDIA_CLOCK_SOURCE: Self = Self(0x0800);
    pub const SMPTE_SOURCE: Self = Self(0x1000);
    pub const MIDI_SOURCE: Self = Self(0x2000);
    pub const AUDIO_SOURCE: Self = Self(0x4000);
    pub const VIDEO_SOURCE: Self = Self(0x8000);
}

flag_word!(
    /// ADP `listener_capabilities` (16 bits).
    ListenerCapabilities,
    u16
);

impl ListenerCapabilities {
    pub const IMPLEMENTED: Self = Self(0x0001);
    pub const OTHER_SINK: Self = Self(0x0200);
    pub const CONTROL_SINK: Self = Self(0x0400);
    pub const MEDIA_CLOCK_SINK: Self = Self(0x0800);
    pub const SMPTE_SINK: Self = Self(0x1000);
    pub const MIDI_SINK: Self = Self(0x2000);
    pub const AUDIO_SINK: Self = Self(0x4000);
    pub const VIDEO_SINK: Self = Self(0x8000);
}

flag_word!(
    /// ADP `controller_capabilities` (32 bits).
    ControllerCapabilities,
    u32
);

impl ControllerCapabilities {
    pub const IMPLEMENTED: Self = Self(0x0000_0001);
}

flag_word!(
    /// ACMP `flags` (16 bits).
    ConnectionFlags,
    u16
);

impl ConnectionFlags {
    pub const CLASS_B: Self = Self(0x0001);
    pub const FAST_CONNECT: Self = Self(0x0002);
    pub const SAVED_STATE: Self = Self(0x0004);
    pub const STREAMING_WAIT: Self = Self(0x0008);
    pub const SUPPORTS_ENCRYPTED: Self = Self(0x0010);
    pub const ENCRYPTED_PDU: Self = Self(0x0020);
    pub const TALKER_FAILED: Self = Self(0x0040);
}
