use avdecc_core::adpdu::Adpdu;
use avdecc_core::ethernet::MacAddress;
use avdecc_core::types::{
    ControllerCapabilities, EntityCapabilities, ListenerCapabilities, TalkerCapabilities,
    UniqueIdentifier,
};
use tokio::time::Instant;

/// A remote entity known through ADP advertisement.
///
/// Callers always receive value copies; the engine owns the live table.
#[derive(Debug, Clone)]
pub struct DiscoveredEntity {
    pub entity_id: UniqueIdentifier,
    pub entity_model_id: UniqueIdentifier,
    pub entity_capabilities: EntityCapabilities,
    pub talker_stream_sources: u16,
    pub talker_capabilities: TalkerCapabilities,
    pub listener_stream_sinks: u16,
    pub listener_capabilities: ListenerCapabilities,
    pub controller_capabilities: ControllerCapabilities,
    pub available_index: u32,
    pub gptp_grandmaster_id: UniqueIdentifier,
    pub gptp_domain_number: u8,
    pub identify_control_index: u16,
    pub interface_index: u16,
    pub association_id: UniqueIdentifier,
    /// Source MAC of the last advertisement; unicast commands go here.
    pub mac: MacAddress,
    /// The entity is considered gone once this deadline passes without a
    /// refresh (twice the advertised valid time).
    pub valid_until: Instant,
}

impl DiscoveredEntity {
    pub(crate) fn from_advertisement(adp: &Adpdu, mac: MacAddress, now: Instant) -> Self {
        Self {
            entity_id: adp.entity_id,
            entity_model_id: adp.entity_model_id,
            entity_capabilities: adp.entity_capabilities,
            talker_stream_sources: adp.talker_stream_sources,
            talker_capabilities: adp.talker_capabilities,
            listener_stream_sinks: adp.listener_stream_sinks,
            listener_capabilities: adp.listener_capabilities,
            controller_capabilities: adp.controller_capabilities,
            available_index: adp.available_index,
            gptp_grandmaster_id: adp.gptp_grandmaster_id,
            gptp_domain_number: adp.gptp_domain_number,
            identify_control_index: adp.identify_control_index,
            interface_index: adp.interface_index,
            association_id: adp.association_id,
            mac,
            valid_until: now + entity_timeout(adp.valid_time_seconds),
        }
    }

    /// True when the advertisement changes anything a caller can observe,
    /// `available_index` and the refresh deadline excepted.
    pub(crate) fn advertised_fields_differ(&self, adp: &Adpdu, mac: MacAddress) -> bool {
        self.entity_model_id != adp.entity_model_id
            || self.entity_capabilities != adp.entity_capabilities
            || self.talker_stream_sources != adp.talker_stream_sources
            || self.talker_capabilities != adp.talker_capabilities
            || self.listener_stream_sinks != adp.listener_stream_sinks
            || self.listener_capabilities != adp.listener_capabilities
            || self.controller_capabilities != adp.controller_capabilities
            || self.gptp_grandmaster_id != adp.gptp_grandmaster_id
            || self.gptp_domain_number != adp.gptp_domain_number
            || self.identify_control_index != adp.identify_control_index
            || self.interface_index != adp.interface_index
            || self.association_id != adp.association_id
            || self.mac != mac
    }
}

/// An entity timed out after missing two advertisement periods.
pub(crate) fn entity_timeout(valid_time_seconds: u8) -> tokio::time::Duration {
    tokio::time::Duration::from_secs(u64::from(valid_time_seconds) * 2)
}

/// The identity this controller advertises and stamps into every command.
#[derive(Debug, Clone)]
pub struct LocalEntity {
    pub entity_id: UniqueIdentifier,
    pub entity_model_id: UniqueIdentifier,
    pub entity_capabilities: EntityCapabilities,
    pub talker_stream_sources: u16,
    pub talker_capabilities: TalkerCapabilities,
    pub listener_stream_sinks: u16,
    pub listener_capabilities: ListenerCapabilities,
    pub controller_capabilities: ControllerCapabilities,
    pub identify_control_index: u16,
    pub association_id: UniqueIdentifier,
    pub gptp_grandmaster_id: UniqueIdentifier,
    pub gptp_domain_number: u8,
}

impl LocalEntity {
    /// A pure controller entity: no streams, controller capability set.
    pub fn controller(entity_id: UniqueIdentifier, entity_model_id: UniqueIdentifier) -> Self {
        Self {
            entity_id,
            entity_model_id,
            entity_capabilities: EntityCapabilities::NONE,
            talker_stream_sources: 0,
            talker_capabilities: TalkerCapabilities::NONE,
            listener_stream_sinks: 0,
            listener_capabilities: ListenerCapabilities::NONE,
            controller_capabilities: ControllerCapabilities::IMPLEMENTED,
            identify_control_index: 0,
            association_id: UniqueIdentifier::UNINITIALIZED,
            gptp_grandmaster_id: UniqueIdentifier::UNINITIALIZED,
            gptp_domain_number: 0,
        }
    }
}
