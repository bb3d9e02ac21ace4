//! Observer events.
//!
//! The engine never calls back into application code directly: observers
//! subscribe and receive [`ControllerEvent`] values over an unbounded
//! channel, which keeps the inbound worker from ever blocking on a slow
//! handler. Dropping the [`EventStream`] unsubscribes; the engine prunes
//! closed channels on the next emit.

use crate::DiscoveredEntity;
use avdecc_core::acmpdu::Acmpdu;
use avdecc_core::aecpdu::AemCommandType;
use avdecc_core::aem::acquire_entity::AcquireEntityPayload;
use avdecc_core::aem::configuration::ConfigurationPayload;
use avdecc_core::aem::counters::CountersPayload;
use avdecc_core::aem::lock_entity::LockEntityPayload;
use avdecc_core::aem::name::NamePayload;
use avdecc_core::aem::operation::OperationStatusPayload;
use avdecc_core::aem::sampling_rate::SamplingRatePayload;
use avdecc_core::aem::stream_format::StreamFormatPayload;
use avdecc_core::aem::stream_info::StreamInfoPayload;
use avdecc_core::aem::{clock_source::ClockSourcePayload, DescriptorRef};
use avdecc_core::encoding::Reader;
use avdecc_core::types::{AvdeccString, ConfigurationIndex, UniqueIdentifier};
use tokio::sync::mpsc;

/// Everything the engine reports outside of command completions.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The transport failed; the controller is permanently unusable.
    TransportError,
    EntityOnline(DiscoveredEntity),
    EntityUpdated(DiscoveredEntity),
    EntityOffline(UniqueIdentifier),
    /// A successful unsolicited AEM response from a registered entity.
    Unsolicited(AemNotification),
    /// ACMP command on the wire issued by some other controller.
    AcmpSniffedCommand(Acmpdu),
    /// ACMP response on the wire answering some other controller.
    AcmpSniffedResponse(Acmpdu),
}

/// Typed unsolicited notifications, decoded from the AEM response payload.
#[derive(Debug, Clone)]
pub enum AemNotification {
    EntityAcquired {
        entity_id: UniqueIdentifier,
        owner_entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
    },
    EntityReleased {
        entity_id: UniqueIdentifier,
        owner_entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
    },
    EntityLocked {
        entity_id: UniqueIdentifier,
        locked_entity_id: UniqueIdentifier,
    },
    EntityUnlocked {
        entity_id: UniqueIdentifier,
    },
    ConfigurationChanged {
        entity_id: UniqueIdentifier,
        configuration_index: ConfigurationIndex,
    },
    StreamFormatChanged {
        entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
        stream_format: u64,
    },
    StreamInfoChanged {
        entity_id: UniqueIdentifier,
        payload: StreamInfoPayload,
    },
    NameChanged {
        entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
        name_index: u16,
        configuration_index: ConfigurationIndex,
        name: AvdeccString,
    },
    SamplingRateChanged {
        entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
        sampling_rate: u32,
    },
    ClockSourceChanged {
        entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
        clock_source_index: u16,
    },
    StreamingStarted {
        entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
    },
    StreamingStopped {
        entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
    },
    CountersChanged {
        entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
        counters_valid: u32,
        counters: [u32; 32],
    },
    OperationStatus {
        entity_id: UniqueIdentifier,
        descriptor: DescriptorRef,
        operation_id: u16,
        percent_complete: u16,
    },
    /// Command types without a typed decoding; the raw payload is kept.
    Other {
        entity_id: UniqueIdentifier,
        command_type: AemCommandType,
        payload: Vec<u8>,
    },
}

impl AemNotification {
    /// Decodes an unsolicited response body. Returns `None` when the payload
    /// is too short for its command type; such noise is dropped.
    pub(crate) fn decode(
        entity_id: UniqueIdentifier,
        command_type: AemCommandType,
        body: &[u8],
    ) -> Option<Self> {
        let mut r = Reader::new(body);
        let event = match command_type {
            AemCommandType::AcquireEntity => {
                let payload = AcquireEntityPayload::decode(&mut r).ok()?;
                if payload.is_release() {
                    Self::EntityReleased {
                        entity_id,
                        owner_entity_id: payload.owner_entity_id,
                        descriptor: payload.descriptor,
                    }
                } else {
                    Self::EntityAcquired {
                        entity_id,
                        owner_entity_id: payload.owner_entity_id,
                        descriptor: payload.descriptor,
                    }
                }
            }
            AemCommandType::LockEntity => {
                let payload = LockEntityPayload::decode(&mut r).ok()?;
                if payload.is_unlock() {
                    Self::EntityUnlocked { entity_id }
                } else {
                    Self::EntityLocked {
                        entity_id,
                        locked_entity_id: payload.locked_entity_id,
                    }
                }
            }
            AemCommandType::SetConfiguration => {
                let payload = ConfigurationPayload::decode(&mut r).ok()?;
                Self::ConfigurationChanged {
                    entity_id,
                    configuration_index: payload.configuration_index,
                }
            }
            AemCommandType::SetStreamFormat => {
                let payload = StreamFormatPayload::decode(&mut r).ok()?;
                Self::StreamFormatChanged {
                    entity_id,
                    descriptor: payload.descriptor,
                    stream_format: payload.stream_format,
                }
            }
            AemCommandType::SetStreamInfo | AemCommandType::GetStreamInfo => {
                let payload = StreamInfoPayload::decode(&mut r).ok()?;
                Self::StreamInfoChanged { entity_id, payload }
            }
            AemCommandType::SetName => {
                let payload = NamePayload::decode(&mut r).ok()?;
                Self::NameChanged {
                    entity_id,
                    descriptor: payload.descriptor,
                    name_index: payload.name_index,
                    configuration_index: payload.configuration_index,
                    name: payload.name,
                }
            }
            AemCommandType::SetSamplingRate => {
                let payload = SamplingRatePayload::decode(&mut r).ok()?;
                Self::SamplingRateChanged {
                    entity_id,
                    descriptor: payload.descriptor,
                    sampling_rate: payload.sampling_rate,
                }
            }
            AemCommandType::SetClockSource => {
                let payload = ClockSourcePayload::decode(&mut r).ok()?;
                Self::ClockSourceChanged {
                    entity_id,
                    descriptor: payload.descriptor,
                    clock_source_index: payload.clock_source_index,
                }
            }
            AemCommandType::StartStreaming => Self::StreamingStarted {
                entity_id,
                descriptor: DescriptorRef::decode(&mut r).ok()?,
            },
            AemCommandType::StopStreaming => Self::StreamingStopped {
                entity_id,
                descriptor: DescriptorRef::decode(&mut r).ok()?,
            },
            AemCommandType::GetCounters => {
                let payload = CountersPayload::decode(&mut r).ok()?;
                Self::CountersChanged {
                    entity_id,
                    descriptor: payload.descriptor,
                    counters_valid: payload.counters_valid,
                    counters: payload.counters,
                }
            }
            AemCommandType::OperationStatus => {
                let payload = OperationStatusPayload::decode(&mut r).ok()?;
                Self::OperationStatus {
                    entity_id,
                    descriptor: payload.descriptor,
                    operation_id: payload.operation_id,
                    percent_complete: payload.percent_complete,
                }
            }
            other => Self::Other {
                entity_id,
                command_type: other,
                payload: body.to_vec(),
            },
        };
        Some(event)
    }

    pub fn entity_id(&self) -> UniqueIdentifier {
        match self {
            Self::EntityAcquired { entity_id, .. }
            | Self::EntityReleased { entity_id, .. }
            | Self::EntityLocked { entity_id, .. }
            | Self::EntityUnlocked { entity_id }
            | Self::ConfigurationChanged { entity_id, .. }
            | Self::StreamFormatChanged { entity_id, .. }
            | Self::StreamInfoChanged { entity_id, .. }
            | Self::NameChanged { entity_id, .. }
            | Self::SamplingRateChanged { entity_id, .. }
            | Self::ClockSourceChanged { entity_id, .. }
            | Self::StreamingStarted { entity_id, .. }
            | Self::StreamingStopped { entity_id, .. }
            | Self::CountersChanged { entity_id, .. }
            | Self::OperationStatus { entity_id, .. }
            | Self::Other { entity_id, .. } => *entity_id,
        }
    }
}

/// A subscription to controller events.
pub struct EventStream {
    pub(crate) rx: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl EventStream {
    /// Receives the next event; `None` once the controller has shut down.
    pub async fn recv(&mut self) -> Option<ControllerEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant for polling in tests and tools.
    pub fn try_recv(&mut self) -> Option<ControllerEvent> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::AemNotification;
    use avdecc_core::aecpdu::AemCommandType;
    use avdecc_core::aem::configuration::ConfigurationPayload;
    use avdecc_core::encoding::Writer;
    use avdecc_core::types::UniqueIdentifier;

    #[test]
    fn configuration_change_decodes() {
        let mut buf = [0u8; ConfigurationPayload::LEN];
        let mut w = Writer::new(&mut buf);
        ConfigurationPayload {
            configuration_index: 3,
        }
        .encode(&mut w)
        .unwrap();

        let entity = UniqueIdentifier::new(0xE);
        match AemNotification::decode(entity, AemCommandType::SetConfiguration, &buf) {
            Some(AemNotification::ConfigurationChanged {
                entity_id,
                configuration_index,
            }) => {
                assert_eq!(entity_id, entity);
                assert_eq!(configuration_index, 3);
            }
            other => panic!("unexpected decoding: {other:?}"),
        }
    }

    #[test]
    fn truncated_payload_is_dropped() {
        let entity = UniqueIdentifier::new(0xE);
        assert!(AemNotification::decode(entity, AemCommandType::SetConfiguration, &[0]).is_none());
    }

    #[test]
    fn unknown_command_type_is_kept_raw() {
        let entity = UniqueIdentifier::new(0xE);
        match AemNotification::decode(entity, AemCommandType::Other(0x7123), &[1, 2, 3]) {
            Some(AemNotification::Other {
                command_type,
                payload,
                ..
            }) => {
                assert_eq!(command_type, AemCommandType::Other(0x7123));
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("unexpected decoding: {other:?}"),
        }
    }
}
