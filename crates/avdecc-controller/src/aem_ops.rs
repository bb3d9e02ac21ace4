//! Typed AEM, Address Access and Vendor Unique command methods.
//!
//! One method per wire operation. The `Err` side of each call is the issue
//! step (unknown target, dead transport); the transaction outcome travels in
//! the result's `status`, where the 994–999 library codes stand alongside
//! the protocol's own.

use crate::controller::Controller;
use crate::error::Error;
use crate::inflight::{AecpKind, AecpOutcome};
use avdecc_core::aa::{decode_tlvs, encode_tlvs, AaTlv};
use avdecc_core::aecpdu::{AemCommandType, AemEnvelope};
use avdecc_core::aem::acquire_entity::AcquireEntityPayload;
use avdecc_core::aem::audio_map::{
    AudioMapping, AudioMappingsPayload, GetAudioMapCommand, GetAudioMapResponse,
};
use avdecc_core::aem::avb_info::AvbInfoPayload;
use avdecc_core::aem::clock_source::ClockSourcePayload;
use avdecc_core::aem::configuration::ConfigurationPayload;
use avdecc_core::aem::counters::CountersPayload;
use avdecc_core::aem::lock_entity::LockEntityPayload;
use avdecc_core::aem::name::{GetNameCommand, NamePayload};
use avdecc_core::aem::operation::{AbortOperationPayload, StartOperationPayload};
use avdecc_core::aem::read_descriptor::{ReadDescriptorCommand, ReadDescriptorResponse};
use avdecc_core::aem::sampling_rate::SamplingRatePayload;
use avdecc_core::aem::stream_format::StreamFormatPayload;
use avdecc_core::aem::stream_info::{StreamInfo, StreamInfoPayload};
use avdecc_core::aem::DescriptorRef;
use avdecc_core::encoding::{Reader, Writer};
use avdecc_core::mvu::{
    GetMilanInfoCommand, MilanInfo, MvuCommandType, MvuEnvelope,
};
use avdecc_core::status::{AaStatus, AemStatus, MvuStatus};
use avdecc_core::types::{
    AvdeccString, ConfigurationIndex, DescriptorIndex, DescriptorType, StreamIndex,
    UniqueIdentifier,
};
use avdecc_core::EncodeError;
use avdecc_datalink::DataLink;

/// Encodes a payload of unknown size, growing the buffer until it fits.
fn encode_with_growth<F>(mut encode: F) -> Result<Vec<u8>, Error>
where
    F: FnMut(&mut Writer<'_>) -> Result<(), EncodeError>,
{
    for size in [128usize, 512, 1024, 1500] {
        let mut buf = vec![0u8; size];
        let mut w = Writer::new(&mut buf);
        match encode(&mut w) {
            Ok(()) => {
                let written = w.as_written().len();
                buf.truncate(written);
                return Ok(buf);
            }
            Err(EncodeError::BufferTooSmall) => continue,
            Err(_) => return Err(Error::InternalError),
        }
    }
    // Anything bigger would not fit one Ethernet frame anyway.
    Err(Error::InternalError)
}

fn aem_payload<F>(command_type: AemCommandType, body: F) -> Result<Vec<u8>, Error>
where
    F: FnMut(&mut Writer<'_>) -> Result<(), EncodeError>,
{
    let mut body = body;
    encode_with_growth(|w| {
        AemEnvelope::command(command_type).encode(w)?;
        body(w)
    })
}

/// Splits a completed AEM transaction into status and response body. A
/// response whose command type does not echo the command is malformed.
fn aem_outcome(outcome: AecpOutcome, expected: AemCommandType) -> (AemStatus, Option<Vec<u8>>) {
    match outcome {
        AecpOutcome::Wire { status, payload } => {
            let mut r = Reader::new(&payload);
            match AemEnvelope::decode(&mut r) {
                Ok(envelope) if envelope.command_type == expected => (
                    AemStatus::from_wire(status),
                    Some(payload[AemEnvelope::LEN..].to_vec()),
                ),
                _ => (AemStatus::ProtocolError, None),
            }
        }
        AecpOutcome::Fault(fault) => (AemStatus::from_fault(fault), None),
    }
}

/// Decodes the echoed body of a response. Success responses must parse;
/// failure responses are allowed to omit or truncate the echo.
fn parse_body<T>(
    status: AemStatus,
    body: Option<Vec<u8>>,
    parse: impl FnOnce(&mut Reader<'_>) -> Option<T>,
) -> (AemStatus, Option<T>) {
    match body {
        Some(bytes) => {
            let mut r = Reader::new(&bytes);
            match parse(&mut r) {
                Some(value) => (status, Some(value)),
                None if status.is_success() => (AemStatus::ProtocolError, None),
                None => (status, None),
            }
        }
        None => (status, None),
    }
}

#[derive(Debug, Clone)]
pub struct AcquireEntityResult {
    pub status: AemStatus,
    /// The controller owning the entity, per the response.
    pub owning_entity: Option<UniqueIdentifier>,
    pub descriptor: Option<DescriptorRef>,
}

#[derive(Debug, Clone)]
pub struct LockEntityResult {
    pub status: AemStatus,
    pub locked_entity: Option<UniqueIdentifier>,
}

#[derive(Debug, Clone)]
pub struct ReadDescriptorResult {
    pub status: AemStatus,
    pub configuration_index: ConfigurationIndex,
    pub descriptor: Option<DescriptorRef>,
    /// Raw descriptor body, starting after the repeated type/index pair.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ConfigurationResult {
    pub status: AemStatus,
    pub configuration_index: Option<ConfigurationIndex>,
}

#[derive(Debug, Clone)]
pub struct StreamFormatResult {
    pub status: AemStatus,
    pub stream_format: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct StreamInfoResult {
    pub status: AemStatus,
    pub info: Option<StreamInfo>,
}

#[derive(Debug, Clone)]
pub struct NameResult {
    pub status: AemStatus,
    pub name: Option<AvdeccString>,
}

#[derive(Debug, Clone)]
pub struct SamplingRateResult {
    pub status: AemStatus,
    pub sampling_rate: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ClockSourceResult {
    pub status: AemStatus,
    pub clock_source_index: Option<DescriptorIndex>,
}

#[derive(Debug, Clone)]
pub struct AvbInfoResult {
    pub status: AemStatus,
    pub info: Option<AvbInfoPayload>,
}

#[derive(Debug, Clone)]
pub struct CountersResult {
    pub status: AemStatus,
    pub counters_valid: u32,
    pub counters: [u32; 32],
}

#[derive(Debug, Clone)]
pub struct AudioMapResult {
    pub status: AemStatus,
    pub map_index: u16,
    pub number_of_maps: u16,
    pub mappings: Vec<AudioMapping>,
}

#[derive(Debug, Clone)]
pub struct AudioMappingsResult {
    pub status: AemStatus,
    pub mappings: Vec<AudioMapping>,
}

#[derive(Debug, Clone)]
pub struct StartOperationResult {
    pub status: AemStatus,
    pub operation_id: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct AddressAccessResult {
    pub status: AaStatus,
    pub tlvs: Vec<AaTlv>,
}

#[derive(Debug, Clone)]
pub struct MilanInfoResult {
    pub status: MvuStatus,
    pub info: Option<MilanInfo>,
}

impl<D: DataLink + 'static> Controller<D> {
    async fn aem(
        &self,
        target: UniqueIdentifier,
        command_type: AemCommandType,
        payload: Vec<u8>,
    ) -> Result<(AemStatus, Option<Vec<u8>>), Error> {
        let outcome = self
            .shared()
            .aecp_command(target, AecpKind::Aem, &payload)
            .await?;
        Ok(aem_outcome(outcome, command_type))
    }

    /// ACQUIRE_ENTITY: take (or contend for) ownership of a descriptor.
    pub async fn acquire_entity(
        &self,
        target: UniqueIdentifier,
        persistent: bool,
        descriptor: DescriptorRef,
    ) -> Result<AcquireEntityResult, Error> {
        let request = AcquireEntityPayload::acquire(persistent, descriptor);
        self.acquire_like(target, request).await
    }

    /// ACQUIRE_ENTITY with the release flag: give ownership back.
    pub async fn release_entity(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
    ) -> Result<AcquireEntityResult, Error> {
        self.acquire_like(target, AcquireEntityPayload::release(descriptor))
            .await
    }

    async fn acquire_like(
        &self,
        target: UniqueIdentifier,
        request: AcquireEntityPayload,
    ) -> Result<AcquireEntityResult, Error> {
        let payload = aem_payload(AemCommandType::AcquireEntity, |w| request.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::AcquireEntity, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| AcquireEntityPayload::decode(r).ok());
        Ok(AcquireEntityResult {
            status,
            owning_entity: parsed.map(|p| p.owner_entity_id),
            descriptor: parsed.map(|p| p.descriptor),
        })
    }

    /// LOCK_ENTITY: short-lived exclusive access for atomic sequences.
    pub async fn lock_entity(&self, target: UniqueIdentifier) -> Result<LockEntityResult, Error> {
        self.lock_like(target, LockEntityPayload::lock()).await
    }

    pub async fn unlock_entity(&self, target: UniqueIdentifier) -> Result<LockEntityResult, Error> {
        self.lock_like(target, LockEntityPayload::unlock()).await
    }

    async fn lock_like(
        &self,
        target: UniqueIdentifier,
        request: LockEntityPayload,
    ) -> Result<LockEntityResult, Error> {
        let payload = aem_payload(AemCommandType::LockEntity, |w| request.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::LockEntity, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| LockEntityPayload::decode(r).ok());
        Ok(LockEntityResult {
            status,
            locked_entity: parsed.map(|p| p.locked_entity_id),
        })
    }

    /// ENTITY_AVAILABLE: liveness probe.
    pub async fn query_entity_available(
        &self,
        target: UniqueIdentifier,
    ) -> Result<AemStatus, Error> {
        let payload = aem_payload(AemCommandType::EntityAvailable, |_| Ok(()))?;
        let (status, _) = self.aem(target, AemCommandType::EntityAvailable, payload).await?;
        Ok(status)
    }

    /// CONTROLLER_AVAILABLE: ask another controller whether it still runs.
    pub async fn query_controller_available(
        &self,
        target: UniqueIdentifier,
    ) -> Result<AemStatus, Error> {
        let payload = aem_payload(AemCommandType::ControllerAvailable, |_| Ok(()))?;
        let (status, _) = self
            .aem(target, AemCommandType::ControllerAvailable, payload)
            .await?;
        Ok(status)
    }

    /// REGISTER_UNSOLICITED_NOTIFICATION: subscribe to the target's state
    /// change reports.
    pub async fn register_unsolicited_notifications(
        &self,
        target: UniqueIdentifier,
    ) -> Result<AemStatus, Error> {
        let payload = aem_payload(AemCommandType::RegisterUnsolicitedNotification, |_| Ok(()))?;
        let (status, _) = self
            .aem(target, AemCommandType::RegisterUnsolicitedNotification, payload)
            .await?;
        Ok(status)
    }

    pub async fn unregister_unsolicited_notifications(
        &self,
        target: UniqueIdentifier,
    ) -> Result<AemStatus, Error> {
        let payload =
            aem_payload(AemCommandType::DeregisterUnsolicitedNotification, |_| Ok(()))?;
        let (status, _) = self
            .aem(target, AemCommandType::DeregisterUnsolicitedNotification, payload)
            .await?;
        Ok(status)
    }

    /// READ_DESCRIPTOR: fetch one raw descriptor from the target's model.
    pub async fn read_descriptor(
        &self,
        target: UniqueIdentifier,
        configuration_index: ConfigurationIndex,
        descriptor: DescriptorRef,
    ) -> Result<ReadDescriptorResult, Error> {
        let request = ReadDescriptorCommand {
            configuration_index,
            descriptor,
        };
        let payload = aem_payload(AemCommandType::ReadDescriptor, |w| request.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::ReadDescriptor, payload).await?;
        let (status, parsed) =
            parse_body(status, body, |r| ReadDescriptorResponse::decode(r).ok());
        Ok(match parsed {
            Some(response) => ReadDescriptorResult {
                status,
                configuration_index: response.configuration_index,
                descriptor: Some(response.descriptor),
                data: response.data,
            },
            None => ReadDescriptorResult {
                status,
                configuration_index,
                descriptor: None,
                data: Vec::new(),
            },
        })
    }

    pub async fn read_entity_descriptor(
        &self,
        target: UniqueIdentifier,
    ) -> Result<ReadDescriptorResult, Error> {
        self.read_descriptor(target, 0, DescriptorRef::new(DescriptorType::Entity, 0))
            .await
    }

    pub async fn read_configuration_descriptor(
        &self,
        target: UniqueIdentifier,
        configuration_index: ConfigurationIndex,
    ) -> Result<ReadDescriptorResult, Error> {
        self.read_descriptor(
            target,
            0,
            DescriptorRef::new(DescriptorType::Configuration, configuration_index),
        )
        .await
    }

    pub async fn read_stream_input_descriptor(
        &self,
        target: UniqueIdentifier,
        configuration_index: ConfigurationIndex,
        stream_index: StreamIndex,
    ) -> Result<ReadDescriptorResult, Error> {
        self.read_descriptor(
            target,
            configuration_index,
            DescriptorRef::new(DescriptorType::StreamInput, stream_index),
        )
        .await
    }

    pub async fn read_stream_output_descriptor(
        &self,
        target: UniqueIdentifier,
        configuration_index: ConfigurationIndex,
        stream_index: StreamIndex,
    ) -> Result<ReadDescriptorResult, Error> {
        self.read_descriptor(
            target,
            configuration_index,
            DescriptorRef::new(DescriptorType::StreamOutput, stream_index),
        )
        .await
    }

    /// SET_CONFIGURATION: select the target's active configuration.
    pub async fn set_configuration(
        &self,
        target: UniqueIdentifier,
        configuration_index: ConfigurationIndex,
    ) -> Result<ConfigurationResult, Error> {
        let request = ConfigurationPayload {
            configuration_index,
        };
        let payload = aem_payload(AemCommandType::SetConfiguration, |w| request.encode(w))?;
        let (status, body) = self
            .aem(target, AemCommandType::SetConfiguration, payload)
            .await?;
        let (status, parsed) = parse_body(status, body, |r| ConfigurationPayload::decode(r).ok());
        Ok(ConfigurationResult {
            status,
            configuration_index: parsed.map(|p| p.configuration_index),
        })
    }

    pub async fn get_configuration(
        &self,
        target: UniqueIdentifier,
    ) -> Result<ConfigurationResult, Error> {
        let payload = aem_payload(AemCommandType::GetConfiguration, |_| Ok(()))?;
        let (status, body) = self
            .aem(target, AemCommandType::GetConfiguration, payload)
            .await?;
        let (status, parsed) = parse_body(status, body, |r| ConfigurationPayload::decode(r).ok());
        Ok(ConfigurationResult {
            status,
            configuration_index: parsed.map(|p| p.configuration_index),
        })
    }

    /// SET_STREAM_FORMAT on a stream input or output descriptor.
    pub async fn set_stream_format(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        stream_format: u64,
    ) -> Result<StreamFormatResult, Error> {
        let request = StreamFormatPayload {
            descriptor,
            stream_format,
        };
        let payload = aem_payload(AemCommandType::SetStreamFormat, |w| request.encode(w))?;
        let (status, body) = self
            .aem(target, AemCommandType::SetStreamFormat, payload)
            .await?;
        let (status, parsed) = parse_body(status, body, |r| StreamFormatPayload::decode(r).ok());
        Ok(StreamFormatResult {
            status,
            stream_format: parsed.map(|p| p.stream_format),
        })
    }

    pub async fn get_stream_format(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
    ) -> Result<StreamFormatResult, Error> {
        let payload = aem_payload(AemCommandType::GetStreamFormat, |w| descriptor.encode(w))?;
        let (status, body) = self
            .aem(target, AemCommandType::GetStreamFormat, payload)
            .await?;
        let (status, parsed) = parse_body(status, body, |r| StreamFormatPayload::decode(r).ok());
        Ok(StreamFormatResult {
            status,
            stream_format: parsed.map(|p| p.stream_format),
        })
    }

    /// SET_STREAM_INFO: push dynamic stream state to the target.
    pub async fn set_stream_info(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        info: StreamInfo,
    ) -> Result<StreamInfoResult, Error> {
        let request = StreamInfoPayload { descriptor, info };
        let payload = aem_payload(AemCommandType::SetStreamInfo, |w| request.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::SetStreamInfo, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| StreamInfoPayload::decode(r).ok());
        Ok(StreamInfoResult {
            status,
            info: parsed.map(|p| p.info),
        })
    }

    pub async fn get_stream_info(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
    ) -> Result<StreamInfoResult, Error> {
        let payload = aem_payload(AemCommandType::GetStreamInfo, |w| descriptor.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::GetStreamInfo, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| StreamInfoPayload::decode(r).ok());
        Ok(StreamInfoResult {
            status,
            info: parsed.map(|p| p.info),
        })
    }

    /// SET_NAME on any name field of any descriptor.
    pub async fn set_name(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        name_index: u16,
        configuration_index: ConfigurationIndex,
        name: AvdeccString,
    ) -> Result<NameResult, Error> {
        let request = NamePayload {
            descriptor,
            name_index,
            configuration_index,
            name,
        };
        let payload = aem_payload(AemCommandType::SetName, |w| request.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::SetName, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| NamePayload::decode(r).ok());
        Ok(NameResult {
            status,
            name: parsed.map(|p| p.name),
        })
    }

    pub async fn get_name(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        name_index: u16,
        configuration_index: ConfigurationIndex,
    ) -> Result<NameResult, Error> {
        let request = GetNameCommand {
            descriptor,
            name_index,
            configuration_index,
        };
        let payload = aem_payload(AemCommandType::GetName, |w| request.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::GetName, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| NamePayload::decode(r).ok());
        Ok(NameResult {
            status,
            name: parsed.map(|p| p.name),
        })
    }

    pub async fn set_entity_name(
        &self,
        target: UniqueIdentifier,
        name: AvdeccString,
    ) -> Result<NameResult, Error> {
        self.set_name(target, DescriptorRef::new(DescriptorType::Entity, 0), 0, 0, name)
            .await
    }

    pub async fn get_entity_name(&self, target: UniqueIdentifier) -> Result<NameResult, Error> {
        self.get_name(target, DescriptorRef::new(DescriptorType::Entity, 0), 0, 0)
            .await
    }

    pub async fn set_entity_group_name(
        &self,
        target: UniqueIdentifier,
        name: AvdeccString,
    ) -> Result<NameResult, Error> {
        self.set_name(target, DescriptorRef::new(DescriptorType::Entity, 0), 1, 0, name)
            .await
    }

    pub async fn get_entity_group_name(
        &self,
        target: UniqueIdentifier,
    ) -> Result<NameResult, Error> {
        self.get_name(target, DescriptorRef::new(DescriptorType::Entity, 0), 1, 0)
            .await
    }

    /// SET_SAMPLING_RATE on an audio unit or cluster descriptor.
    pub async fn set_sampling_rate(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        sampling_rate: u32,
    ) -> Result<SamplingRateResult, Error> {
        let request = SamplingRatePayload {
            descriptor,
            sampling_rate,
        };
        let payload = aem_payload(AemCommandType::SetSamplingRate, |w| request.encode(w))?;
        let (status, body) = self
            .aem(target, AemCommandType::SetSamplingRate, payload)
            .await?;
        let (status, parsed) = parse_body(status, body, |r| SamplingRatePayload::decode(r).ok());
        Ok(SamplingRateResult {
            status,
            sampling_rate: parsed.map(|p| p.sampling_rate),
        })
    }

    pub async fn get_sampling_rate(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
    ) -> Result<SamplingRateResult, Error> {
        let payload = aem_payload(AemCommandType::GetSamplingRate, |w| descriptor.encode(w))?;
        let (status, body) = self
            .aem(target, AemCommandType::GetSamplingRate, payload)
            .await?;
        let (status, parsed) = parse_body(status, body, |r| SamplingRatePayload::decode(r).ok());
        Ok(SamplingRateResult {
            status,
            sampling_rate: parsed.map(|p| p.sampling_rate),
        })
    }

    /// SET_CLOCK_SOURCE on a clock domain descriptor.
    pub async fn set_clock_source(
        &self,
        target: UniqueIdentifier,
        clock_domain_index: DescriptorIndex,
        clock_source_index: DescriptorIndex,
    ) -> Result<ClockSourceResult, Error> {
        let request = ClockSourcePayload {
            descriptor: DescriptorRef::new(DescriptorType::ClockDomain, clock_domain_index),
            clock_source_index,
        };
        let payload = aem_payload(AemCommandType::SetClockSource, |w| request.encode(w))?;
        let (status, body) = self
            .aem(target, AemCommandType::SetClockSource, payload)
            .await?;
        let (status, parsed) = parse_body(status, body, |r| ClockSourcePayload::decode(r).ok());
        Ok(ClockSourceResult {
            status,
            clock_source_index: parsed.map(|p| p.clock_source_index),
        })
    }

    pub async fn get_clock_source(
        &self,
        target: UniqueIdentifier,
        clock_domain_index: DescriptorIndex,
    ) -> Result<ClockSourceResult, Error> {
        let descriptor = DescriptorRef::new(DescriptorType::ClockDomain, clock_domain_index);
        let payload = aem_payload(AemCommandType::GetClockSource, |w| descriptor.encode(w))?;
        let (status, body) = self
            .aem(target, AemCommandType::GetClockSource, payload)
            .await?;
        let (status, parsed) = parse_body(status, body, |r| ClockSourcePayload::decode(r).ok());
        Ok(ClockSourceResult {
            status,
            clock_source_index: parsed.map(|p| p.clock_source_index),
        })
    }

    /// START_STREAMING on a stream input or output.
    pub async fn start_streaming(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
    ) -> Result<AemStatus, Error> {
        let payload = aem_payload(AemCommandType::StartStreaming, |w| descriptor.encode(w))?;
        let (status, _) = self.aem(target, AemCommandType::StartStreaming, payload).await?;
        Ok(status)
    }

    pub async fn stop_streaming(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
    ) -> Result<AemStatus, Error> {
        let payload = aem_payload(AemCommandType::StopStreaming, |w| descriptor.encode(w))?;
        let (status, _) = self.aem(target, AemCommandType::StopStreaming, payload).await?;
        Ok(status)
    }

    /// GET_AVB_INFO on an AVB interface descriptor.
    pub async fn get_avb_info(
        &self,
        target: UniqueIdentifier,
        avb_interface_index: DescriptorIndex,
    ) -> Result<AvbInfoResult, Error> {
        let descriptor = DescriptorRef::new(DescriptorType::AvbInterface, avb_interface_index);
        let payload = aem_payload(AemCommandType::GetAvbInfo, |w| descriptor.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::GetAvbInfo, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| AvbInfoPayload::decode(r).ok());
        Ok(AvbInfoResult {
            status,
            info: parsed,
        })
    }

    /// GET_COUNTERS on any descriptor that keeps them.
    pub async fn get_counters(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
    ) -> Result<CountersResult, Error> {
        let payload = aem_payload(AemCommandType::GetCounters, |w| descriptor.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::GetCounters, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| CountersPayload::decode(r).ok());
        Ok(match parsed {
            Some(counters) => CountersResult {
                status,
                counters_valid: counters.counters_valid,
                counters: counters.counters,
            },
            None => CountersResult {
                status,
                counters_valid: 0,
                counters: [0; 32],
            },
        })
    }

    /// GET_AUDIO_MAP: one window of a dynamic audio map.
    pub async fn get_audio_map(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        map_index: u16,
    ) -> Result<AudioMapResult, Error> {
        let request = GetAudioMapCommand {
            descriptor,
            map_index,
        };
        let payload = aem_payload(AemCommandType::GetAudioMap, |w| request.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::GetAudioMap, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| GetAudioMapResponse::decode(r).ok());
        Ok(match parsed {
            Some(response) => AudioMapResult {
                status,
                map_index: response.map_index,
                number_of_maps: response.number_of_maps,
                mappings: response.mappings,
            },
            None => AudioMapResult {
                status,
                map_index,
                number_of_maps: 0,
                mappings: Vec::new(),
            },
        })
    }

    /// ADD_AUDIO_MAPPINGS (at most 62 per command).
    pub async fn add_audio_mappings(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        mappings: Vec<AudioMapping>,
    ) -> Result<AudioMappingsResult, Error> {
        self.audio_mappings(target, AemCommandType::AddAudioMappings, descriptor, mappings)
            .await
    }

    /// REMOVE_AUDIO_MAPPINGS (at most 62 per command).
    pub async fn remove_audio_mappings(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        mappings: Vec<AudioMapping>,
    ) -> Result<AudioMappingsResult, Error> {
        self.audio_mappings(
            target,
            AemCommandType::RemoveAudioMappings,
            descriptor,
            mappings,
        )
        .await
    }

    async fn audio_mappings(
        &self,
        target: UniqueIdentifier,
        command_type: AemCommandType,
        descriptor: DescriptorRef,
        mappings: Vec<AudioMapping>,
    ) -> Result<AudioMappingsResult, Error> {
        let request = AudioMappingsPayload {
            descriptor,
            mappings,
        };
        let payload = aem_payload(command_type, |w| request.encode(w))?;
        let (status, body) = self.aem(target, command_type, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| AudioMappingsPayload::decode(r).ok());
        Ok(AudioMappingsResult {
            status,
            mappings: parsed.map(|p| p.mappings).unwrap_or_default(),
        })
    }

    /// START_OPERATION: long-running memory object work (firmware upload,
    /// erase), progress arrives as OPERATION_STATUS notifications.
    pub async fn start_operation(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        operation_type: u16,
        data: Vec<u8>,
    ) -> Result<StartOperationResult, Error> {
        let request = StartOperationPayload {
            descriptor,
            operation_id: 0,
            operation_type,
            data,
        };
        let payload = aem_payload(AemCommandType::StartOperation, |w| request.encode(w))?;
        let (status, body) = self.aem(target, AemCommandType::StartOperation, payload).await?;
        let (status, parsed) = parse_body(status, body, |r| StartOperationPayload::decode(r).ok());
        Ok(StartOperationResult {
            status,
            operation_id: parsed.map(|p| p.operation_id),
        })
    }

    pub async fn abort_operation(
        &self,
        target: UniqueIdentifier,
        descriptor: DescriptorRef,
        operation_id: u16,
    ) -> Result<AemStatus, Error> {
        let request = AbortOperationPayload {
            descriptor,
            operation_id,
        };
        let payload = aem_payload(AemCommandType::AbortOperation, |w| request.encode(w))?;
        let (status, _) = self.aem(target, AemCommandType::AbortOperation, payload).await?;
        Ok(status)
    }

    /// Address Access: raw reads and writes in the target's address space.
    pub async fn address_access(
        &self,
        target: UniqueIdentifier,
        tlvs: Vec<AaTlv>,
    ) -> Result<AddressAccessResult, Error> {
        let payload = encode_with_growth(|w| encode_tlvs(w, &tlvs))?;
        let outcome = self
            .shared()
            .aecp_command(target, AecpKind::Aa, &payload)
            .await?;
        Ok(match outcome {
            AecpOutcome::Wire { status, payload } => {
                let status = AaStatus::from_wire(status);
                let mut r = Reader::new(&payload);
                match decode_tlvs(&mut r) {
                    Ok(tlvs) => AddressAccessResult { status, tlvs },
                    Err(_) if status.is_success() => AddressAccessResult {
                        status: AaStatus::ProtocolError,
                        tlvs: Vec::new(),
                    },
                    Err(_) => AddressAccessResult {
                        status,
                        tlvs: Vec::new(),
                    },
                }
            }
            AecpOutcome::Fault(fault) => AddressAccessResult {
                status: AaStatus::from_fault(fault),
                tlvs: Vec::new(),
            },
        })
    }

    /// Milan GET_MILAN_INFO.
    pub async fn get_milan_info(
        &self,
        target: UniqueIdentifier,
        configuration_index: ConfigurationIndex,
    ) -> Result<MilanInfoResult, Error> {
        let request = GetMilanInfoCommand {
            configuration_index,
        };
        let payload = encode_with_growth(|w| {
            MvuEnvelope {
                command_type: MvuCommandType::GetMilanInfo,
            }
            .encode(w)?;
            request.encode(w)
        })?;
        let outcome = self
            .shared()
            .aecp_command(target, AecpKind::Mvu, &payload)
            .await?;
        Ok(match outcome {
            AecpOutcome::Wire { status, payload } => {
                let status = MvuStatus::from_wire(status);
                let mut r = Reader::new(&payload);
                let parsed = match MvuEnvelope::decode(&mut r) {
                    Ok(Some(envelope))
                        if envelope.command_type == MvuCommandType::GetMilanInfo =>
                    {
                        MilanInfo::decode(&mut r).ok()
                    }
                    _ => None,
                };
                match parsed {
                    Some(info) => MilanInfoResult {
                        status,
                        info: Some(info),
                    },
                    None if status.is_success() => MilanInfoResult {
                        status: MvuStatus::ProtocolError,
                        info: None,
                    },
                    None => MilanInfoResult { status, info: None },
                }
            }
            AecpOutcome::Fault(fault) => MilanInfoResult {
                status: MvuStatus::from_fault(fault),
                info: None,
            },
        })
    }
}
