//! Lightweight simulated AVDECC entity.
//!
//! [`SimulatedEntity`] advertises itself and answers the common AEM, MVU and
//! ACMP commands with canned data. Useful for testing and development
//! without AVB hardware, and behind the `avdecc-simulate` tool.

use avdecc_core::acmpdu::{AcmpMessageType, Acmpdu, ACMPDU_LEN};
use avdecc_core::adpdu::{AdpMessageType, Adpdu, ADPDU_LEN};
use avdecc_core::aecpdu::{
    AecpHeader, AecpMessageType, AemCommandType, AemEnvelope, AECP_HEADER_LEN,
};
use avdecc_core::aem::acquire_entity::AcquireEntityPayload;
use avdecc_core::aem::configuration::ConfigurationPayload;
use avdecc_core::aem::lock_entity::LockEntityPayload;
use avdecc_core::aem::name::{GetNameCommand, NamePayload};
use avdecc_core::aem::read_descriptor::ReadDescriptorCommand;
use avdecc_core::aem::DescriptorRef;
use avdecc_core::encoding::{Reader, Writer};
use avdecc_core::ethernet::{EthernetHeader, MacAddress, SUBTYPE_ACMP, SUBTYPE_ADP, SUBTYPE_AECP};
use avdecc_core::mvu::{MilanInfo, MvuCommandType, MvuEnvelope};
use avdecc_core::status::{AcmpStatus, AemStatus};
use avdecc_core::types::{AvdeccString, DescriptorType, UniqueIdentifier};
use avdecc_datalink::{DataLink, DataLinkError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Static identity and behavior of a simulated entity.
#[derive(Debug, Clone)]
pub struct SimulatedEntityConfig {
    pub entity_id: UniqueIdentifier,
    pub entity_model_id: UniqueIdentifier,
    pub valid_time_seconds: u8,
    pub talker_stream_sources: u16,
    pub listener_stream_sinks: u16,
    /// Status returned to CONNECT_RX commands.
    pub connect_status: AcmpStatus,
    pub milan_info: Option<MilanInfo>,
}

impl SimulatedEntityConfig {
    pub fn new(entity_id: UniqueIdentifier) -> Self {
        Self {
            entity_id,
            entity_model_id: UniqueIdentifier::new(0x001B_92FF_FE00_0001),
            valid_time_seconds: 10,
            talker_stream_sources: 2,
            listener_stream_sinks: 2,
            connect_status: AcmpStatus::Success,
            milan_info: None,
        }
    }
}

#[derive(Default)]
struct EntityState {
    owner: Option<UniqueIdentifier>,
    locker: Option<UniqueIdentifier>,
    current_configuration: u16,
    available_index: u32,
    names: HashMap<(u16, u16, u16), AvdeccString>,
    descriptors: HashMap<(u16, u16), Vec<u8>>,
    /// Controllers registered for unsolicited notifications.
    subscribers: Vec<(UniqueIdentifier, MacAddress)>,
    connection_count: u16,
    /// When set, AECP and ACMP commands are swallowed (timeout testing).
    silent: bool,
}

/// A simulated AVDECC entity.
pub struct SimulatedEntity<D: DataLink> {
    config: SimulatedEntityConfig,
    datalink: D,
    state: RwLock<EntityState>,
}

impl<D: DataLink> SimulatedEntity<D> {
    pub fn new(config: SimulatedEntityConfig, datalink: D) -> Self {
        Self {
            config,
            datalink,
            state: RwLock::new(EntityState::default()),
        }
    }

    pub fn entity_id(&self) -> UniqueIdentifier {
        self.config.entity_id
    }

    /// Adds a canned descriptor body served by READ_DESCRIPTOR.
    pub async fn add_descriptor(&self, descriptor: DescriptorRef, body: Vec<u8>) {
        self.state
            .write()
            .await
            .descriptors
            .insert((descriptor.descriptor_type.to_u16(), descriptor.descriptor_index), body);
    }

    /// Makes the entity stop answering commands (it keeps advertising).
    pub async fn set_silent(&self, silent: bool) {
        self.state.write().await.silent = silent;
    }

    /// Sends one ENTITY_AVAILABLE advertisement.
    pub async fn advertise(&self) -> Result<(), DataLinkError> {
        let available_index = self.state.read().await.available_index;
        let frame = self.advertisement(AdpMessageType::EntityAvailable, available_index);
        self.datalink.send(&frame).await
    }

    /// Announces departure.
    pub async fn depart(&self) -> Result<(), DataLinkError> {
        let available_index = self.state.read().await.available_index;
        let frame = self.advertisement(AdpMessageType::EntityDeparting, available_index);
        self.datalink.send(&frame).await
    }

    /// Bumps `available_index` and re-advertises, as after a state change.
    pub async fn bump_and_advertise(&self) -> Result<(), DataLinkError> {
        {
            let mut state = self.state.write().await;
            state.available_index = state.available_index.wrapping_add(1);
        }
        self.advertise().await
    }

    /// Sends an unsolicited CONFIGURATION_CHANGED notification to every
    /// registered controller.
    pub async fn notify_configuration_changed(
        &self,
        configuration_index: u16,
    ) -> Result<(), DataLinkError> {
        let subscribers = {
            let mut state = self.state.write().await;
            state.current_configuration = configuration_index;
            state.subscribers.clone()
        };
        for (controller_id, mac) in subscribers {
            let frame = self.unsolicited_response(
                controller_id,
                mac,
                AemCommandType::SetConfiguration,
                |w| {
                    ConfigurationPayload {
                        configuration_index,
                    }
                    .encode(w)
                },
            );
            self.datalink.send(&frame).await?;
        }
        Ok(())
    }

    /// Runs the responder loop until the datalink closes.
    pub async fn run(&self) -> Result<(), DataLinkError> {
        let mut buf = [0u8; 1600];
        loop {
            let (len, _at) = self.datalink.recv(&mut buf).await?;
            if let Err(err) = self.handle_frame(&buf[..len]).await {
                log::debug!("simulator: error handling frame: {err:?}");
            }
        }
    }

    async fn handle_frame(&self, frame: &[u8]) -> Result<(), DataLinkError> {
        let mut r = Reader::new(frame);
        let Ok(eth) = EthernetHeader::decode_avtp(&mut r) else {
            return Ok(());
        };
        if eth.source == self.datalink.mac() {
            return Ok(());
        }
        match r.peek_u8() {
            Ok(SUBTYPE_ADP) => {
                if let Ok(adpdu) = Adpdu::decode(&mut r) {
                    self.handle_adp(&adpdu).await?;
                }
            }
            Ok(SUBTYPE_AECP) => {
                if let Ok(header) = AecpHeader::decode(&mut r) {
                    let payload = header
                        .payload_len()
                        .and_then(|len| r.read_exact(len))
                        .unwrap_or(&[]);
                    self.handle_aecp(&header, payload, eth.source).await?;
                }
            }
            Ok(SUBTYPE_ACMP) => {
                if let Ok(acmpdu) = Acmpdu::decode(&mut r) {
                    self.handle_acmp(&acmpdu).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn handle_adp(&self, adpdu: &Adpdu) -> Result<(), DataLinkError> {
        if adpdu.message_type != AdpMessageType::EntityDiscover {
            return Ok(());
        }
        if adpdu.entity_id == UniqueIdentifier::NULL || adpdu.entity_id == self.config.entity_id {
            self.advertise().await?;
        }
        Ok(())
    }

    async fn handle_aecp(
        &self,
        header: &AecpHeader,
        payload: &[u8],
        source: MacAddress,
    ) -> Result<(), DataLinkError> {
        if header.target_entity_id != self.config.entity_id
            || header.message_type.is_response()
        {
            return Ok(());
        }
        if self.state.read().await.silent {
            return Ok(());
        }

        match header.message_type {
            AecpMessageType::AemCommand => self.handle_aem(header, payload, source).await,
            AecpMessageType::AaCommand => {
                // Address space reads come back zero-filled; the echo keeps
                // the TLV layout intact.
                let frame = self.aecp_response(header, source, 0, payload);
                self.datalink.send(&frame).await
            }
            AecpMessageType::VendorUniqueCommand => self.handle_mvu(header, payload, source).await,
            _ => Ok(()),
        }
    }

    async fn handle_aem(
        &self,
        header: &AecpHeader,
        payload: &[u8],
        source: MacAddress,
    ) -> Result<(), DataLinkError> {
        let mut r = Reader::new(payload);
        let Ok(envelope) = AemEnvelope::decode(&mut r) else {
            return Ok(());
        };
        let body = &payload[AemEnvelope::LEN..];
        let controller = header.controller_entity_id;

        let (status, response_body) = match envelope.command_type {
            AemCommandType::EntityAvailable | AemCommandType::ControllerAvailable => {
                (AemStatus::Success, body.to_vec())
            }
            AemCommandType::AcquireEntity => {
                let mut br = Reader::new(body);
                match AcquireEntityPayload::decode(&mut br) {
                    Ok(mut request) => {
                        let mut state = self.state.write().await;
                        let status = if request.is_release() {
                            state.owner = None;
                            request.owner_entity_id = UniqueIdentifier::NULL;
                            AemStatus::Success
                        } else {
                            match state.owner {
                                Some(owner) if owner != controller => {
                                    request.owner_entity_id = owner;
                                    AemStatus::AcquiredByOther
                                }
                                _ => {
                                    state.owner = Some(controller);
                                    request.owner_entity_id = controller;
                                    AemStatus::Success
                                }
                            }
                        };
                        (status, encode_fixed(|w| request.encode(w)))
                    }
                    Err(_) => (AemStatus::BadArguments, body.to_vec()),
                }
            }
            AemCommandType::LockEntity => {
                let mut br = Reader::new(body);
                match LockEntityPayload::decode(&mut br) {
                    Ok(mut request) => {
                        let mut state = self.state.write().await;
                        let status = if request.is_unlock() {
                            state.locker = None;
                            request.locked_entity_id = UniqueIdentifier::NULL;
                            AemStatus::Success
                        } else {
                            match state.locker {
                                Some(locker) if locker != controller => {
                                    request.locked_entity_id = locker;
                                    AemStatus::LockedByOther
                                }
                                _ => {
                                    state.locker = Some(controller);
                                    request.locked_entity_id = controller;
                                    AemStatus::Success
                                }
                            }
                        };
                        (status, encode_fixed(|w| request.encode(w)))
                    }
                    Err(_) => (AemStatus::BadArguments, body.to_vec()),
                }
            }
            AemCommandType::ReadDescriptor => {
                let mut br = Reader::new(body);
                match ReadDescriptorCommand::decode(&mut br) {
                    Ok(request) => {
                        let state = self.state.read().await;
                        let key = (
                            request.descriptor.descriptor_type.to_u16(),
                            request.descriptor.descriptor_index,
                        );
                        match state.descriptors.get(&key) {
                            Some(data) => {
                                let data = data.clone();
                                let response = encode_fixed(|w| {
                                    w.write_be_u16(request.configuration_index)?;
                                    w.write_be_u16(0)?;
                                    request.descriptor.encode(w)?;
                                    w.write_all(&data)
                                });
                                (AemStatus::Success, response)
                            }
                            None => (AemStatus::NoSuchDescriptor, body.to_vec()),
                        }
                    }
                    Err(_) => (AemStatus::BadArguments, body.to_vec()),
                }
            }
            AemCommandType::SetConfiguration => {
                let mut br = Reader::new(body);
                match ConfigurationPayload::decode(&mut br) {
                    Ok(request) => {
                        self.state.write().await.current_configuration =
                            request.configuration_index;
                        (AemStatus::Success, body.to_vec())
                    }
                    Err(_) => (AemStatus::BadArguments, body.to_vec()),
                }
            }
            AemCommandType::GetConfiguration => {
                let configuration_index = self.state.read().await.current_configuration;
                let response = encode_fixed(|w| {
                    ConfigurationPayload {
                        configuration_index,
                    }
                    .encode(w)
                });
                (AemStatus::Success, response)
            }
            AemCommandType::SetName => {
                let mut br = Reader::new(body);
                match NamePayload::decode(&mut br) {
                    Ok(request) => {
                        self.state.write().await.names.insert(
                            (
                                request.descriptor.descriptor_type.to_u16(),
                                request.descriptor.descriptor_index,
                                request.name_index,
                            ),
                            request.name,
                        );
                        (AemStatus::Success, body.to_vec())
                    }
                    Err(_) => (AemStatus::BadArguments, body.to_vec()),
                }
            }
            AemCommandType::GetName => {
                let mut br = Reader::new(body);
                match GetNameCommand::decode(&mut br) {
                    Ok(request) => {
                        let state = self.state.read().await;
                        let name = state
                            .names
                            .get(&(
                                request.descriptor.descriptor_type.to_u16(),
                                request.descriptor.descriptor_index,
                                request.name_index,
                            ))
                            .copied()
                            .unwrap_or_default();
                        let response = encode_fixed(|w| {
                            NamePayload {
                                descriptor: request.descriptor,
                                name_index: request.name_index,
                                configuration_index: request.configuration_index,
                                name,
                            }
                            .encode(w)
                        });
                        (AemStatus::Success, response)
                    }
                    Err(_) => (AemStatus::BadArguments, body.to_vec()),
                }
            }
            AemCommandType::RegisterUnsolicitedNotification => {
                let mut state = self.state.write().await;
                if !state.subscribers.iter().any(|(id, _)| *id == controller) {
                    state.subscribers.push((controller, source));
                }
                (AemStatus::Success, body.to_vec())
            }
            AemCommandType::DeregisterUnsolicitedNotification => {
                let mut state = self.state.write().await;
                state.subscribers.retain(|(id, _)| *id != controller);
                (AemStatus::Success, body.to_vec())
            }
            _ => (AemStatus::NotImplemented, body.to_vec()),
        };

        let mut full = Vec::with_capacity(AemEnvelope::LEN + response_body.len());
        full.extend_from_slice(&encode_fixed(|w| {
            AemEnvelope {
                unsolicited: false,
                command_type: envelope.command_type,
            }
            .encode(w)
        }));
        full.extend_from_slice(&response_body);
        let frame = self.aecp_response(header, source, status.raw() as u8, &full);
        self.datalink.send(&frame).await
    }

    async fn handle_mvu(
        &self,
        header: &AecpHeader,
        payload: &[u8],
        source: MacAddress,
    ) -> Result<(), DataLinkError> {
        let mut r = Reader::new(payload);
        let Ok(Some(envelope)) = MvuEnvelope::decode(&mut r) else {
            return Ok(());
        };
        let (status, body) = match (envelope.command_type, self.config.milan_info) {
            (MvuCommandType::GetMilanInfo, Some(info)) => {
                (0u8, encode_fixed(|w| info.encode(w)))
            }
            _ => (1, Vec::new()), // NOT_IMPLEMENTED
        };
        let mut full = encode_fixed(|w| envelope.encode(w));
        full.extend_from_slice(&body);
        let frame = self.aecp_response(header, source, status, &full);
        self.datalink.send(&frame).await
    }

    async fn handle_acmp(&self, command: &Acmpdu) -> Result<(), DataLinkError> {
        if self.state.read().await.silent {
            return Ok(());
        }
        let for_listener = command.listener_entity_id == self.config.entity_id;
        let for_talker = command.talker_entity_id == self.config.entity_id;

        let mut response = *command;
        response.message_type = command.message_type.response_type();
        let status = match command.message_type {
            AcmpMessageType::ConnectRxCommand if for_listener => {
                let status = self.config.connect_status;
                if status == AcmpStatus::Success {
                    let mut state = self.state.write().await;
                    state.connection_count = state.connection_count.saturating_add(1);
                    response.connection_count = state.connection_count;
                    response.stream_id =
                        UniqueIdentifier::new(command.talker_entity_id.raw() << 16);
                    response.stream_dest_mac = MacAddress([0x91, 0xE0, 0xF0, 0x00, 0x00, 0x01]);
                }
                status
            }
            AcmpMessageType::DisconnectRxCommand if for_listener => {
                let mut state = self.state.write().await;
                if state.connection_count == 0 {
                    AcmpStatus::NotConnected
                } else {
                    state.connection_count -= 1;
                    response.connection_count = state.connection_count;
                    AcmpStatus::Success
                }
            }
            AcmpMessageType::GetRxStateCommand if for_listener => {
                response.connection_count = self.state.read().await.connection_count;
                AcmpStatus::Success
            }
            AcmpMessageType::GetTxStateCommand
            | AcmpMessageType::GetTxConnectionCommand
            | AcmpMessageType::DisconnectTxCommand
                if for_talker =>
            {
                response.connection_count = self.state.read().await.connection_count;
                AcmpStatus::Success
            }
            _ => return Ok(()),
        };
        response.status = status.raw() as u8;

        let mut frame = vec![0u8; EthernetHeader::LEN + ACMPDU_LEN];
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(MacAddress::AVDECC_MULTICAST, self.datalink.mac())
            .encode(&mut w)
            .and_then(|()| response.encode(&mut w))
            .expect("acmp response frame fits");
        self.datalink.send(&frame).await
    }

    fn advertisement(&self, message_type: AdpMessageType, available_index: u32) -> Vec<u8> {
        let mut adpdu = Adpdu::discover(self.config.entity_id);
        adpdu.message_type = message_type;
        adpdu.valid_time_seconds = self.config.valid_time_seconds;
        adpdu.entity_model_id = self.config.entity_model_id;
        adpdu.talker_stream_sources = self.config.talker_stream_sources;
        adpdu.listener_stream_sinks = self.config.listener_stream_sinks;
        adpdu.available_index = available_index;

        let mut frame = vec![0u8; EthernetHeader::LEN + ADPDU_LEN];
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(MacAddress::AVDECC_MULTICAST, self.datalink.mac())
            .encode(&mut w)
            .and_then(|()| adpdu.encode(&mut w))
            .expect("adp frame fits");
        frame
    }

    fn aecp_response(
        &self,
        command: &AecpHeader,
        dest: MacAddress,
        status: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut header = AecpHeader::command(
            command.message_type.response_type(),
            command.target_entity_id,
            command.controller_entity_id,
            command.sequence_id,
        );
        header.status = status;

        let mut frame = vec![0u8; EthernetHeader::LEN + AECP_HEADER_LEN + 10 + payload.len()];
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(dest, self.datalink.mac())
            .encode(&mut w)
            .and_then(|()| header.encode(&mut w, payload.len()))
            .and_then(|()| w.write_all(payload))
            .expect("aecp response frame fits");
        frame
    }

    fn unsolicited_response(
        &self,
        controller_id: UniqueIdentifier,
        dest: MacAddress,
        command_type: AemCommandType,
        body: impl FnOnce(&mut Writer<'_>) -> Result<(), avdecc_core::EncodeError>,
    ) -> Vec<u8> {
        let body = {
            let mut buf = vec![0u8; 256];
            let mut w = Writer::new(&mut buf);
            AemEnvelope {
                unsolicited: true,
                command_type,
            }
            .encode(&mut w)
            .and_then(|()| body(&mut w))
            .expect("unsolicited payload fits");
            let len = w.as_written().len();
            buf.truncate(len);
            buf
        };

        let header = AecpHeader::command(
            AecpMessageType::AemResponse,
            self.config.entity_id,
            controller_id,
            // Unsolicited responses carry their own sequence space; matching
            // is prevented by the u bit, not the sequence id.
            0xFFFF,
        );

        let mut frame = vec![0u8; EthernetHeader::LEN + AECP_HEADER_LEN + 10 + body.len()];
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(dest, self.datalink.mac())
            .encode(&mut w)
            .and_then(|()| header.encode(&mut w, body.len()))
            .and_then(|()| w.write_all(&body))
            .expect("unsolicited frame fits");
        frame
    }
}

/// Simulated entities serve an ENTITY descriptor by default.
pub fn default_entity_descriptor(config: &SimulatedEntityConfig) -> (DescriptorRef, Vec<u8>) {
    let mut body = vec![0u8; 308];
    body[..8].copy_from_slice(&config.entity_id.raw().to_be_bytes());
    body[8..16].copy_from_slice(&config.entity_model_id.raw().to_be_bytes());
    (DescriptorRef::new(DescriptorType::Entity, 0), body)
}

fn encode_fixed(encode: impl FnOnce(&mut Writer<'_>) -> Result<(), avdecc_core::EncodeError>) -> Vec<u8> {
    let mut buf = vec![0u8; 512];
    let mut w = Writer::new(&mut buf);
    encode(&mut w).expect("fixed payload fits");
    let len = w.as_written().len();
    buf.truncate(len);
    buf
}
