//! The controller engine.
//!
//! One engine binds one network interface. Two workers run beside the
//! caller: the inbound worker drains the datalink and dispatches frames to
//! the discovery table and the transaction engines; the timer worker drives
//! transaction deadlines, the discovery sweep and the advertising cadence
//! from a single deadline heap. Callers issue commands from any task; the
//! engine serializes them per target and hands results back through each
//! call's future.

use crate::acmp::{AcmpOutcome, AcmpState};
use crate::discovery::{AdpOutcome, DiscoveryTable};
use crate::entity::{DiscoveredEntity, LocalEntity};
use crate::error::Error;
use crate::events::{AemNotification, ControllerEvent, EventStream};
use crate::inflight::{AecpCommand, AecpKind, AecpOutcome, DeadlineAction, TargetState, Transmission};
use crate::timers::{TimerEvent, TimerQueue};
use avdecc_core::acmpdu::{AcmpMessageType, Acmpdu, ACMPDU_LEN};
use avdecc_core::adpdu::{AdpMessageType, Adpdu, ADPDU_LEN};
use avdecc_core::aecpdu::{AecpHeader, AecpMessageType, AemEnvelope, AECP_HEADER_LEN};
use avdecc_core::encoding::{Reader, Writer};
use avdecc_core::ethernet::{
    EthernetHeader, MacAddress, SUBTYPE_ACMP, SUBTYPE_ADP, SUBTYPE_AECP,
};
use avdecc_core::status::{AemStatus, LocalFault};
use avdecc_core::types::UniqueIdentifier;
use avdecc_core::EncodeError;
use avdecc_datalink::DataLink;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};

/// AECP commands time out after 250 ms and are retried once.
pub const AECP_COMMAND_TIMEOUT: Duration = Duration::from_millis(250);
pub const AECP_COMMAND_RETRIES: u8 = 1;
/// ACMP allows responders more processing time and is never retried.
pub const ACMP_COMMAND_TIMEOUT: Duration = Duration::from_millis(500);
/// Advertised entities that miss two periods are swept once per second.
const DISCOVERY_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
/// Advertising valid time bounds and default, in seconds.
pub const MIN_VALID_TIME: u8 = 2;
pub const MAX_VALID_TIME: u8 = 62;
pub const DEFAULT_VALID_TIME: u8 = 62;

const RECV_BUFFER_LEN: usize = 1600;

struct Advertising {
    valid_time_seconds: u8,
    available_index: u32,
    epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    TransportFailed,
    ShutDown,
}

pub(crate) struct EngineState {
    local: LocalEntity,
    discovery: DiscoveryTable,
    aecp: HashMap<UniqueIdentifier, TargetState>,
    acmp: AcmpState,
    advertising: Option<Advertising>,
    halted: Option<Halt>,
}

impl EngineState {
    fn check_usable(&self) -> Result<(), Error> {
        match self.halted {
            None => Ok(()),
            Some(Halt::TransportFailed) => Err(Error::TransportError),
            Some(Halt::ShutDown) => Err(Error::InternalError),
        }
    }

    /// Cancels every transaction involving `entity_id`, in issue order, and
    /// forgets its sequence-id state.
    fn cancel_entity(&mut self, entity_id: UniqueIdentifier, fault: LocalFault) {
        if let Some(mut target) = self.aecp.remove(&entity_id) {
            for cmd in target.fail_all() {
                cmd.complete(AecpOutcome::Fault(fault));
            }
        }
        for cmd in self.acmp.fail_addressed(entity_id) {
            cmd.complete(AcmpOutcome::Fault(fault));
        }
    }

    fn cancel_everything(&mut self, fault: LocalFault) {
        for (_, mut target) in self.aecp.drain() {
            for cmd in target.fail_all() {
                cmd.complete(AecpOutcome::Fault(fault));
            }
        }
        for cmd in self.acmp.fail_all() {
            cmd.complete(AcmpOutcome::Fault(fault));
        }
    }
}

pub(crate) struct Shared<D: DataLink> {
    datalink: D,
    entity_id: UniqueIdentifier,
    mac: MacAddress,
    interface_index: u16,
    state: Mutex<EngineState>,
    timer_tx: mpsc::UnboundedSender<(Instant, TimerEvent)>,
    observers: std::sync::Mutex<Vec<mpsc::UnboundedSender<ControllerEvent>>>,
    token_counter: AtomicU64,
}

/// An IEEE 1722.1 controller bound to one network interface.
///
/// Created with [`Controller::new`] inside a tokio runtime. All command
/// methods are asynchronous: the synchronous issue step's failures surface
/// as [`Error`], the transaction outcome (protocol or library status) rides
/// in the typed result.
pub struct Controller<D: DataLink + 'static> {
    shared: Arc<Shared<D>>,
    shutdown_tx: watch::Sender<bool>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<D: DataLink + 'static> Controller<D> {
    /// Starts an engine over `datalink` for the given local entity.
    ///
    /// Must be called within a tokio runtime; the inbound and timer workers
    /// are spawned immediately.
    pub fn new(datalink: D, local: LocalEntity) -> Result<Self, Error> {
        if !local.entity_id.is_valid() {
            return Err(Error::UnknownLocalEntity);
        }
        if !local
            .controller_capabilities
            .contains(avdecc_core::types::ControllerCapabilities::IMPLEMENTED)
        {
            return Err(Error::InvalidEntityType);
        }

        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            entity_id: local.entity_id,
            mac: datalink.mac(),
            interface_index: datalink.interface_index(),
            datalink,
            state: Mutex::new(EngineState {
                local,
                discovery: DiscoveryTable::default(),
                aecp: HashMap::new(),
                acmp: AcmpState::default(),
                advertising: None,
                halted: None,
            }),
            timer_tx,
            observers: std::sync::Mutex::new(Vec::new()),
            token_counter: AtomicU64::new(0),
        });

        let inbound = tokio::spawn(run_inbound(Arc::clone(&shared), shutdown_rx.clone()));
        let timers = tokio::spawn(run_timers(Arc::clone(&shared), timer_rx, shutdown_rx));
        shared.arm_timer(Instant::now() + DISCOVERY_SWEEP_INTERVAL, TimerEvent::DiscoverySweep);

        Ok(Self {
            shared,
            shutdown_tx,
            workers: std::sync::Mutex::new(vec![inbound, timers]),
        })
    }

    /// The EUI-64 this controller acts as.
    pub fn entity_id(&self) -> UniqueIdentifier {
        self.shared.entity_id
    }

    /// The MAC address of the bound interface.
    pub fn mac(&self) -> MacAddress {
        self.shared.mac
    }

    pub fn interface_index(&self) -> u16 {
        self.shared.interface_index
    }

    /// Subscribes to discovery, unsolicited and sniffed-traffic events.
    pub fn events(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .observers
            .lock()
            .expect("observer list poisoned")
            .push(tx);
        EventStream { rx }
    }

    /// Takes the engine lock, giving a coherent multi-read view of the
    /// discovery state. Command methods must not be awaited while the guard
    /// is held.
    pub async fn lock(&self) -> ControllerLock<'_> {
        ControllerLock {
            state: self.shared.state.lock().await,
        }
    }

    /// Value snapshot of every known remote entity, ordered by entity id.
    pub async fn discovered_entities(&self) -> Vec<DiscoveredEntity> {
        self.shared.state.lock().await.discovery.snapshot()
    }

    pub async fn discovered_entity(&self, entity_id: UniqueIdentifier) -> Option<DiscoveredEntity> {
        self.shared
            .state
            .lock()
            .await
            .discovery
            .get(entity_id)
            .cloned()
    }

    /// Multicasts a global ENTITY_DISCOVER.
    pub async fn discover_remote_entities(&self) -> Result<(), Error> {
        self.discover_remote_entity(UniqueIdentifier::NULL).await
    }

    /// Multicasts a targeted ENTITY_DISCOVER (the null id asks everyone).
    pub async fn discover_remote_entity(&self, entity_id: UniqueIdentifier) -> Result<(), Error> {
        self.shared.state.lock().await.check_usable()?;
        let frame = self
            .shared
            .build_adp_frame(&Adpdu::discover(entity_id))
            .map_err(|_| Error::InternalError)?;
        self.shared
            .datalink
            .send(&frame)
            .await
            .map_err(|_| Error::TransportError)
    }

    /// Starts advertising the local entity, immediately and then every
    /// `valid_time / 4` seconds. The valid time is clamped into [2, 62].
    pub async fn enable_entity_advertising(&self, valid_time_seconds: u8) -> Result<(), Error> {
        let valid_time = valid_time_seconds.clamp(MIN_VALID_TIME, MAX_VALID_TIME);
        let (frame, epoch) = {
            let mut state = self.shared.state.lock().await;
            state.check_usable()?;
            let epoch = match state.advertising.as_mut() {
                Some(adv) => {
                    // Re-enabling counts as a data change.
                    adv.valid_time_seconds = valid_time;
                    adv.available_index = adv.available_index.wrapping_add(1);
                    adv.epoch += 1;
                    adv.epoch
                }
                None => {
                    state.advertising = Some(Advertising {
                        valid_time_seconds: valid_time,
                        available_index: 0,
                        epoch: 1,
                    });
                    1
                }
            };
            let frame = self
                .shared
                .build_advertisement(&state, AdpMessageType::EntityAvailable)
                .map_err(|_| Error::InternalError)?;
            (frame, epoch)
        };
        self.shared
            .datalink
            .send(&frame)
            .await
            .map_err(|_| Error::TransportError)?;
        self.shared.arm_timer(
            Instant::now() + advertise_interval(valid_time),
            TimerEvent::Advertise { epoch },
        );
        Ok(())
    }

    /// Stops advertising and announces departure.
    pub async fn disable_entity_advertising(&self) -> Result<(), Error> {
        let frame = {
            let mut state = self.shared.state.lock().await;
            state.check_usable()?;
            if state.advertising.is_none() {
                return Ok(());
            }
            let frame = self
                .shared
                .build_advertisement(&state, AdpMessageType::EntityDeparting)
                .map_err(|_| Error::InternalError)?;
            state.advertising = None;
            frame
        };
        self.shared
            .datalink
            .send(&frame)
            .await
            .map_err(|_| Error::TransportError)
    }

    /// Updates the advertised gPTP association. Bumps `available_index` and
    /// re-advertises immediately when advertising is enabled.
    pub async fn set_gptp_info(
        &self,
        grandmaster_id: UniqueIdentifier,
        domain_number: u8,
    ) -> Result<(), Error> {
        let frame = {
            let mut state = self.shared.state.lock().await;
            state.check_usable()?;
            state.local.gptp_grandmaster_id = grandmaster_id;
            state.local.gptp_domain_number = domain_number;
            match state.advertising.as_mut() {
                Some(adv) => {
                    adv.available_index = adv.available_index.wrapping_add(1);
                    Some(
                        self.shared
                            .build_advertisement(&state, AdpMessageType::EntityAvailable)
                            .map_err(|_| Error::InternalError)?,
                    )
                }
                None => None,
            }
        };
        if let Some(frame) = frame {
            self.shared
                .datalink
                .send(&frame)
                .await
                .map_err(|_| Error::TransportError)?;
        }
        Ok(())
    }

    /// Cancels every pending transaction with `InternalError`, announces
    /// departure if advertising, and stops both workers. Completes only once
    /// all pending completions have been delivered.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let workers: Vec<JoinHandle<()>> = {
            let mut guard = self.workers.lock().expect("worker list poisoned");
            guard.drain(..).collect()
        };
        for worker in workers {
            let _ = worker.await;
        }

        let departing = {
            let mut state = self.shared.state.lock().await;
            state.cancel_everything(LocalFault::InternalError);
            let frame = if state.advertising.is_some() {
                self.shared
                    .build_advertisement(&state, AdpMessageType::EntityDeparting)
                    .ok()
            } else {
                None
            };
            state.advertising = None;
            state.halted = Some(Halt::ShutDown);
            frame
        };
        if let Some(frame) = departing {
            let _ = self.shared.datalink.send(&frame).await;
        }
        // Closing the observer channels tells event loops the engine is gone.
        self.shared
            .observers
            .lock()
            .expect("observer list poisoned")
            .clear();
    }

    pub(crate) fn shared(&self) -> &Shared<D> {
        &self.shared
    }
}

impl<D: DataLink + 'static> Drop for Controller<D> {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Exclusive view over the engine state for multi-step reads.
pub struct ControllerLock<'a> {
    state: MutexGuard<'a, EngineState>,
}

impl ControllerLock<'_> {
    pub fn entities(&self) -> Vec<DiscoveredEntity> {
        self.state.discovery.snapshot()
    }

    pub fn entity(&self, entity_id: UniqueIdentifier) -> Option<&DiscoveredEntity> {
        self.state.discovery.get(entity_id)
    }

    pub fn is_advertising(&self) -> bool {
        self.state.advertising.is_some()
    }
}

fn advertise_interval(valid_time_seconds: u8) -> Duration {
    Duration::from_millis(u64::from(valid_time_seconds) * 1000 / 4)
}

impl<D: DataLink> Shared<D> {
    fn token(&self) -> u64 {
        self.token_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn arm_timer(&self, deadline: Instant, event: TimerEvent) {
        // Fails only while shutting down, when deadlines no longer matter.
        let _ = self.timer_tx.send((deadline, event));
    }

    fn emit(&self, event: ControllerEvent) {
        let mut observers = self.observers.lock().expect("observer list poisoned");
        observers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn emit_all(&self, events: Vec<ControllerEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    // ---- frame builders -------------------------------------------------

    fn build_adp_frame(&self, adpdu: &Adpdu) -> Result<Vec<u8>, EncodeError> {
        let mut frame = vec![0u8; EthernetHeader::LEN + ADPDU_LEN];
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(MacAddress::AVDECC_MULTICAST, self.mac).encode(&mut w)?;
        adpdu.encode(&mut w)?;
        Ok(frame)
    }

    fn build_advertisement(
        &self,
        state: &EngineState,
        message_type: AdpMessageType,
    ) -> Result<Vec<u8>, EncodeError> {
        let advertising = state.advertising.as_ref();
        let mut adpdu = Adpdu::discover(self.entity_id);
        adpdu.message_type = message_type;
        adpdu.valid_time_seconds = advertising.map_or(0, |adv| adv.valid_time_seconds);
        adpdu.available_index = advertising.map_or(0, |adv| adv.available_index);
        adpdu.entity_model_id = state.local.entity_model_id;
        adpdu.entity_capabilities = state.local.entity_capabilities;
        adpdu.talker_stream_sources = state.local.talker_stream_sources;
        adpdu.talker_capabilities = state.local.talker_capabilities;
        adpdu.listener_stream_sinks = state.local.listener_stream_sinks;
        adpdu.listener_capabilities = state.local.listener_capabilities;
        adpdu.controller_capabilities = state.local.controller_capabilities;
        adpdu.gptp_grandmaster_id = state.local.gptp_grandmaster_id;
        adpdu.gptp_domain_number = state.local.gptp_domain_number;
        adpdu.identify_control_index = state.local.identify_control_index;
        adpdu.interface_index = self.interface_index;
        adpdu.association_id = state.local.association_id;
        self.build_adp_frame(&adpdu)
    }

    fn build_aecp_frame(
        &self,
        dest: MacAddress,
        message_type: AecpMessageType,
        target: UniqueIdentifier,
        sequence_id: u16,
        payload: &[u8],
    ) -> Result<Vec<u8>, EncodeError> {
        let mut frame =
            vec![0u8; EthernetHeader::LEN + AECP_HEADER_LEN + 10 + payload.len()];
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(dest, self.mac).encode(&mut w)?;
        AecpHeader::command(message_type, target, self.entity_id, sequence_id)
            .encode(&mut w, payload.len())?;
        w.write_all(payload)?;
        Ok(frame)
    }

    fn build_acmp_frame(&self, acmpdu: &Acmpdu) -> Result<Vec<u8>, EncodeError> {
        let mut frame = vec![0u8; EthernetHeader::LEN + ACMPDU_LEN];
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(MacAddress::AVDECC_MULTICAST, self.mac).encode(&mut w)?;
        acmpdu.encode(&mut w)?;
        Ok(frame)
    }

    // ---- command issue --------------------------------------------------

    /// Issues an AECP command and returns the completion receiver. The
    /// payload starts at the dialect envelope.
    pub(crate) async fn issue_aecp(
        &self,
        target: UniqueIdentifier,
        kind: AecpKind,
        payload: &[u8],
    ) -> Result<oneshot::Receiver<AecpOutcome>, Error> {
        let transmission;
        let receiver;
        {
            let mut state = self.state.lock().await;
            state.check_usable()?;
            let mac = state
                .discovery
                .get(target)
                .ok_or(Error::UnknownRemoteEntity)?
                .mac;
            let target_state = state.aecp.entry(target).or_default();
            let sequence_id = target_state.allocate_sequence_id();
            let frame = self
                .build_aecp_frame(mac, kind.command_type(), target, sequence_id, payload)
                .map_err(|_| Error::InternalError)?;
            let (tx, rx) = oneshot::channel();
            receiver = rx;
            let command =
                AecpCommand::new(sequence_id, kind, frame, AECP_COMMAND_RETRIES, tx);
            transmission = target_state.submit(command, self.token());
        }
        if let Some(tx) = transmission {
            self.transmit_aecp(target, tx).await;
        }
        Ok(receiver)
    }

    /// Issues an AECP command and waits for its outcome.
    pub(crate) async fn aecp_command(
        &self,
        target: UniqueIdentifier,
        kind: AecpKind,
        payload: &[u8],
    ) -> Result<AecpOutcome, Error> {
        let receiver = self.issue_aecp(target, kind, payload).await?;
        receiver.await.map_err(|_| Error::InternalError)
    }

    /// Sends one AECP transmission and arms its deadline. A failed send
    /// completes the command with `NetworkError` and moves on to the next
    /// queued command, if any.
    async fn transmit_aecp(&self, target: UniqueIdentifier, mut transmission: Transmission) {
        loop {
            match self.datalink.send(&transmission.frame).await {
                Ok(()) => {
                    self.arm_timer(
                        Instant::now() + AECP_COMMAND_TIMEOUT,
                        TimerEvent::AecpDeadline {
                            target,
                            sequence_id: transmission.sequence_id,
                            token: transmission.token,
                        },
                    );
                    return;
                }
                Err(err) => {
                    log::warn!("aecp transmit to {target} failed: {err}");
                    let aborted = {
                        let mut state = self.state.lock().await;
                        state.aecp.get_mut(&target).and_then(|target_state| {
                            target_state.abort_in_flight(transmission.sequence_id, self.token())
                        })
                    };
                    match aborted {
                        Some((command, next)) => {
                            command.complete(AecpOutcome::Fault(LocalFault::NetworkError));
                            match next {
                                Some(tx) => transmission = tx,
                                None => return,
                            }
                        }
                        None => return,
                    }
                }
            }
        }
    }

    /// Issues an ACMP command and waits for its outcome. `addressed` is the
    /// entity expected to answer; its departure cancels the command.
    pub(crate) async fn acmp_command(
        &self,
        message_type: AcmpMessageType,
        addressed: UniqueIdentifier,
        fill: impl FnOnce(&mut Acmpdu),
    ) -> Result<AcmpOutcome, Error> {
        let (receiver, frame, sequence_id);
        {
            let mut state = self.state.lock().await;
            state.check_usable()?;
            sequence_id = state.acmp.allocate_sequence_id();
            let mut acmpdu = Acmpdu::command(message_type, self.entity_id, sequence_id);
            fill(&mut acmpdu);
            frame = self
                .build_acmp_frame(&acmpdu)
                .map_err(|_| Error::InternalError)?;
            let (tx, rx) = oneshot::channel();
            receiver = rx;
            state.acmp.register(sequence_id, addressed, tx);
        }
        match self.datalink.send(&frame).await {
            Ok(()) => {
                self.arm_timer(
                    Instant::now() + ACMP_COMMAND_TIMEOUT,
                    TimerEvent::AcmpDeadline { sequence_id },
                );
            }
            Err(err) => {
                log::warn!("acmp transmit failed: {err}");
                let cancelled = self.state.lock().await.acmp.complete(sequence_id);
                if let Some(command) = cancelled {
                    command.complete(AcmpOutcome::Fault(LocalFault::NetworkError));
                }
            }
        }
        receiver.await.map_err(|_| Error::InternalError)
    }

    // ---- inbound dispatch -----------------------------------------------

    async fn dispatch_frame(&self, frame: &[u8]) {
        let mut r = Reader::new(frame);
        let eth = match EthernetHeader::decode_avtp(&mut r) {
            Ok(eth) => eth,
            Err(_) => return,
        };
        if eth.source == self.mac {
            return; // our own multicast, looped back
        }
        match r.peek_u8() {
            Ok(SUBTYPE_ADP) => match Adpdu::decode(&mut r) {
                Ok(adpdu) => self.handle_adp(&adpdu, eth.source).await,
                Err(err) => log::debug!("malformed adpdu from {}: {err}", eth.source),
            },
            Ok(SUBTYPE_AECP) => self.handle_aecp(&mut r, eth.source).await,
            Ok(SUBTYPE_ACMP) => match Acmpdu::decode(&mut r) {
                Ok(acmpdu) => self.handle_acmp(&acmpdu).await,
                Err(err) => log::debug!("malformed acmpdu from {}: {err}", eth.source),
            },
            Ok(other) => log::trace!("ignoring avtp subtype 0x{other:02X}"),
            Err(_) => {}
        }
    }

    async fn handle_adp(&self, adpdu: &Adpdu, source: MacAddress) {
        match adpdu.message_type {
            AdpMessageType::EntityAvailable => {
                if adpdu.entity_id == self.entity_id {
                    log::warn!("entity id collision: {} also used by {source}", self.entity_id);
                    return;
                }
                let mut events = Vec::new();
                {
                    let mut state = self.state.lock().await;
                    match state.discovery.on_available(adpdu, source, Instant::now()) {
                        AdpOutcome::Online(entity) => {
                            events.push(ControllerEvent::EntityOnline(entity));
                        }
                        AdpOutcome::Updated(entity) => {
                            events.push(ControllerEvent::EntityUpdated(entity));
                        }
                        AdpOutcome::Rebirth(entity) => {
                            state.cancel_entity(adpdu.entity_id, LocalFault::UnknownEntity);
                            events.push(ControllerEvent::EntityOffline(adpdu.entity_id));
                            events.push(ControllerEvent::EntityOnline(entity));
                        }
                        AdpOutcome::Refreshed => {}
                    }
                }
                self.emit_all(events);
            }
            AdpMessageType::EntityDeparting => {
                let mut events = Vec::new();
                {
                    let mut state = self.state.lock().await;
                    if state.discovery.on_departing(adpdu.entity_id).is_some() {
                        state.cancel_entity(adpdu.entity_id, LocalFault::UnknownEntity);
                        events.push(ControllerEvent::EntityOffline(adpdu.entity_id));
                    }
                }
                self.emit_all(events);
            }
            AdpMessageType::EntityDiscover => {
                let targets_us = adpdu.entity_id == UniqueIdentifier::NULL
                    || adpdu.entity_id == self.entity_id;
                if !targets_us {
                    return;
                }
                let frame = {
                    let state = self.state.lock().await;
                    if state.advertising.is_none() {
                        return;
                    }
                    self.build_advertisement(&state, AdpMessageType::EntityAvailable)
                };
                if let Ok(frame) = frame {
                    if let Err(err) = self.datalink.send(&frame).await {
                        log::warn!("discover reply failed: {err}");
                    }
                }
            }
            AdpMessageType::Unknown(raw) => {
                log::debug!("unknown adp message type {raw} from {source}");
            }
        }
    }

    async fn handle_aecp(&self, r: &mut Reader<'_>, source: MacAddress) {
        let header = match AecpHeader::decode(r) {
            Ok(header) => header,
            Err(err) => {
                log::debug!("malformed aecpdu from {source}: {err}");
                return;
            }
        };
        let payload = match header.payload_len().and_then(|len| r.read_exact(len)) {
            Ok(payload) => payload,
            Err(err) => {
                log::debug!("truncated aecpdu from {source}: {err}");
                return;
            }
        };

        if header.message_type.is_response() {
            if header.controller_entity_id == self.entity_id {
                self.handle_aecp_response(&header, payload).await;
            }
        } else if header.target_entity_id == self.entity_id {
            self.answer_aecp_command(&header, payload, source).await;
        }
    }

    async fn handle_aecp_response(&self, header: &AecpHeader, payload: &[u8]) {
        // Unsolicited responses never complete a transaction, even if their
        // sequence id happens to collide with one in flight.
        if header.message_type == AecpMessageType::AemResponse {
            let mut r = Reader::new(payload);
            if let Ok(envelope) = AemEnvelope::decode(&mut r) {
                if envelope.unsolicited {
                    self.handle_unsolicited(header, envelope, &payload[AemEnvelope::LEN..]);
                    return;
                }
            }
        }

        let mut followup = None;
        let mut matched = false;
        {
            let mut state = self.state.lock().await;
            if let Some(target_state) = state.aecp.get_mut(&header.target_entity_id) {
                if target_state.matches_response(header.sequence_id, header.message_type) {
                    matched = true;
                    let in_progress = header.message_type == AecpMessageType::AemResponse
                        && AemStatus::from_wire(header.status) == AemStatus::InProgress;
                    if in_progress {
                        // The responder asked for more time; restart the clock.
                        let token = self.token();
                        if let Some(sequence_id) = target_state.extend_in_flight(token) {
                            self.arm_timer(
                                Instant::now() + AECP_COMMAND_TIMEOUT,
                                TimerEvent::AecpDeadline {
                                    target: header.target_entity_id,
                                    sequence_id,
                                    token,
                                },
                            );
                        }
                    } else {
                        let (command, next) = target_state.complete_in_flight(self.token());
                        command.complete(AecpOutcome::Wire {
                            status: header.status,
                            payload: payload.to_vec(),
                        });
                        followup = next;
                    }
                }
            }
        }
        if let Some(tx) = followup {
            self.transmit_aecp(header.target_entity_id, tx).await;
        }
        if !matched {
            log::debug!(
                "dropping stale aecp response seq {} from {}",
                header.sequence_id,
                header.target_entity_id
            );
        }
    }

    fn handle_unsolicited(&self, header: &AecpHeader, envelope: AemEnvelope, body: &[u8]) {
        if !AemStatus::from_wire(header.status).is_success() {
            return; // failed unsolicited responses are protocol noise
        }
        if let Some(notification) =
            AemNotification::decode(header.target_entity_id, envelope.command_type, body)
        {
            self.emit(ControllerEvent::Unsolicited(notification));
        }
    }

    /// Minimal responder role: peers probe controllers with
    /// ENTITY_AVAILABLE / CONTROLLER_AVAILABLE, everything else is not
    /// implemented here.
    async fn answer_aecp_command(
        &self,
        header: &AecpHeader,
        payload: &[u8],
        source: MacAddress,
    ) {
        use avdecc_core::aecpdu::AemCommandType;

        let status = match header.message_type {
            AecpMessageType::AemCommand => {
                let mut r = Reader::new(payload);
                match AemEnvelope::decode(&mut r) {
                    Ok(envelope) => match envelope.command_type {
                        AemCommandType::EntityAvailable | AemCommandType::ControllerAvailable => {
                            AemStatus::Success.raw() as u8
                        }
                        _ => AemStatus::NotImplemented.raw() as u8,
                    },
                    Err(_) => return,
                }
            }
            AecpMessageType::AaCommand | AecpMessageType::VendorUniqueCommand => {
                avdecc_core::status::AaStatus::NotImplemented.raw() as u8
            }
            _ => return,
        };

        let mut response_header = AecpHeader::command(
            header.message_type.response_type(),
            header.target_entity_id,
            header.controller_entity_id,
            header.sequence_id,
        );
        response_header.status = status;

        let mut frame =
            vec![0u8; EthernetHeader::LEN + AECP_HEADER_LEN + 10 + payload.len()];
        let built = {
            let mut w = Writer::new(&mut frame);
            EthernetHeader::avtp(source, self.mac)
                .encode(&mut w)
                .and_then(|()| response_header.encode(&mut w, payload.len()))
                .and_then(|()| w.write_all(payload))
        };
        if built.is_ok() {
            if let Err(err) = self.datalink.send(&frame).await {
                log::warn!("aecp response to {source} failed: {err}");
            }
        }
    }

    async fn handle_acmp(&self, acmpdu: &Acmpdu) {
        if acmpdu.controller_entity_id == self.entity_id {
            if !acmpdu.message_type.is_response() {
                return; // our own command reflected by a bridge
            }
            let completed = {
                let mut state = self.state.lock().await;
                state.acmp.complete(acmpdu.sequence_id)
            };
            match completed {
                Some(command) => command.complete(AcmpOutcome::Wire(*acmpdu)),
                None => log::debug!("dropping stale acmp response seq {}", acmpdu.sequence_id),
            }
        } else if acmpdu.message_type.is_response() {
            self.emit(ControllerEvent::AcmpSniffedResponse(*acmpdu));
        } else {
            self.emit(ControllerEvent::AcmpSniffedCommand(*acmpdu));
        }
    }

    // ---- timer handling -------------------------------------------------

    async fn handle_timer(&self, event: TimerEvent) {
        match event {
            TimerEvent::AecpDeadline {
                target,
                sequence_id,
                token,
            } => {
                let action = {
                    let mut state = self.state.lock().await;
                    state.aecp.get_mut(&target).map(|target_state| {
                        target_state.on_deadline(sequence_id, token, self.token())
                    })
                };
                match action {
                    None | Some(DeadlineAction::Stale) => {}
                    Some(DeadlineAction::Retransmit(tx)) => {
                        log::debug!("retrying aecp seq {sequence_id} to {target}");
                        self.transmit_aecp(target, tx).await;
                    }
                    Some(DeadlineAction::Expired { command, next }) => {
                        log::warn!("aecp seq {sequence_id} to {target} timed out");
                        command.complete(AecpOutcome::Fault(LocalFault::TimedOut));
                        if let Some(tx) = next {
                            self.transmit_aecp(target, tx).await;
                        }
                    }
                }
            }
            TimerEvent::AcmpDeadline { sequence_id } => {
                let expired = {
                    let mut state = self.state.lock().await;
                    state.acmp.complete(sequence_id)
                };
                if let Some(command) = expired {
                    log::warn!("acmp seq {sequence_id} timed out");
                    command.complete(AcmpOutcome::Fault(LocalFault::TimedOut));
                }
            }
            TimerEvent::DiscoverySweep => {
                let mut events = Vec::new();
                let rearm = {
                    let mut state = self.state.lock().await;
                    if state.halted.is_some() {
                        false
                    } else {
                        for entity_id in state.discovery.sweep(Instant::now()) {
                            state.cancel_entity(entity_id, LocalFault::UnknownEntity);
                            events.push(ControllerEvent::EntityOffline(entity_id));
                        }
                        true
                    }
                };
                self.emit_all(events);
                if rearm {
                    self.arm_timer(
                        Instant::now() + DISCOVERY_SWEEP_INTERVAL,
                        TimerEvent::DiscoverySweep,
                    );
                }
            }
            TimerEvent::Advertise { epoch } => {
                let advert = {
                    let state = self.state.lock().await;
                    match state.advertising.as_ref() {
                        Some(adv) if adv.epoch == epoch && state.halted.is_none() => {
                            let interval = advertise_interval(adv.valid_time_seconds);
                            self.build_advertisement(&state, AdpMessageType::EntityAvailable)
                                .ok()
                                .map(|frame| (frame, interval))
                        }
                        _ => None,
                    }
                };
                if let Some((frame, interval)) = advert {
                    if let Err(err) = self.datalink.send(&frame).await {
                        log::warn!("advertisement failed: {err}");
                    }
                    self.arm_timer(Instant::now() + interval, TimerEvent::Advertise { epoch });
                }
            }
        }
    }

    /// Terminal transport loss: cancel everything with `NetworkError` and
    /// mark the interface unusable.
    async fn transport_failed(&self) {
        {
            let mut state = self.state.lock().await;
            if state.halted.is_some() {
                return;
            }
            state.halted = Some(Halt::TransportFailed);
            state.advertising = None;
            state.cancel_everything(LocalFault::NetworkError);
        }
        self.emit(ControllerEvent::TransportError);
    }
}

async fn run_inbound<D: DataLink>(shared: Arc<Shared<D>>, mut shutdown: watch::Receiver<bool>) {
    let mut buf = [0u8; RECV_BUFFER_LEN];
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            received = shared.datalink.recv(&mut buf) => match received {
                Ok((len, _rx_at)) => shared.dispatch_frame(&buf[..len]).await,
                Err(err) => {
                    log::error!("transport failed, controller halted: {err}");
                    shared.transport_failed().await;
                    break;
                }
            }
        }
    }
}

async fn run_timers<D: DataLink>(
    shared: Arc<Shared<D>>,
    mut registrations: mpsc::UnboundedReceiver<(Instant, TimerEvent)>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut queue = TimerQueue::default();
    loop {
        // With nothing scheduled, park until a registration arrives.
        let next = queue
            .next_deadline()
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            _ = shutdown.changed() => break,
            registration = registrations.recv() => match registration {
                Some((deadline, event)) => queue.push(deadline, event),
                None => break,
            },
            _ = sleep_until(next) => {
                for event in queue.pop_due(Instant::now()) {
                    shared.handle_timer(event).await;
                }
            }
        }
    }
}
