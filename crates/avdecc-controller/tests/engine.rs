//! End-to-end engine tests over an in-process virtual network.
//!
//! Each test runs under a paused tokio clock, so the 250 ms AECP deadlines
//! and the multi-second discovery timeouts execute instantly while staying
//! exact.

use avdecc_controller::simulator::{SimulatedEntity, SimulatedEntityConfig};
use avdecc_controller::{
    AcmpStatus, AemNotification, AemStatus, Controller, ControllerEvent, Error, EventStream,
    LocalEntity,
};
use avdecc_core::adpdu::{AdpMessageType, Adpdu, ADPDU_LEN};
use avdecc_core::aecpdu::{AecpHeader, AecpMessageType};
use avdecc_core::aem::DescriptorRef;
use avdecc_core::encoding::{Reader, Writer};
use avdecc_core::ethernet::{EthernetHeader, MacAddress, SUBTYPE_AECP};
use avdecc_core::types::{DescriptorType, StreamIdentification, UniqueIdentifier};
use avdecc_datalink::{DataLink, VirtualNetwork, VirtualTransport};
use std::sync::Arc;
use tokio::time::{timeout, Duration, Instant};

const CONTROLLER_ID: UniqueIdentifier = UniqueIdentifier::new(0x0099_AABB_CCDD_0001);
const CONTROLLER_MAC: MacAddress = MacAddress([0x02, 0xC0, 0x00, 0x00, 0x00, 0x01]);
const TARGET_ID: UniqueIdentifier = UniqueIdentifier::new(0x0011_0000_0000_0001);
const TARGET_MAC: MacAddress = MacAddress([0x02, 0xAA, 0x00, 0x00, 0x00, 0x01]);

fn start_controller(net: &VirtualNetwork) -> Arc<Controller<VirtualTransport>> {
    let datalink = net.endpoint(CONTROLLER_MAC);
    let local = LocalEntity::controller(CONTROLLER_ID, UniqueIdentifier::new(0x0099_AABB_0000_0000));
    Arc::new(Controller::new(datalink, local).expect("controller starts"))
}

fn start_simulator(
    net: &VirtualNetwork,
    config: SimulatedEntityConfig,
    mac: MacAddress,
) -> Arc<SimulatedEntity<VirtualTransport>> {
    let sim = Arc::new(SimulatedEntity::new(config, net.endpoint(mac)));
    let runner = Arc::clone(&sim);
    tokio::spawn(async move {
        let _ = runner.run().await;
    });
    sim
}

async fn next_event(events: &mut EventStream) -> ControllerEvent {
    timeout(Duration::from_secs(120), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

async fn wait_online(events: &mut EventStream, entity_id: UniqueIdentifier) {
    loop {
        if let ControllerEvent::EntityOnline(entity) = next_event(events).await {
            if entity.entity_id == entity_id {
                return;
            }
        }
    }
}

/// A hand-driven peer on the virtual segment.
struct RawPeer {
    transport: VirtualTransport,
}

impl RawPeer {
    fn new(net: &VirtualNetwork, mac: MacAddress) -> Self {
        Self {
            transport: net.endpoint(mac),
        }
    }

    async fn send_available(&self, entity_id: UniqueIdentifier, adjust: impl FnOnce(&mut Adpdu)) {
        let mut adpdu = Adpdu::discover(entity_id);
        adpdu.message_type = AdpMessageType::EntityAvailable;
        adpdu.valid_time_seconds = 10;
        adpdu.entity_model_id = UniqueIdentifier::new(0xAA);
        adjust(&mut adpdu);
        self.send_adp(&adpdu).await;
    }

    async fn send_departing(&self, entity_id: UniqueIdentifier) {
        let mut adpdu = Adpdu::discover(entity_id);
        adpdu.message_type = AdpMessageType::EntityDeparting;
        self.send_adp(&adpdu).await;
    }

    async fn send_adp(&self, adpdu: &Adpdu) {
        let mut frame = vec![0u8; EthernetHeader::LEN + ADPDU_LEN];
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(MacAddress::AVDECC_MULTICAST, self.transport.mac())
            .encode(&mut w)
            .unwrap();
        adpdu.encode(&mut w).unwrap();
        self.transport.send(&frame).await.unwrap();
    }

    /// Receives frames until one is an AECP PDU, returning header and
    /// payload bytes.
    async fn recv_aecp(&self) -> (AecpHeader, Vec<u8>) {
        let mut buf = [0u8; 1600];
        loop {
            let (len, _at) = timeout(Duration::from_secs(120), self.transport.recv(&mut buf))
                .await
                .expect("timed out waiting for a frame")
                .expect("virtual link closed");
            let mut r = Reader::new(&buf[..len]);
            if EthernetHeader::decode_avtp(&mut r).is_err() {
                continue;
            }
            if r.peek_u8() != Ok(SUBTYPE_AECP) {
                continue;
            }
            let header = AecpHeader::decode(&mut r).expect("well-formed aecp from engine");
            let payload = r
                .read_exact(header.payload_len().unwrap())
                .expect("complete payload")
                .to_vec();
            return (header, payload);
        }
    }
}

// S1: birth, silent refresh, update, and timeout of a discovered entity.
#[tokio::test(start_paused = true)]
async fn discovery_birth_refresh_update_and_timeout() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();
    let peer = RawPeer::new(&net, TARGET_MAC);

    peer.send_available(TARGET_ID, |_| {}).await;
    match next_event(&mut events).await {
        ControllerEvent::EntityOnline(entity) => {
            assert_eq!(entity.entity_id, TARGET_ID);
            assert_eq!(entity.entity_model_id, UniqueIdentifier::new(0xAA));
            assert_eq!(entity.mac, TARGET_MAC);
        }
        other => panic!("expected online, got {other:?}"),
    }

    // An identical advertisement must not produce an event; prove it by
    // making the next observable event the gptp update that follows.
    peer.send_available(TARGET_ID, |adp| adp.available_index = 1).await;
    peer.send_available(TARGET_ID, |adp| {
        adp.available_index = 2;
        adp.gptp_grandmaster_id = UniqueIdentifier::new(0xBEEF);
    })
    .await;
    match next_event(&mut events).await {
        ControllerEvent::EntityUpdated(entity) => {
            assert_eq!(entity.gptp_grandmaster_id, UniqueIdentifier::new(0xBEEF));
        }
        other => panic!("expected the update, got {other:?}"),
    }

    // valid_time is 10 s; with no refresh the sweep reports the entity gone
    // shortly after the 20 s availability window.
    let before = Instant::now();
    match next_event(&mut events).await {
        ControllerEvent::EntityOffline(entity_id) => assert_eq!(entity_id, TARGET_ID),
        other => panic!("expected offline, got {other:?}"),
    }
    let waited = Instant::now() - before;
    assert!(waited >= Duration::from_secs(19), "swept too early: {waited:?}");
    assert!(waited <= Duration::from_secs(22), "swept too late: {waited:?}");
    assert!(controller.discovered_entity(TARGET_ID).await.is_none());
}

// S2: a full AEM round trip against a responding entity.
#[tokio::test(start_paused = true)]
async fn aem_acquire_round_trip() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();
    let sim = start_simulator(&net, SimulatedEntityConfig::new(TARGET_ID), TARGET_MAC);
    sim.advertise().await.unwrap();
    wait_online(&mut events, TARGET_ID).await;

    let result = controller
        .acquire_entity(TARGET_ID, false, DescriptorRef::new(DescriptorType::Entity, 0))
        .await
        .unwrap();
    assert_eq!(result.status, AemStatus::Success);
    assert_eq!(result.owning_entity, Some(CONTROLLER_ID));
    assert_eq!(
        result.descriptor,
        Some(DescriptorRef::new(DescriptorType::Entity, 0))
    );
}

// Commands to unknown targets fail synchronously.
#[tokio::test(start_paused = true)]
async fn command_to_unknown_entity_fails_at_issue() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);

    let err = controller
        .query_entity_available(UniqueIdentifier::new(0xDEAD))
        .await
        .unwrap_err();
    assert_eq!(err, Error::UnknownRemoteEntity);
}

// S3: one retransmission with the same sequence id, then TimedOut.
#[tokio::test(start_paused = true)]
async fn aem_timeout_retries_once_then_fails() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();
    let peer = RawPeer::new(&net, TARGET_MAC);

    peer.send_available(TARGET_ID, |_| {}).await;
    wait_online(&mut events, TARGET_ID).await;

    let issued_at = Instant::now();
    let call = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.query_entity_available(TARGET_ID).await })
    };

    let (first, first_payload) = peer.recv_aecp().await;
    assert_eq!(first.message_type, AecpMessageType::AemCommand);
    assert_eq!(first.sequence_id, 0); // first command to a fresh target
    assert_eq!(first.controller_entity_id, CONTROLLER_ID);

    let (second, second_payload) = peer.recv_aecp().await;
    assert_eq!(second.sequence_id, first.sequence_id); // same PDU re-sent
    assert_eq!(second_payload, first_payload);
    let first_deadline = Instant::now() - issued_at;
    assert!(
        first_deadline >= Duration::from_millis(250) && first_deadline < Duration::from_millis(400),
        "retransmit at {first_deadline:?}"
    );

    let status = call.await.unwrap().unwrap();
    assert_eq!(status, AemStatus::TimedOut);
    let total = Instant::now() - issued_at;
    assert!(
        total >= Duration::from_millis(500) && total < Duration::from_millis(700),
        "gave up at {total:?}"
    );
}

// S4: departure cancels the in-flight command and the queued one, in issue
// order, without the queued command ever reaching the wire.
#[tokio::test(start_paused = true)]
async fn departure_cancels_pending_commands_in_order() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();
    let peer = RawPeer::new(&net, TARGET_MAC);

    peer.send_available(TARGET_ID, |_| {}).await;
    wait_online(&mut events, TARGET_ID).await;

    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let first = {
        let controller = Arc::clone(&controller);
        let order = Arc::clone(&order);
        tokio::spawn(async move {
            let status = controller.query_entity_available(TARGET_ID).await.unwrap();
            order.lock().unwrap().push("first");
            status
        })
    };
    // Wait until the first command is on the wire, then queue the second.
    let (header, _) = peer.recv_aecp().await;
    assert_eq!(header.sequence_id, 0);
    let second = {
        let controller = Arc::clone(&controller);
        let order = Arc::clone(&order);
        tokio::spawn(async move {
            let result = controller.get_configuration(TARGET_ID).await.unwrap();
            order.lock().unwrap().push("second");
            result.status
        })
    };
    // Let the second command reach the per-target queue.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    peer.send_departing(TARGET_ID).await;

    assert_eq!(first.await.unwrap(), AemStatus::UnknownEntity);
    assert_eq!(second.await.unwrap(), AemStatus::UnknownEntity);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);

    match next_event(&mut events).await {
        ControllerEvent::EntityOffline(entity_id) => assert_eq!(entity_id, TARGET_ID),
        other => panic!("expected offline, got {other:?}"),
    }
}

// S5: connecting a stream through the listener.
#[tokio::test(start_paused = true)]
async fn acmp_connect_stream() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();

    let talker_id = UniqueIdentifier::new(0x0011_0000_0000_007A);
    let listener_id = UniqueIdentifier::new(0x0011_0000_0000_0015);
    let talker = start_simulator(
        &net,
        SimulatedEntityConfig::new(talker_id),
        MacAddress([0x02, 0xAA, 0, 0, 0, 0x7A]),
    );
    let listener = start_simulator(
        &net,
        SimulatedEntityConfig::new(listener_id),
        MacAddress([0x02, 0xAA, 0, 0, 0, 0x15]),
    );
    talker.advertise().await.unwrap();
    listener.advertise().await.unwrap();
    wait_online(&mut events, talker_id).await;

    let result = controller
        .connect_stream(
            StreamIdentification::new(talker_id, 0),
            StreamIdentification::new(listener_id, 0),
        )
        .await
        .unwrap();
    assert_eq!(result.status, AcmpStatus::Success);
    assert_eq!(result.connection_count, 1);
    assert_eq!(result.talker_stream, StreamIdentification::new(talker_id, 0));
    assert_eq!(
        result.listener_stream,
        StreamIdentification::new(listener_id, 0)
    );
    assert!(!result.stream_dest_mac.is_unset());
}

// ACMP without a responder surfaces TimedOut after 500 ms, no retry.
#[tokio::test(start_paused = true)]
async fn acmp_times_out_without_retry() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);

    let issued_at = Instant::now();
    let result = controller
        .get_talker_stream_state(StreamIdentification::new(UniqueIdentifier::new(0x7A), 0))
        .await
        .unwrap();
    assert_eq!(result.status, AcmpStatus::TimedOut);
    let waited = Instant::now() - issued_at;
    assert!(
        waited >= Duration::from_millis(500) && waited < Duration::from_millis(700),
        "acmp gave up at {waited:?}"
    );
}

// S6: an unsolicited CONFIGURATION_CHANGED notification reaches observers
// and completes no transaction.
#[tokio::test(start_paused = true)]
async fn unsolicited_notification_is_delivered() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();
    let sim = start_simulator(&net, SimulatedEntityConfig::new(TARGET_ID), TARGET_MAC);
    sim.advertise().await.unwrap();
    wait_online(&mut events, TARGET_ID).await;

    let status = controller
        .register_unsolicited_notifications(TARGET_ID)
        .await
        .unwrap();
    assert_eq!(status, AemStatus::Success);

    sim.notify_configuration_changed(3).await.unwrap();

    match next_event(&mut events).await {
        ControllerEvent::Unsolicited(AemNotification::ConfigurationChanged {
            entity_id,
            configuration_index,
        }) => {
            assert_eq!(entity_id, TARGET_ID);
            assert_eq!(configuration_index, 3);
        }
        other => panic!("expected configuration change, got {other:?}"),
    }

    // The engine is still fully operational afterwards.
    let result = controller.get_configuration(TARGET_ID).await.unwrap();
    assert_eq!(result.status, AemStatus::Success);
    assert_eq!(result.configuration_index, Some(3));
}

// Sniffed ACMP traffic from other controllers reaches observers.
#[tokio::test(start_paused = true)]
async fn foreign_acmp_traffic_is_sniffed() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();

    let other_controller = UniqueIdentifier::new(0x0099_AABB_CCDD_0099);
    let peer = RawPeer::new(&net, MacAddress([0x02, 0xDD, 0, 0, 0, 0x99]));
    let mut acmpdu = avdecc_core::acmpdu::Acmpdu::command(
        avdecc_core::acmpdu::AcmpMessageType::ConnectRxCommand,
        other_controller,
        7,
    );
    acmpdu.talker_entity_id = UniqueIdentifier::new(0x7A);
    acmpdu.listener_entity_id = UniqueIdentifier::new(0x15);
    let mut frame = vec![0u8; EthernetHeader::LEN + avdecc_core::acmpdu::ACMPDU_LEN];
    {
        let mut w = Writer::new(&mut frame);
        EthernetHeader::avtp(MacAddress::AVDECC_MULTICAST, peer.transport.mac())
            .encode(&mut w)
            .unwrap();
        acmpdu.encode(&mut w).unwrap();
    }
    peer.transport.send(&frame).await.unwrap();

    match next_event(&mut events).await {
        ControllerEvent::AcmpSniffedCommand(sniffed) => {
            assert_eq!(sniffed.controller_entity_id, other_controller);
            assert_eq!(sniffed.sequence_id, 7);
        }
        other => panic!("expected sniffed command, got {other:?}"),
    }
}

// Advertising: immediate AVAILABLE, answers to DISCOVER, DEPARTING on stop.
#[tokio::test(start_paused = true)]
async fn local_advertising_lifecycle() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let peer = RawPeer::new(&net, TARGET_MAC);

    controller.enable_entity_advertising(62).await.unwrap();
    let adpdu = recv_adp(&peer).await;
    assert_eq!(adpdu.message_type, AdpMessageType::EntityAvailable);
    assert_eq!(adpdu.entity_id, CONTROLLER_ID);
    assert_eq!(adpdu.valid_time_seconds, 62);
    let first_index = adpdu.available_index;

    // A targeted DISCOVER gets an immediate answer.
    peer.send_adp(&Adpdu::discover(CONTROLLER_ID)).await;
    let reply = recv_adp(&peer).await;
    assert_eq!(reply.message_type, AdpMessageType::EntityAvailable);

    // A data change bumps available_index and re-advertises.
    controller
        .set_gptp_info(UniqueIdentifier::new(0xF00D), 1)
        .await
        .unwrap();
    let updated = loop {
        let adpdu = recv_adp(&peer).await;
        if adpdu.gptp_grandmaster_id == UniqueIdentifier::new(0xF00D) {
            break adpdu;
        }
    };
    assert!(updated.available_index > first_index);

    controller.disable_entity_advertising().await.unwrap();
    let departing = loop {
        let adpdu = recv_adp(&peer).await;
        if adpdu.message_type == AdpMessageType::EntityDeparting {
            break adpdu;
        }
    };
    assert_eq!(departing.entity_id, CONTROLLER_ID);
}

// Transport loss cancels pending work and poisons the controller.
#[tokio::test(start_paused = true)]
async fn transport_failure_is_terminal() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();
    let peer = RawPeer::new(&net, TARGET_MAC);

    peer.send_available(TARGET_ID, |_| {}).await;
    wait_online(&mut events, TARGET_ID).await;

    let pending = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.query_entity_available(TARGET_ID).await })
    };
    peer.recv_aecp().await; // the command is in flight

    net.unplug(CONTROLLER_MAC);

    assert_eq!(pending.await.unwrap().unwrap(), AemStatus::NetworkError);
    loop {
        match next_event(&mut events).await {
            ControllerEvent::TransportError => break,
            _ => continue,
        }
    }
    let err = controller
        .query_entity_available(TARGET_ID)
        .await
        .unwrap_err();
    assert_eq!(err, Error::TransportError);
}

// Shutdown cancels pending transactions with InternalError.
#[tokio::test(start_paused = true)]
async fn shutdown_cancels_with_internal_error() {
    let net = VirtualNetwork::new();
    let controller = start_controller(&net);
    let mut events = controller.events();
    let peer = RawPeer::new(&net, TARGET_MAC);

    peer.send_available(TARGET_ID, |_| {}).await;
    wait_online(&mut events, TARGET_ID).await;

    let pending = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.query_entity_available(TARGET_ID).await })
    };
    peer.recv_aecp().await;

    controller.shutdown().await;
    assert_eq!(pending.await.unwrap().unwrap(), AemStatus::InternalError);

    let err = controller
        .query_entity_available(TARGET_ID)
        .await
        .unwrap_err();
    assert_eq!(err, Error::InternalError);
}

async fn recv_adp(peer: &RawPeer) -> Adpdu {
    let mut buf = [0u8; 1600];
    loop {
        let (len, _at) = timeout(Duration::from_secs(120), peer.transport.recv(&mut buf))
            .await
            .expect("timed out waiting for adp")
            .expect("virtual link closed");
        let mut r = Reader::new(&buf[..len]);
        if EthernetHeader::decode_avtp(&mut r).is_err() {
            continue;
        }
        if r.peek_u8() == Ok(avdecc_core::ethernet::SUBTYPE_ADP) {
            if let Ok(adpdu) = Adpdu::decode(&mut r) {
                return adpdu;
            }
        }
    }
}
