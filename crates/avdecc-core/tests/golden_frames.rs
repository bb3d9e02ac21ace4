//! Byte-exact frame fixtures, checked against hand-assembled wire images.

use avdecc_core::acmpdu::{AcmpMessageType, Acmpdu, ACMPDU_LEN};
use avdecc_core::adpdu::{AdpMessageType, Adpdu, ADPDU_LEN};
use avdecc_core::aecpdu::{AecpHeader, AecpMessageType, AemCommandType, AemEnvelope};
use avdecc_core::aem::acquire_entity::AcquireEntityPayload;
use avdecc_core::aem::DescriptorRef;
use avdecc_core::encoding::{Reader, Writer};
use avdecc_core::ethernet::{EthernetHeader, MacAddress};
use avdecc_core::types::{DescriptorType, UniqueIdentifier};

const CONTROLLER_MAC: MacAddress = MacAddress([0x02, 0xAA, 0x00, 0x00, 0x00, 0x01]);
const TARGET_MAC: MacAddress = MacAddress([0x02, 0xBB, 0x00, 0x00, 0x00, 0x02]);

#[test]
fn adp_global_discover_frame_matches_fixture() {
    let mut buf = [0u8; EthernetHeader::LEN + ADPDU_LEN];
    let mut w = Writer::new(&mut buf);
    EthernetHeader::avtp(MacAddress::AVDECC_MULTICAST, CONTROLLER_MAC)
        .encode(&mut w)
        .unwrap();
    Adpdu::discover(UniqueIdentifier::NULL)
        .encode(&mut w)
        .unwrap();

    let mut expected = [0u8; 82];
    expected[..14].copy_from_slice(&[
        0x91, 0xE0, 0xF0, 0x01, 0x00, 0x00, // AVDECC multicast
        0x02, 0xAA, 0x00, 0x00, 0x00, 0x01, // controller
        0x22, 0xF0, // AVTP EtherType
    ]);
    expected[14] = 0xFA; // ADP subtype, control bit set
    expected[15] = 0x02; // ENTITY_DISCOVER
    expected[16] = 0x00; // valid_time 0,
    expected[17] = 0x38; // control_data_length 56
    // entity_id and the whole advertisement body stay zero

    assert_eq!(w.as_written(), &expected[..]);
}

#[test]
fn adp_available_frame_round_trips_through_bytes() {
    let mut adp = Adpdu::discover(UniqueIdentifier::NULL);
    adp.message_type = AdpMessageType::EntityAvailable;
    adp.valid_time_seconds = 10;
    adp.entity_id = UniqueIdentifier::new(0x0011_0000_0000_0001);
    adp.entity_model_id = UniqueIdentifier::new(0xAA);
    adp.available_index = 3;

    let mut buf = [0u8; ADPDU_LEN];
    let mut w = Writer::new(&mut buf);
    adp.encode(&mut w).unwrap();

    // valid_time 10 s = 5 wire units in the top 5 bits of the third octet.
    assert_eq!(buf[2], 5 << 3);
    assert_eq!(buf[3], 56);
    assert_eq!(&buf[4..12], &0x0011_0000_0000_0001u64.to_be_bytes());

    let mut r = Reader::new(&buf);
    assert_eq!(Adpdu::decode(&mut r).unwrap(), adp);
}

#[test]
fn aem_acquire_entity_frame_matches_fixture() {
    let target = UniqueIdentifier::new(0x0011_2233_4455_6677);
    let controller = UniqueIdentifier::new(0x0099_AABB_CCDD_EEFF);

    let mut buf = [0u8; 128];
    let mut w = Writer::new(&mut buf);
    EthernetHeader::avtp(TARGET_MAC, CONTROLLER_MAC)
        .encode(&mut w)
        .unwrap();
    AecpHeader::command(AecpMessageType::AemCommand, target, controller, 0)
        .encode(&mut w, AemEnvelope::LEN + AcquireEntityPayload::LEN)
        .unwrap();
    AemEnvelope::command(AemCommandType::AcquireEntity)
        .encode(&mut w)
        .unwrap();
    AcquireEntityPayload::acquire(false, DescriptorRef::new(DescriptorType::Entity, 0))
        .encode(&mut w)
        .unwrap();

    let expected: [u8; 46] = [
        0x02, 0xBB, 0x00, 0x00, 0x00, 0x02, // target MAC
        0x02, 0xAA, 0x00, 0x00, 0x00, 0x01, // controller MAC
        0x22, 0xF0, // EtherType
        0xFB, 0x00, // AECP subtype, AEM_COMMAND
        0x00, 0x1C, // status 0, control_data_length 28
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, // target id
        0x00, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, // controller id
        0x00, 0x00, // sequence 0
        0x00, 0x00, // u=0, ACQUIRE_ENTITY
        0x00, 0x00, 0x00, 0x00, // flags: not persistent
        0x00, 0x00, 0x00, 0x00, // owner id (hi)
    ];
    assert_eq!(&w.as_written()[..46], &expected[..]);
    assert_eq!(w.as_written().len(), 14 + 12 + 10 + 2 + 16);
}

#[test]
fn acmp_connect_rx_frame_matches_fixture() {
    let mut acmp = Acmpdu::command(
        AcmpMessageType::ConnectRxCommand,
        UniqueIdentifier::new(0x0099_AABB_CCDD_EEFF),
        1,
    );
    acmp.talker_entity_id = UniqueIdentifier::new(0x0000_0000_0000_007A);
    acmp.listener_entity_id = UniqueIdentifier::new(0x0000_0000_0000_0015);

    let mut buf = [0u8; ACMPDU_LEN];
    let mut w = Writer::new(&mut buf);
    acmp.encode(&mut w).unwrap();

    assert_eq!(buf[0], 0xFC);
    assert_eq!(buf[1], 0x06); // CONNECT_RX_COMMAND
    assert_eq!(buf[2], 0x00);
    assert_eq!(buf[3], 44);
    assert_eq!(&buf[12..20], &0x0099_AABB_CCDD_EEFFu64.to_be_bytes());
    assert_eq!(buf[48], 0x00);
    assert_eq!(buf[49], 0x01); // sequence_id

    let mut r = Reader::new(&buf);
    assert_eq!(Acmpdu::decode(&mut r).unwrap(), acmp);
}

#[test]
fn decode_tolerates_ethernet_padding() {
    // Minimum-size Ethernet frames arrive padded; the AECP header's
    // control_data_length bounds the payload, not the buffer length.
    let target = UniqueIdentifier::new(0x01);
    let controller = UniqueIdentifier::new(0x02);

    let mut buf = [0u8; 60];
    let written = {
        let mut w = Writer::new(&mut buf);
        EthernetHeader::avtp(TARGET_MAC, CONTROLLER_MAC)
            .encode(&mut w)
            .unwrap();
        AecpHeader::command(AecpMessageType::AemCommand, target, controller, 5)
            .encode(&mut w, AemEnvelope::LEN)
            .unwrap();
        AemEnvelope::command(AemCommandType::EntityAvailable)
            .encode(&mut w)
            .unwrap();
        w.position()
    };
    assert!(written < buf.len()); // zero padding follows

    let mut r = Reader::new(&buf);
    EthernetHeader::decode_avtp(&mut r).unwrap();
    let header = AecpHeader::decode(&mut r).unwrap();
    assert_eq!(header.payload_len().unwrap(), AemEnvelope::LEN);
    let payload = r.read_exact(header.payload_len().unwrap()).unwrap();
    let mut pr = Reader::new(payload);
    let envelope = AemEnvelope::decode(&mut pr).unwrap();
    assert_eq!(envelope.command_type, AemCommandType::EntityAvailable);
}
