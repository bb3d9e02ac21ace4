//! Typed ACMP operations.
//!
//! Connection management is brokered through the listener for RX commands
//! and the talker for TX commands; all ACMP traffic is multicast and the
//! matching response carries the resulting connection state.

use crate::acmp::AcmpOutcome;
use crate::controller::Controller;
use crate::error::Error;
use avdecc_core::acmpdu::{AcmpMessageType, Acmpdu};
use avdecc_core::ethernet::MacAddress;
use avdecc_core::status::AcmpStatus;
use avdecc_core::types::{ConnectionFlags, StreamIdentification, UniqueIdentifier};
use avdecc_datalink::DataLink;

/// Outcome of a connection-management operation.
#[derive(Debug, Clone)]
pub struct StreamConnectionResult {
    pub status: AcmpStatus,
    pub talker_stream: StreamIdentification,
    pub listener_stream: StreamIdentification,
    pub connection_count: u16,
    pub flags: ConnectionFlags,
    pub stream_id: UniqueIdentifier,
    pub stream_dest_mac: MacAddress,
    pub stream_vlan_id: u16,
}

impl StreamConnectionResult {
    fn from_response(status: AcmpStatus, response: &Acmpdu) -> Self {
        Self {
            status,
            talker_stream: response.talker_stream(),
            listener_stream: response.listener_stream(),
            connection_count: response.connection_count,
            flags: response.flags,
            stream_id: response.stream_id,
            stream_dest_mac: response.stream_dest_mac,
            stream_vlan_id: response.stream_vlan_id,
        }
    }

    fn from_fault(
        status: AcmpStatus,
        talker_stream: StreamIdentification,
        listener_stream: StreamIdentification,
    ) -> Self {
        Self {
            status,
            talker_stream,
            listener_stream,
            connection_count: 0,
            flags: ConnectionFlags::NONE,
            stream_id: UniqueIdentifier::NULL,
            stream_dest_mac: MacAddress::UNSET,
            stream_vlan_id: 0,
        }
    }
}

impl<D: DataLink + 'static> Controller<D> {
    /// CONNECT_RX: ask the listener to establish a stream from the talker.
    pub async fn connect_stream(
        &self,
        talker_stream: StreamIdentification,
        listener_stream: StreamIdentification,
    ) -> Result<StreamConnectionResult, Error> {
        self.stream_command(
            AcmpMessageType::ConnectRxCommand,
            listener_stream.entity_id,
            talker_stream,
            listener_stream,
        )
        .await
    }

    /// DISCONNECT_RX: ask the listener to tear the stream down.
    pub async fn disconnect_stream(
        &self,
        talker_stream: StreamIdentification,
        listener_stream: StreamIdentification,
    ) -> Result<StreamConnectionResult, Error> {
        self.stream_command(
            AcmpMessageType::DisconnectRxCommand,
            listener_stream.entity_id,
            talker_stream,
            listener_stream,
        )
        .await
    }

    /// DISCONNECT_TX: tell the talker directly that a listener is gone,
    /// for cleaning up after a vanished listener.
    pub async fn disconnect_talker_stream(
        &self,
        talker_stream: StreamIdentification,
        listener_stream: StreamIdentification,
    ) -> Result<StreamConnectionResult, Error> {
        self.stream_command(
            AcmpMessageType::DisconnectTxCommand,
            talker_stream.entity_id,
            talker_stream,
            listener_stream,
        )
        .await
    }

    /// GET_TX_STATE: the talker's view of one of its output streams.
    pub async fn get_talker_stream_state(
        &self,
        talker_stream: StreamIdentification,
    ) -> Result<StreamConnectionResult, Error> {
        self.stream_command(
            AcmpMessageType::GetTxStateCommand,
            talker_stream.entity_id,
            talker_stream,
            StreamIdentification::new(UniqueIdentifier::NULL, 0),
        )
        .await
    }

    /// GET_RX_STATE: the listener's view of one of its input streams.
    pub async fn get_listener_stream_state(
        &self,
        listener_stream: StreamIdentification,
    ) -> Result<StreamConnectionResult, Error> {
        self.stream_command(
            AcmpMessageType::GetRxStateCommand,
            listener_stream.entity_id,
            StreamIdentification::new(UniqueIdentifier::NULL, 0),
            listener_stream,
        )
        .await
    }

    /// GET_TX_CONNECTION: enumerate a talker stream's connections by index.
    pub async fn get_talker_stream_connection(
        &self,
        talker_stream: StreamIdentification,
        connection_index: u16,
    ) -> Result<StreamConnectionResult, Error> {
        let talker = talker_stream;
        let outcome = self
            .shared()
            .acmp_command(
                AcmpMessageType::GetTxConnectionCommand,
                talker.entity_id,
                move |acmpdu| {
                    acmpdu.talker_entity_id = talker.entity_id;
                    acmpdu.talker_unique_id = talker.stream_index;
                    // The connection_count field carries the queried index.
                    acmpdu.connection_count = connection_index;
                },
            )
            .await?;
        Ok(stream_result(
            outcome,
            talker,
            StreamIdentification::new(UniqueIdentifier::NULL, 0),
        ))
    }

    async fn stream_command(
        &self,
        message_type: AcmpMessageType,
        addressed: UniqueIdentifier,
        talker_stream: StreamIdentification,
        listener_stream: StreamIdentification,
    ) -> Result<StreamConnectionResult, Error> {
        let outcome = self
            .shared()
            .acmp_command(message_type, addressed, move |acmpdu| {
                acmpdu.talker_entity_id = talker_stream.entity_id;
                acmpdu.talker_unique_id = talker_stream.stream_index;
                acmpdu.listener_entity_id = listener_stream.entity_id;
                acmpdu.listener_unique_id = listener_stream.stream_index;
            })
            .await?;
        Ok(stream_result(outcome, talker_stream, listener_stream))
    }
}

fn stream_result(
    outcome: AcmpOutcome,
    talker_stream: StreamIdentification,
    listener_stream: StreamIdentification,
) -> StreamConnectionResult {
    match outcome {
        AcmpOutcome::Wire(response) => StreamConnectionResult::from_response(
            AcmpStatus::from_wire(response.status),
            &response,
        ),
        AcmpOutcome::Fault(fault) => StreamConnectionResult::from_fault(
            AcmpStatus::from_fault(fault),
            talker_stream,
            listener_stream,
        ),
    }
}
