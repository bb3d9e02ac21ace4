use avdecc_core::ethernet::MacAddress;
use thiserror::Error;
use tokio::time::Instant;

/// Errors that can occur at the data-link layer.
#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("interface not found")]
    InterfaceNotFound,
    #[error("interface exists but cannot be used: {0}")]
    InterfaceInvalid(&'static str),
    #[error("interface type not supported")]
    InterfaceNotSupported,
    #[error("frame too large")]
    FrameTooLarge,
    #[error("invalid frame")]
    InvalidFrame,
    #[error("transport closed")]
    Closed,
}

/// Async trait for sending and receiving raw AVDECC Ethernet frames on one
/// network interface.
///
/// Implementors include [`RawEthernetTransport`](crate::RawEthernetTransport)
/// on Linux AF_PACKET sockets and [`VirtualTransport`](crate::VirtualTransport)
/// for in-process test networks. They deliver only frames with the AVTP
/// EtherType addressed to the local MAC or the AVDECC multicast groups.
pub trait DataLink: Send + Sync {
    /// Sends one complete Ethernet frame (header included).
    fn send(&self, frame: &[u8]) -> impl std::future::Future<Output = Result<(), DataLinkError>> + Send;

    /// Receives a frame into `buf`, returning its length and the receive
    /// timestamp.
    fn recv(&self, buf: &mut [u8]) -> impl std::future::Future<Output = Result<(usize, Instant), DataLinkError>> + Send;

    /// The MAC address of the bound interface.
    fn mac(&self) -> MacAddress;

    /// The OS interface index of the bound interface.
    fn interface_index(&self) -> u16;
}
