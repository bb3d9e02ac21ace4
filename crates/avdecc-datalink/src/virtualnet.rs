//! In-process virtual Ethernet segment.
//!
//! [`VirtualNetwork`] is a hub: every endpoint created from it receives the
//! frames the others send, subject to destination-MAC filtering. It backs
//! the integration tests and the entity simulator, and doubles as the
//! "virtual" protocol interface for running several engines in one process
//! without touching hardware.

use crate::{DataLink, DataLinkError};
use avdecc_core::ethernet::{EthernetHeader, MacAddress};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Frames above this size are rejected, matching real MTU-limited links.
const MAX_FRAME_LEN: usize = 1522;

struct Port {
    mac: MacAddress,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[derive(Default)]
struct Segment {
    ports: Vec<Port>,
    next_interface_index: u16,
}

/// A shared virtual Ethernet segment.
#[derive(Clone, Default)]
pub struct VirtualNetwork {
    segment: Arc<Mutex<Segment>>,
}

impl VirtualNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new endpoint with the given MAC address.
    pub fn endpoint(&self, mac: MacAddress) -> VirtualTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut segment = self.segment.lock().expect("virtual segment poisoned");
        segment.next_interface_index += 1;
        let interface_index = segment.next_interface_index;
        segment.ports.push(Port { mac, tx });
        VirtualTransport {
            mac,
            interface_index,
            segment: Arc::clone(&self.segment),
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Detaches the endpoint with the given MAC. Its pending `recv` calls
    /// fail with [`DataLinkError::Closed`], simulating fatal interface loss.
    pub fn unplug(&self, mac: MacAddress) {
        let mut segment = self.segment.lock().expect("virtual segment poisoned");
        segment.ports.retain(|port| port.mac != mac);
    }
}

/// One endpoint on a [`VirtualNetwork`].
pub struct VirtualTransport {
    mac: MacAddress,
    interface_index: u16,
    segment: Arc<Mutex<Segment>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl DataLink for VirtualTransport {
    async fn send(&self, frame: &[u8]) -> Result<(), DataLinkError> {
        if frame.len() > MAX_FRAME_LEN {
            return Err(DataLinkError::FrameTooLarge);
        }
        if frame.len() < EthernetHeader::LEN {
            return Err(DataLinkError::InvalidFrame);
        }
        let mut dest = [0u8; 6];
        dest.copy_from_slice(&frame[..6]);
        let dest = MacAddress(dest);

        let segment = self.segment.lock().expect("virtual segment poisoned");
        if !segment.ports.iter().any(|port| port.mac == self.mac) {
            return Err(DataLinkError::Closed);
        }
        for port in &segment.ports {
            if port.mac == self.mac {
                continue;
            }
            if dest.is_multicast() || port.mac == dest {
                let _ = port.tx.send(frame.to_vec());
            }
        }
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, Instant), DataLinkError> {
        let mut rx = self.rx.lock().await;
        let frame = rx.recv().await.ok_or(DataLinkError::Closed)?;
        if frame.len() > buf.len() {
            return Err(DataLinkError::FrameTooLarge);
        }
        buf[..frame.len()].copy_from_slice(&frame);
        Ok((frame.len(), Instant::now()))
    }

    fn mac(&self) -> MacAddress {
        self.mac
    }

    fn interface_index(&self) -> u16 {
        self.interface_index
    }
}

#[cfg(test)]
mod tests {
    use super::VirtualNetwork;
    use crate::{DataLink, DataLinkError};
    use avdecc_core::ethernet::MacAddress;

    const MAC_A: MacAddress = MacAddress([0x02, 0, 0, 0, 0, 0xA]);
    const MAC_B: MacAddress = MacAddress([0x02, 0, 0, 0, 0, 0xB]);
    const MAC_C: MacAddress = MacAddress([0x02, 0, 0, 0, 0, 0xC]);

    fn frame_to(dest: MacAddress) -> Vec<u8> {
        let mut frame = vec![0u8; 20];
        frame[..6].copy_from_slice(&dest.raw());
        frame[12] = 0x22;
        frame[13] = 0xF0;
        frame
    }

    #[tokio::test]
    async fn unicast_reaches_only_the_addressee() {
        let net = VirtualNetwork::new();
        let a = net.endpoint(MAC_A);
        let b = net.endpoint(MAC_B);
        let c = net.endpoint(MAC_C);

        a.send(&frame_to(MAC_B)).await.unwrap();
        a.send(&frame_to(MAC_C)).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = b.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..6], &MAC_B.raw());
        assert_eq!(n, 20);
        let (_, _) = c.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..6], &MAC_C.raw());
    }

    #[tokio::test]
    async fn multicast_fans_out_but_skips_the_sender() {
        let net = VirtualNetwork::new();
        let a = net.endpoint(MAC_A);
        let b = net.endpoint(MAC_B);

        a.send(&frame_to(MacAddress::AVDECC_MULTICAST))
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        b.recv(&mut buf).await.unwrap();
        // The sender must not hear its own multicast.
        a.send(&frame_to(MAC_B)).await.unwrap();
        let (_, _) = b.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..6], &MAC_B.raw());
    }

    #[tokio::test]
    async fn unplug_fails_pending_receives() {
        let net = VirtualNetwork::new();
        let a = net.endpoint(MAC_A);
        net.unplug(MAC_A);

        let mut buf = [0u8; 64];
        assert!(matches!(
            a.recv(&mut buf).await.unwrap_err(),
            DataLinkError::Closed
        ));
        assert!(matches!(
            a.send(&frame_to(MAC_B)).await.unwrap_err(),
            DataLinkError::Closed
        ));
    }
}
