//! PCAP capture via a [`DataLink`](crate::DataLink) wrapper.
//!
//! [`CapturingDataLink`] wraps any transport and appends every sent and
//! received frame to a PCAP file for offline analysis (Wireshark dissects
//! IEEE 1722.1 natively).

use crate::{DataLink, DataLinkError};
use avdecc_core::ethernet::MacAddress;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Frames here are full Ethernet frames, so the standard link type applies.
const PCAP_LINK_TYPE_ETHERNET: u32 = 1;
const PCAP_MAGIC: u32 = 0xa1b2c3d4;
const PCAP_VERSION_MAJOR: u16 = 2;
const PCAP_VERSION_MINOR: u16 = 4;
const PCAP_MAX_SNAPLEN: u32 = 65535;

/// A PCAP writer that writes the global header once and appends packet
/// records.
struct PcapWriter<W: Write + Send> {
    inner: W,
}

impl<W: Write + Send> PcapWriter<W> {
    fn new(mut writer: W) -> io::Result<Self> {
        writer.write_all(&PCAP_MAGIC.to_le_bytes())?;
        writer.write_all(&PCAP_VERSION_MAJOR.to_le_bytes())?;
        writer.write_all(&PCAP_VERSION_MINOR.to_le_bytes())?;
        writer.write_all(&0i32.to_le_bytes())?; // thiszone
        writer.write_all(&0u32.to_le_bytes())?; // sigfigs
        writer.write_all(&PCAP_MAX_SNAPLEN.to_le_bytes())?;
        writer.write_all(&PCAP_LINK_TYPE_ETHERNET.to_le_bytes())?;
        writer.flush()?;
        Ok(Self { inner: writer })
    }

    fn write_packet(&mut self, data: &[u8]) -> io::Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let ts_sec = now.as_secs() as u32;
        let ts_usec = now.subsec_micros();
        let len = data.len() as u32;

        self.inner.write_all(&ts_sec.to_le_bytes())?;
        self.inner.write_all(&ts_usec.to_le_bytes())?;
        self.inner.write_all(&len.to_le_bytes())?; // incl_len
        self.inner.write_all(&len.to_le_bytes())?; // orig_len
        self.inner.write_all(data)?;
        self.inner.flush()
    }
}

/// A [`DataLink`] wrapper that captures all frames to a PCAP file.
///
/// ```no_run
/// # use avdecc_datalink::capture::CapturingDataLink;
/// # use avdecc_datalink::RawEthernetTransport;
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = RawEthernetTransport::open("eth0")?;
/// let capturing = CapturingDataLink::to_file(transport, "avdecc.pcap")?;
/// // Use `capturing` as the controller's datalink — all traffic is logged.
/// # Ok(())
/// # }
/// ```
pub struct CapturingDataLink<D: DataLink> {
    inner: D,
    writer: Arc<Mutex<PcapWriter<io::BufWriter<std::fs::File>>>>,
}

impl<D: DataLink> CapturingDataLink<D> {
    /// Wraps `inner`, writing frames to the given file path.
    pub fn to_file(inner: D, path: impl AsRef<std::path::Path>) -> io::Result<Self> {
        let file = std::fs::File::create(path)?;
        let pcap = PcapWriter::new(io::BufWriter::new(file))?;
        Ok(Self {
            inner,
            writer: Arc::new(Mutex::new(pcap)),
        })
    }
}

impl<D: DataLink> DataLink for CapturingDataLink<D> {
    async fn send(&self, frame: &[u8]) -> Result<(), DataLinkError> {
        {
            let mut w = self.writer.lock().await;
            let _ = w.write_packet(frame);
        }
        self.inner.send(frame).await
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, Instant), DataLinkError> {
        let (n, at) = self.inner.recv(buf).await?;
        {
            let mut w = self.writer.lock().await;
            let _ = w.write_packet(&buf[..n]);
        }
        Ok((n, at))
    }

    fn mac(&self) -> MacAddress {
        self.inner.mac()
    }

    fn interface_index(&self) -> u16 {
        self.inner.interface_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcap_global_header_format() {
        let mut buf = Vec::new();
        let _writer = PcapWriter::new(&mut buf).unwrap();
        assert_eq!(buf.len(), 24); // PCAP global header is 24 bytes
        assert_eq!(
            u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            PCAP_MAGIC
        );
        assert_eq!(
            u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
            PCAP_LINK_TYPE_ETHERNET
        );
    }

    #[test]
    fn pcap_write_packet() {
        let mut buf = Vec::new();
        let mut writer = PcapWriter::new(&mut buf).unwrap();
        writer.write_packet(&[0x01, 0x02, 0x03]).unwrap();
        // 24 (header) + 16 (packet header) + 3 (data) = 43
        assert_eq!(buf.len(), 43);
    }
}
