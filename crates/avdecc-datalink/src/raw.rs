//! AF_PACKET transport bound to one Ethernet interface.
//!
//! The socket is opened with the AVTP EtherType so the kernel filters
//! foreign traffic, joined to the AVDECC multicast groups, and bridged into
//! tokio through `AsyncFd`. Construction resolves the interface by name and
//! reports the specific failure (not found, no MAC, wrong type).

use crate::{DataLink, DataLinkError};
use avdecc_core::ethernet::{MacAddress, ETHERTYPE_AVTP};
use socket2::{Domain, Protocol, Socket, Type};
use std::ffi::CString;
use std::io;
use std::mem;
use std::os::fd::AsRawFd;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::time::Instant;

const MAX_FRAME_LEN: usize = 1522;

pub struct RawEthernetTransport {
    fd: AsyncFd<Socket>,
    mac: MacAddress,
    interface_index: u16,
}

impl RawEthernetTransport {
    /// Opens the named interface for AVDECC traffic.
    pub fn open(interface_name: &str) -> Result<Self, DataLinkError> {
        let name = CString::new(interface_name)
            .map_err(|_| DataLinkError::InterfaceInvalid("name contains NUL"))?;
        let if_index = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if if_index == 0 {
            return Err(DataLinkError::InterfaceNotFound);
        }
        if if_index > u32::from(u16::MAX) {
            return Err(DataLinkError::InterfaceNotSupported);
        }

        let protocol = Protocol::from(i32::from(ETHERTYPE_AVTP.to_be()));
        let socket = Socket::new(Domain::PACKET, Type::RAW, Some(protocol))?;
        socket.set_nonblocking(true)?;

        bind_to_interface(&socket, if_index)?;
        let mac = interface_mac(&socket, &name)?;
        if mac.is_unset() {
            // Loopback and tunnel devices have no hardware address.
            return Err(DataLinkError::InterfaceNotSupported);
        }
        join_multicast(&socket, if_index, MacAddress::AVDECC_MULTICAST)?;
        join_multicast(&socket, if_index, MacAddress::IDENTIFY_MULTICAST)?;

        Ok(Self {
            fd: AsyncFd::with_interest(socket, Interest::READABLE | Interest::WRITABLE)
                .map_err(DataLinkError::Io)?,
            mac,
            interface_index: if_index as u16,
        })
    }

    fn accepts(&self, frame: &[u8]) -> bool {
        if frame.len() < 14 {
            return false;
        }
        let mut dest = [0u8; 6];
        dest.copy_from_slice(&frame[..6]);
        let dest = MacAddress(dest);
        dest == self.mac || dest.is_multicast()
    }
}

impl DataLink for RawEthernetTransport {
    async fn send(&self, frame: &[u8]) -> Result<(), DataLinkError> {
        if frame.len() > MAX_FRAME_LEN {
            return Err(DataLinkError::FrameTooLarge);
        }
        loop {
            let mut guard = self.fd.writable().await?;
            let sent = guard.try_io(|inner| {
                let n = unsafe {
                    libc::send(
                        inner.get_ref().as_raw_fd(),
                        frame.as_ptr().cast(),
                        frame.len(),
                        0,
                    )
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            });
            match sent {
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(err)) => return Err(DataLinkError::Io(err)),
                Err(_would_block) => continue,
            }
        }
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, Instant), DataLinkError> {
        loop {
            let mut guard = self.fd.readable().await?;
            let received = guard.try_io(|inner| {
                let n = unsafe {
                    libc::recv(
                        inner.get_ref().as_raw_fd(),
                        buf.as_mut_ptr().cast(),
                        buf.len(),
                        0,
                    )
                };
                if n < 0 {
                    Err(io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            });
            match received {
                Ok(Ok(n)) => {
                    if self.accepts(&buf[..n]) {
                        return Ok((n, Instant::now()));
                    }
                    // Not for us; keep draining.
                }
                Ok(Err(err)) => return Err(DataLinkError::Io(err)),
                Err(_would_block) => continue,
            }
        }
    }

    fn mac(&self) -> MacAddress {
        self.mac
    }

    fn interface_index(&self) -> u16 {
        self.interface_index
    }
}

fn bind_to_interface(socket: &Socket, if_index: u32) -> Result<(), DataLinkError> {
    let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as libc::sa_family_t;
    addr.sll_protocol = ETHERTYPE_AVTP.to_be();
    addr.sll_ifindex = if_index as libc::c_int;

    let rc = unsafe {
        libc::bind(
            socket.as_raw_fd(),
            (&addr as *const libc::sockaddr_ll).cast(),
            mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(DataLinkError::Io(io::Error::last_os_error()));
    }
    Ok(())
}

fn interface_mac(socket: &Socket, name: &CString) -> Result<MacAddress, DataLinkError> {
    let mut req: libc::ifreq = unsafe { mem::zeroed() };
    let name_bytes = name.as_bytes_with_nul();
    if name_bytes.len() > req.ifr_name.len() {
        return Err(DataLinkError::InterfaceInvalid("interface name too long"));
    }
    for (dst, src) in req.ifr_name.iter_mut().zip(name_bytes) {
        *dst = *src as libc::c_char;
    }

    let rc = unsafe { libc::ioctl(socket.as_raw_fd(), libc::SIOCGIFHWADDR, &mut req) };
    if rc != 0 {
        return Err(DataLinkError::Io(io::Error::last_os_error()));
    }
    let hwaddr = unsafe { req.ifr_ifru.ifru_hwaddr };
    if hwaddr.sa_family != libc::ARPHRD_ETHER as libc::sa_family_t {
        return Err(DataLinkError::InterfaceNotSupported);
    }
    let mut mac = [0u8; 6];
    for (dst, src) in mac.iter_mut().zip(hwaddr.sa_data.iter()) {
        *dst = *src as u8;
    }
    Ok(MacAddress(mac))
}

fn join_multicast(
    socket: &Socket,
    if_index: u32,
    group: MacAddress,
) -> Result<(), DataLinkError> {
    let mut mreq: libc::packet_mreq = unsafe { mem::zeroed() };
    mreq.mr_ifindex = if_index as libc::c_int;
    mreq.mr_type = libc::PACKET_MR_MULTICAST as libc::c_ushort;
    mreq.mr_alen = 6;
    mreq.mr_address[..6].copy_from_slice(&group.raw());

    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_PACKET,
            libc::PACKET_ADD_MEMBERSHIP,
            (&mreq as *const libc::packet_mreq).cast(),
            mem::size_of::<libc::packet_mreq>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(DataLinkError::Io(io::Error::last_os_error()));
    }
    Ok(())
}
