#![allow(async_fn_in_trait)]

pub mod capture;
#[cfg(target_os = "linux")]
pub mod raw;
pub mod traits;
pub mod virtualnet;

#[cfg(target_os = "linux")]
pub use raw::RawEthernetTransport;
pub use traits::{DataLink, DataLinkError};
pub use virtualnet::{VirtualNetwork, VirtualTransport};
