//! IEEE 1722.1 AVDECC controller engine.
//!
//! [`Controller`] binds one network interface (any [`avdecc_datalink::DataLink`])
//! and provides the AVDECC control plane: ADP discovery with availability
//! timers, the AECP command engine (AEM, Address Access and Milan Vendor
//! Unique) with per-target serialization, retries and timeouts, the ACMP
//! connection-management engine, local entity advertising, and delivery of
//! unsolicited notifications and sniffed third-party traffic through
//! [`EventStream`].
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use avdecc_controller::{Controller, LocalEntity};
//! use avdecc_core::types::UniqueIdentifier;
//! use avdecc_datalink::RawEthernetTransport;
//!
//! let datalink = RawEthernetTransport::open("eth0")?;
//! let local = LocalEntity::controller(
//!     UniqueIdentifier::new(0x0011_2233_0000_0001),
//!     UniqueIdentifier::new(0x0011_2233_0000_0000),
//! );
//! let controller = Controller::new(datalink, local)?;
//! controller.discover_remote_entities().await?;
//! # Ok(())
//! # }
//! ```

mod acmp;
mod acmp_ops;
mod aem_ops;
mod controller;
mod discovery;
mod entity;
mod error;
mod events;
mod inflight;
mod timers;

pub mod simulator;

pub use acmp_ops::StreamConnectionResult;
pub use aem_ops::{
    AcquireEntityResult, AddressAccessResult, AudioMapResult, AudioMappingsResult, AvbInfoResult,
    ClockSourceResult, ConfigurationResult, CountersResult, LockEntityResult, MilanInfoResult,
    NameResult, ReadDescriptorResult, SamplingRateResult, StartOperationResult, StreamFormatResult,
    StreamInfoResult,
};
pub use controller::{
    Controller, ControllerLock, ACMP_COMMAND_TIMEOUT, AECP_COMMAND_RETRIES, AECP_COMMAND_TIMEOUT,
    DEFAULT_VALID_TIME, MAX_VALID_TIME, MIN_VALID_TIME,
};
pub use entity::{DiscoveredEntity, LocalEntity};
pub use error::Error;
pub use events::{AemNotification, ControllerEvent, EventStream};

pub use avdecc_core::status::{first_failure, AaStatus, AcmpStatus, AemStatus, MvuStatus};
