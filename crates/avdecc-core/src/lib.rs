//! IEEE 1722.1 (AVDECC) protocol encoding and decoding in pure Rust.
//!
//! `avdecc-core` provides zero-copy, `no_std`-compatible encoding and decoding
//! of the three AVDECC PDU families carried over Ethernet (EtherType 0x22F0):
//! ADP (discovery), AECP (enumeration and control, with its AEM, Address
//! Access and Milan Vendor Unique dialects) and ACMP (connection management).
//! It forms the foundation of the avdecc crate family; the controller engine
//! and the transports live in their own crates.
//!
//! # Feature flags
//!
//! - **`std`** (default) — enables `std::error::Error` implementations.
//! - **`alloc`** (default) — enables codecs that allocate (descriptor
//!   payloads, address-access TLVs, audio mappings).
//! - **`serde`** — derives `Serialize`/`Deserialize` on core value types.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// Discovery Protocol data unit (ADPDU) encoding and decoding.
pub mod adpdu;
/// Address Access (AECP AA) TLV codecs.
pub mod aa;
/// Connection Management Protocol data unit (ACMPDU) encoding and decoding.
pub mod acmpdu;
/// AECP common header and the AEM / AA / MVU payload envelopes.
pub mod aecpdu;
/// AEM command and response payload codecs.
pub mod aem;
/// Binary encoding primitives and the zero-copy reader/writer.
pub mod encoding;
/// Error types for encoding and decoding operations.
pub mod error;
/// Ethernet framing: MAC addresses, the AVTP EtherType, the 14-byte header.
pub mod ethernet;
/// Milan Vendor Unique (AECP MVU) payload codecs.
pub mod mvu;
/// Command status enumerations for the four protocol surfaces.
pub mod status;
/// Core AVDECC value types: EUI-64 identifiers, capabilities, descriptors.
pub mod types;

pub use error::{DecodeError, EncodeError};
