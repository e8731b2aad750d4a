//! Foundation types for the MediGuard tamper-evident ledger.
//!
//! Every other MediGuard crate depends on `mediguard-types`.
//!
//! # Key Types
//!
//! - [`Payload`] — Opaque application data carried by a ledger block
//! - [`Timestamp`] — RFC 3339 creation time, stored exactly as it was hashed
//! - [`PassportId`] — Random UUID v4 identifier for an issued passport

pub mod error;
pub mod identity;
pub mod payload;
pub mod temporal;

pub use error::TypeError;
pub use identity::PassportId;
pub use payload::Payload;
pub use temporal::Timestamp;
