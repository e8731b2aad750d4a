//! Append-only signed hash chain for the MediGuard ledger.
//!
//! This crate provides:
//! - The [`Block`] record with its canonical content hash
//! - `LedgerWriter` / `LedgerReader` trait boundaries
//! - [`Ledger`], a single-writer chain persisted as one JSON document
//! - Report-all integrity validation ([`IntegrityReport`])
//! - Atomic whole-file persistence (temp file + rename)

pub mod block;
pub mod error;
pub mod ledger;
pub mod persist;
pub mod traits;
pub mod validation;

pub use block::{Block, BlockContent};
pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use persist::{write_atomic, write_json_atomic, ChainFile};
pub use traits::{LedgerReader, LedgerWriter};
pub use validation::{validate_blocks, verify_block, IntegrityError, IntegrityReport, ViolationKind};
