//! Health passports and report commitment for the MediGuard ledger.
//!
//! A report is first committed to the ledger by [`ReportCommitter`], which
//! records a Merkle leaf and inclusion proof for it. [`PassportManager`] then
//! issues passports over committed reports and verifies them later:
//!
//! - an HMAC token proves the holder was given the passport
//! - a signature over the passport hash proves the authority issued it
//! - an optional ledger check proves the report is still anchored in an
//!   intact block
//!
//! Reports and passports live behind the [`ReportStore`] and
//! [`PassportStore`] traits, with in-memory and JSON-file implementations.

pub mod committer;
pub mod error;
pub mod file;
pub mod manager;
pub mod memory;
pub mod passport;
pub mod report;
pub mod store;

pub use committer::{CommitReceipt, ReportCommitter};
pub use error::{PassportError, PassportResult, StoreError, StoreResult};
pub use file::{JsonPassportStore, JsonReportStore};
pub use manager::{PassportManager, DEFAULT_VERIFICATION_BASE_URL};
pub use memory::{InMemoryPassportStore, InMemoryReportStore};
pub use passport::{
    AuditAction, AuditEntry, Passport, PassportPayload, VerificationResult, VerificationStatus,
};
pub use report::{report_leaf, ReportRecord};
pub use store::{PassportStore, ReportStore};
