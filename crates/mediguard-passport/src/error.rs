use std::path::PathBuf;

use mediguard_crypto::{CanonicalError, MerkleError};
use mediguard_ledger::LedgerError;
use mediguard_types::PassportId;

/// Errors from report and passport stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("persist failed: {0}")]
    Persist(#[from] LedgerError),

    #[error("passport not found: {0}")]
    PassportNotFound(PassportId),

    #[error("passport already exists: {0}")]
    DuplicatePassport(PassportId),

    #[error("store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from passport issuance and report commitment.
///
/// Verification outcomes are not errors; see
/// [`VerificationResult`](crate::VerificationResult).
#[derive(Debug, thiserror::Error)]
pub enum PassportError {
    #[error("report not found: {0}")]
    ReportNotFound(u64),

    #[error("report {0} is not committed to the ledger")]
    ReportNotCommitted(u64),

    #[error("cannot commit an empty batch of reports")]
    EmptyBatch,

    /// The block was appended but not every report could be updated.
    #[error(
        "block {block_index} appended but report {failed} was not updated \
         ({} report(s) updated): {source}",
        .written.len()
    )]
    PartialCommit {
        block_index: u64,
        /// Reports already pointing at the block, in commit order.
        written: Vec<u64>,
        failed: u64,
        #[source]
        source: StoreError,
    },

    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("canonicalization error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type PassportResult<T> = Result<T, PassportError>;
