use std::path::PathBuf;

use mediguard_crypto::CanonicalError;

/// Errors produced by ledger operations.
///
/// Integrity problems found by validation are not errors; they are reported
/// through [`IntegrityReport`](crate::IntegrityReport).
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt chain file {path}: {reason}")]
    CorruptChain { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("merkle root is not a 64-character hex digest: {0:?}")]
    InvalidMerkleRoot(String),

    #[error("canonicalization error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
