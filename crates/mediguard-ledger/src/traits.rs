use mediguard_types::Payload;

use crate::block::Block;
use crate::error::LedgerError;

/// Write boundary for ledger append operations.
pub trait LedgerWriter: Send + Sync {
    fn append(&self, data: Payload, merkle_root: Option<String>) -> Result<Block, LedgerError>;
}

/// Read boundary for ledger queries.
pub trait LedgerReader: Send + Sync {
    /// Block at 1-based `index`.
    fn get(&self, index: u64) -> Result<Option<Block>, LedgerError>;

    /// Whether `block` carries a valid hash and a signature from this
    /// ledger's authority.
    fn is_authentic(&self, block: &Block) -> bool;
}
