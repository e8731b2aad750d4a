use crate::canonical::CanonicalError;

/// `prev_hash` of the first entry in a chain: 64 ASCII zeros.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// An entry that participates in a hash chain.
pub trait ChainLink {
    /// 1-based position in the chain as recorded in the entry.
    fn position(&self) -> u64;
    /// The hash stored on the entry.
    fn stored_hash(&self) -> &str;
    /// The stored reference to the predecessor's hash.
    fn prev_hash(&self) -> &str;
    /// Hash recomputed from the entry's own content fields.
    fn recompute_hash(&self) -> Result<String, CanonicalError>;
}

/// A single integrity problem found while walking a chain.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainFault {
    #[error("expected index {expected}, found {found}")]
    IndexGap { found: u64, expected: u64 },

    #[error("invalid prev_hash at index {index}")]
    InvalidPrevHash { index: u64 },

    #[error("hash mismatch at index {index}: computed hash differs from stored")]
    HashMismatch { index: u64 },

    #[error("content at index {index} cannot be canonicalized: {reason}")]
    Unhashable { index: u64, reason: String },
}

impl ChainFault {
    /// Position of the offending entry.
    pub fn index(&self) -> u64 {
        match self {
            Self::IndexGap { found, .. } => *found,
            Self::InvalidPrevHash { index }
            | Self::HashMismatch { index }
            | Self::Unhashable { index, .. } => *index,
        }
    }
}

/// Hash chain integrity checker.
///
/// Walks the whole chain once and reports every fault it finds instead of
/// stopping at the first one.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Check contiguity, linkage, and content hashes of a chain.
    ///
    /// Per entry:
    /// 1. Its position equals its 1-based offset
    /// 2. Its prev_hash is the predecessor's stored hash (the sentinel for the first)
    /// 3. Its stored hash equals the hash recomputed from its content
    pub fn check<L: ChainLink>(links: &[L]) -> Vec<ChainFault> {
        let mut faults = Vec::new();

        for (offset, link) in links.iter().enumerate() {
            let expected = offset as u64 + 1;
            if link.position() != expected {
                faults.push(ChainFault::IndexGap {
                    found: link.position(),
                    expected,
                });
            }

            let expected_prev = if offset == 0 {
                GENESIS_PREV_HASH
            } else {
                links[offset - 1].stored_hash()
            };
            if link.prev_hash() != expected_prev {
                faults.push(ChainFault::InvalidPrevHash {
                    index: link.position(),
                });
            }

            match link.recompute_hash() {
                Ok(computed) if computed == link.stored_hash() => {}
                Ok(_) => faults.push(ChainFault::HashMismatch {
                    index: link.position(),
                }),
                Err(e) => faults.push(ChainFault::Unhashable {
                    index: link.position(),
                    reason: e.to_string(),
                }),
            }
        }

        faults
    }
}
