use serde::{Deserialize, Serialize};

use mediguard_crypto::{CanonicalError, ChainLink, ContentHasher};
use mediguard_types::{Payload, Timestamp};

/// One signed, hash-linked ledger entry. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position, contiguous.
    pub index: u64,
    pub timestamp: Timestamp,
    pub data: Payload,
    /// Hash of the previous block, or the all-zero sentinel for the first.
    pub prev_hash: String,
    /// Merkle root over the block's sub-items, `null` when there are none.
    pub merkle_root: Option<String>,
    /// SHA-256 hex of the canonical [`BlockContent`].
    pub hash: String,
    /// Base64 signature over the UTF-8 bytes of `hash`.
    pub signature: String,
}

/// The hashed portion of a block: every field except `hash` and
/// `signature`.
#[derive(Clone, Debug, Serialize)]
pub struct BlockContent<'a> {
    pub index: u64,
    pub timestamp: &'a Timestamp,
    pub data: &'a Payload,
    pub prev_hash: &'a str,
    pub merkle_root: Option<&'a str>,
}

impl BlockContent<'_> {
    /// SHA-256 hex digest of the canonical encoding.
    pub fn hash(&self) -> Result<String, CanonicalError> {
        ContentHasher::hash_json(self)
    }
}

impl Block {
    /// Borrow the hashed fields.
    pub fn content(&self) -> BlockContent<'_> {
        BlockContent {
            index: self.index,
            timestamp: &self.timestamp,
            data: &self.data,
            prev_hash: &self.prev_hash,
            merkle_root: self.merkle_root.as_deref(),
        }
    }

    /// Recompute the content hash from the block's own fields.
    pub fn compute_hash(&self) -> Result<String, CanonicalError> {
        self.content().hash()
    }

    /// Short hash for display (first 12 characters). A hash that was edited
    /// into something that cannot be cut there is shown whole.
    pub fn short_hash(&self) -> &str {
        self.hash.get(..12).unwrap_or(&self.hash)
    }
}

impl ChainLink for Block {
    fn position(&self) -> u64 {
        self.index
    }

    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    fn recompute_hash(&self) -> Result<String, CanonicalError> {
        self.compute_hash()
    }
}
